// Exit codes for scripted comparisons
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_GENERIC_FAIL: i32 = 1;
pub const EXIT_TOLERANCE_EXCEEDED: i32 = 2;
