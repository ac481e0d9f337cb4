//! CLI command implementations

pub mod compare;
pub mod info;
pub mod run;

pub use compare::{CompareCommand, ToleranceExceeded};
pub use info::InfoCommand;
pub use run::{Backend, MatmulArgs};
