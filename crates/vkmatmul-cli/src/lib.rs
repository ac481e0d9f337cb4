//! Library side of the `vkmatmul` binary, exposed for integration tests.

pub mod commands;
pub mod config;
pub mod exit;
pub mod output;
