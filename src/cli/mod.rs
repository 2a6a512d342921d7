//! CLI module
//!
//! Command-line interface for sending requests through the client pipeline.
//!
//! # Commands
//!
//! - `fetch` - Send one request and print the response
//! - `validate` - Check a client configuration file

mod commands;
mod runner;

pub use commands::{BackoffArg, Cli, Commands, FetchArgs};
pub use runner::Runner;
