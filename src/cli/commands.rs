//! CLI commands and argument parsing

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Solidafy HTTP client CLI
#[derive(Parser, Debug)]
#[command(name = "solidafy-http")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Client configuration file (YAML or JSON)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a request and print the response
    Fetch(FetchArgs),

    /// Validate a client configuration file
    Validate,
}

/// Arguments of the `fetch` command
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Absolute URL, or a path resolved against the configured host
    pub target: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Extra header as `Name: value` (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Request body
    #[arg(short, long)]
    pub data: Option<String>,

    /// Overall deadline in milliseconds, covering rate limiting and retries
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Status code to retry on (repeatable)
    #[arg(long = "retry-status")]
    pub retry_statuses: Vec<u16>,

    /// Maximum number of retries
    #[arg(long)]
    pub retries: Option<u32>,

    /// Backoff between retries
    #[arg(long, value_enum)]
    pub backoff: Option<BackoffArg>,

    /// Base backoff delay in milliseconds
    #[arg(long)]
    pub backoff_base_ms: Option<u64>,

    /// Requests allowed per refill period
    #[arg(long)]
    pub rate_limit: Option<u32>,

    /// Rate limiter refill period in milliseconds
    #[arg(long, default_value = "1000")]
    pub refill_ms: u64,
}

/// Backoff selection on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BackoffArg {
    /// Do not retry
    None,
    /// Constant delay; limited when `--retries` is given
    Constant,
    /// Doubling delay with jitter
    Exponential,
}
