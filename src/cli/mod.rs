//! CLI module for arrayq
//!
//! Provides command-line interface for:
//! - schema: print the schema of an array snapshot
//! - query: paged read of an array snapshot, one JSON line per page

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, QueryArgs};
pub use commands::{query, run, run_command, schema, QuerySummary};
pub use errors::{CliError, CliResult};
pub use io::{write_line, write_pretty};
