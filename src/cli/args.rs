//! CLI argument definitions using clap
//!
//! Commands:
//! - arrayq schema --array <snapshot.json>
//! - arrayq query --array <snapshot.json> [--columns a,b] [--range dim=lo:hi]...
//!   [--point dim=v]... [--layout <layout>] [--buffer-bytes N]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::engine::Layout;

/// arrayq - paged reads over array snapshots
#[derive(Parser, Debug)]
#[command(name = "arrayq")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the schema of an array snapshot
    Schema {
        /// Path to the array snapshot
        #[arg(long)]
        array: PathBuf,
    },

    /// Read an array page by page, one JSON line per page
    Query(QueryArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct QueryArgs {
    /// Path to the array snapshot
    #[arg(long)]
    pub array: PathBuf,

    /// Columns to read; all columns when omitted
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Inclusive range as dim=lo:hi; repeat to add more
    #[arg(long = "range", value_name = "DIM=LO:HI")]
    pub ranges: Vec<String>,

    /// Single coordinate as dim=value; repeat to add more
    #[arg(long = "point", value_name = "DIM=VALUE")]
    pub points: Vec<String>,

    /// Result order: row-major, col-major, global-order or unordered
    #[arg(long)]
    pub layout: Option<Layout>,

    /// Bytes per synthesized buffer; small values force pagination
    #[arg(long)]
    pub buffer_bytes: Option<usize>,

    /// Session name shown in logs
    #[arg(long, default_value = "arrayq")]
    pub name: String,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query() {
        let cli = Cli::try_parse_from([
            "arrayq",
            "query",
            "--array",
            "a.json",
            "--columns",
            "pos,qual",
            "--range",
            "pos=1:10",
            "--range",
            "pos=20:30",
            "--point",
            "sample=HG001",
            "--layout",
            "row-major",
            "--buffer-bytes",
            "64",
        ])
        .unwrap();
        let Command::Query(args) = cli.command else {
            panic!("expected query command");
        };
        assert_eq!(args.columns, vec!["pos", "qual"]);
        assert_eq!(args.ranges.len(), 2);
        assert_eq!(args.points, vec!["sample=HG001"]);
        assert_eq!(args.layout, Some(Layout::RowMajor));
        assert_eq!(args.buffer_bytes, Some(64));
        assert_eq!(args.name, "arrayq");
    }

    #[test]
    fn test_rejects_unknown_layout() {
        let result = Cli::try_parse_from([
            "arrayq", "query", "--array", "a.json", "--layout", "zigzag",
        ]);
        assert!(result.is_err());
    }
}
