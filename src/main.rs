//! arrayq entry point
//!
//! Installs logging, then delegates to the CLI module. Errors are printed
//! to stderr and the process exits non-zero.

use arrayquery::cli;
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();
    if let Err(e) = cli::run() {
        eprintln!("{}: {}", e.code(), e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
