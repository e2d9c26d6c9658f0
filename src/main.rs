//! Application entry point.
//!
//! Parses command-line arguments, layers configuration files and environment
//! variables underneath them, and delegates to [`runner::run`].

use kiln::{cli, runner};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt;

fn main() -> ExitCode {
    let (parsed, matches) = match cli::parse_from(std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(err) => err.exit(),
    };
    let max_level = if parsed.verbose {
        Level::DEBUG
    } else {
        Level::ERROR
    };
    fmt()
        .with_max_level(max_level)
        .with_writer(std::io::stderr)
        .init();
    let merged = match cli::merge_with_config(&parsed, &matches) {
        Ok(merged) => merged,
        Err(err) => {
            tracing::error!(error = %err, "configuration failed");
            return ExitCode::FAILURE;
        }
    };
    match runner::run(&merged) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = format!("{err:#}"), "configuration run failed");
            ExitCode::FAILURE
        }
    }
}
