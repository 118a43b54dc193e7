//! # ddstats - Main Entry Point
//!
//! - **Live TUI** (default): draws the game status; logs go to a file
//! - **Headless** (`--headless`): logs to stderr with a status line every 10s

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;

use ddstats::app;
use ddstats::cli::Args;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_NOPERM: i32 = 77;

fn main() {
    let args = Args::parse();
    if let Err(e) = init_logging(&args) {
        eprintln!("error: {e:#}");
        std::process::exit(exit_code_for(&e));
    }

    std::process::exit(match run(args) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let msg = format!("{err:#}").to_lowercase();
    if msg.contains("permission denied") || msg.contains("operation not permitted") {
        EXIT_NOPERM
    } else if msg.contains("invalid host") {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

/// Logs go to stderr in headless mode and to the log file otherwise,
/// since the TUI owns the terminal
fn init_logging(args: &Args) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if !args.logs_to_stderr() {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&args.log_file)
            .with_context(|| format!("Failed to open log file {}", args.log_file.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

#[tokio::main]
async fn run(args: Args) -> Result<()> {
    app::run(args).await
}
