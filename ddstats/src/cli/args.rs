//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "ddstats",
    version,
    about = "Live stats recorder and submitter for Devil Daggers",
    after_help = "\
EXAMPLES:
    ddstats                                  Attach to devildaggers, submit to ddstats.com
    ddstats --offline                        Record and display only, no networking
    ddstats --headless                       Log to stderr instead of drawing a TUI
    ddstats --host http://localhost:5666     Talk to a local server"
)]
pub struct Args {
    /// Config file (written with defaults if missing)
    #[arg(short, long, value_name = "FILE", default_value = "ddstats.toml")]
    pub config: PathBuf,

    /// Name of the game process to attach to
    #[arg(short, long, value_name = "NAME", default_value = "devildaggers")]
    pub process: String,

    /// Server to submit to, overriding the config file
    #[arg(long, value_name = "URL")]
    pub host: Option<String>,

    /// Disable all networking
    #[arg(long)]
    pub offline: bool,

    /// Run without TUI, logging a status line every 10 seconds
    #[arg(long)]
    pub headless: bool,

    /// Log file (ignored with --headless, which logs to stderr)
    #[arg(long, value_name = "FILE", default_value = "ddstats.log")]
    pub log_file: PathBuf,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Whether logs go to stderr instead of a file
    #[must_use]
    pub fn logs_to_stderr(&self) -> bool {
        self.headless
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["ddstats"]);
        assert_eq!(args.config, PathBuf::from("ddstats.toml"));
        assert_eq!(args.process, "devildaggers");
        assert_eq!(args.log_file, PathBuf::from("ddstats.log"));
        assert!(args.host.is_none());
        assert!(!args.offline && !args.headless);
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "ddstats",
            "--config",
            "/tmp/x.toml",
            "--host",
            "http://localhost:5666",
            "--offline",
            "--headless",
        ]);
        assert_eq!(args.host.as_deref(), Some("http://localhost:5666"));
        assert!(args.offline);
        assert!(args.logs_to_stderr());
    }
}
