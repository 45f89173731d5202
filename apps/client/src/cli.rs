use clap::{ArgAction, Parser, Subcommand};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Increase verbosity. Can be used multiple times (e.g., -v, -vv, -vvv).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Search the catalog interactively (default)
    Interactive,
    /// List recently searched queries
    Recent {
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Drop cached catalog pages
    ClearCache {
        /// Forget recent queries too
        #[arg(long)]
        all: bool,
    },
}

/// Logs share the terminal with the prompt, so stay quiet by default
pub fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}
