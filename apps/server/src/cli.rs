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

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the catalog on the unix socket
    Serve,
    /// Run one catalog search locally and print the page
    Search {
        query: String,
        /// 页码，从 1 开始
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
}

pub fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&["server", "search", "batman"], "batman", 1)]
    #[case(&["server", "search", "iron man", "--page", "3"], "iron man", 3)]
    fn test_parse_search(#[case] args: &[&str], #[case] query: &str, #[case] page: u32) {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Some(Commands::Search { query: q, page: p }) => {
                assert_eq!(q, query);
                assert_eq!(p, page);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[rstest]
    #[case(0, Level::INFO)]
    #[case(1, Level::DEBUG)]
    #[case(4, Level::TRACE)]
    fn test_log_level(#[case] verbose: u8, #[case] expected: Level) {
        assert_eq!(log_level(verbose), expected);
    }
}
