mod cli;
mod command;
mod config;
mod error;
mod remote;
mod store;

use error::WrapErr;

use clap::Parser;

#[tokio::main]
async fn main() -> error::Result<()> {
    color_eyre::install()?;
    let command_line = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(cli::log_level(command_line.verbose))
        .init();

    let cfg = config::Config::load().context("Load configuration error")?;

    let cmd: Box<dyn command::Command> = match command_line.command {
        None | Some(cli::Commands::Interactive) => Box::new(command::InteractiveCommand::new(cfg)),
        Some(cli::Commands::Recent { limit }) => Box::new(command::RecentCommand::new(cfg, limit)),
        Some(cli::Commands::ClearCache { all }) => {
            Box::new(command::ClearCacheCommand::new(cfg, all))
        }
    };
    cmd.execute().await
}
