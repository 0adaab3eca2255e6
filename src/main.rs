//! deploytrack - deployment-manager collector

use clap::Parser;

mod cli;
mod client;
mod collector;
mod config;
mod error;
mod models;
mod output;
mod store;

use cli::{AppsCommands, BindCommands, Cli, Commands};
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if cli.debug {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    match cli.command {
        Commands::Run => cli::run::run(cli.config.as_deref()).await,
        Commands::Status => cli::status::run(cli.config.as_deref()),
        Commands::Version => {
            println!("deploytrack version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Apps(apps_cmd) => match apps_cmd {
            AppsCommands::List => cli::apps::list(cli.format, cli.config.as_deref()),
        },
        Commands::Bind(bind_cmd) => match bind_cmd {
            BindCommands::Add { item_id } => cli::bind::add(item_id, cli.config.as_deref()),
            BindCommands::Remove { item_id } => cli::bind::remove(item_id, cli.config.as_deref()),
            BindCommands::List => cli::bind::list(cli.format, cli.config.as_deref()),
        },
    }
}
