//! CLI command definitions and handlers

use clap::{Parser, Subcommand};

pub mod apps;
pub mod bind;
pub mod run;
pub mod status;

/// Output format options
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Table format - one row per entry (default)
    #[default]
    Table,
    /// JSON format - structured for scripts/APIs
    Json,
}

/// deploytrack - deployment-manager collector
#[derive(Parser, Debug)]
#[command(name = "deploytrack")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (table, json)
    #[arg(
        long,
        global = true,
        env = "DEPLOYTRACK_FORMAT",
        default_value = "table",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "DEPLOYTRACK_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "DEPLOYTRACK_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one collection cycle against the configured servers
    Run,

    /// Show configuration and store summary
    Status,

    /// Display version information
    Version,

    /// Inspect tracked applications
    #[command(subcommand)]
    Apps(AppsCommands),

    /// Manage dashboard bindings (they drive enablement)
    #[command(subcommand)]
    Bind(BindCommands),
}

/// Application inspection commands
#[derive(Subcommand, Debug)]
pub enum AppsCommands {
    /// List tracked applications
    List,
}

/// Dashboard binding commands
#[derive(Subcommand, Debug)]
pub enum BindCommands {
    /// Bind a collector item to a dashboard component
    Add {
        /// Collector item id of the tracked application
        item_id: i64,
    },
    /// Remove a dashboard binding
    Remove {
        /// Collector item id of the tracked application
        item_id: i64,
    },
    /// List current bindings
    List,
}
