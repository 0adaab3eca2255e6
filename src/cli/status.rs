//! Configuration and store summary

use crate::config::Config;
use crate::error::Result;
use crate::models::Collector;
use crate::store::Store;

/// Run the status command
pub fn run(config_path: Option<&str>) -> Result<()> {
    let path_display = match config_path {
        Some(p) => p.to_string(),
        None => Config::default_path()?.display().to_string(),
    };
    let config = Config::load(config_path)?;

    println!("Config: {}", path_display);
    println!("Database: {}", config.database_path()?.display());
    println!("Servers:");
    for (i, server) in config.servers.iter().enumerate() {
        match config.nice_names.get(i) {
            Some(nice) if !nice.is_empty() => println!("  {} ({})", server, nice),
            _ => println!("  {}", server),
        }
    }

    let store = Store::open(&config.database_path()?)?;
    let collector = Collector::prototype(config.servers.clone(), config.nice_names.clone());
    let collector_id = store.upsert_collector(&collector)?;
    let apps = store.find_by_collector_id(collector_id)?;
    let enabled = apps.iter().filter(|a| a.enabled).count();
    let bindings = store.referenced_collector_item_ids()?.len();

    println!("Tracked applications: {}", apps.len());
    println!("Enabled applications: {}", enabled);
    println!("Dashboard bindings: {}", bindings);
    Ok(())
}
