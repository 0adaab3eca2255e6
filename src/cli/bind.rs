//! Dashboard binding management
//!
//! Bindings are the reference set the reconciler derives enablement from: a
//! tracked application is enabled exactly when its item id is bound.

use serde::Serialize;
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::error::Result;
use crate::models::ApplicationId;
use crate::output::{json, table};
use crate::store::Store;

#[derive(Tabled, Serialize)]
struct BindingDisplay {
    #[tabled(rename = "ITEM ID")]
    item_id: i64,
}

fn open_store(config_path: Option<&str>) -> Result<Store> {
    let config = Config::load(config_path)?;
    Ok(Store::open(&config.database_path()?)?)
}

/// Bind a collector item to a dashboard component
pub fn add(item_id: i64, config_path: Option<&str>) -> Result<()> {
    let store = open_store(config_path)?;
    store.add_binding(ApplicationId(item_id))?;
    println!("Bound collector item {}", item_id);
    Ok(())
}

/// Remove a dashboard binding
pub fn remove(item_id: i64, config_path: Option<&str>) -> Result<()> {
    let store = open_store(config_path)?;
    if store.remove_binding(ApplicationId(item_id))? {
        println!("Unbound collector item {}", item_id);
    } else {
        println!("No binding for collector item {}", item_id);
    }
    Ok(())
}

/// List current bindings
pub fn list(format: OutputFormat, config_path: Option<&str>) -> Result<()> {
    let store = open_store(config_path)?;

    let mut ids: Vec<i64> = store
        .referenced_collector_item_ids()?
        .into_iter()
        .map(|id| id.0)
        .collect();
    ids.sort_unstable();

    let rows: Vec<BindingDisplay> = ids
        .into_iter()
        .map(|item_id| BindingDisplay { item_id })
        .collect();

    match format {
        OutputFormat::Table => println!("{}", table::format_table(&rows)),
        OutputFormat::Json => println!("{}", json::format_json(&rows)?),
    }
    Ok(())
}
