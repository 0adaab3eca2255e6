//! Tracked application inspection

use serde::Serialize;
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::error::Result;
use crate::models::{Collector, DeployApplication};
use crate::output::{json, table};
use crate::store::Store;

/// Display format for tracked applications in table view
#[derive(Tabled, Serialize)]
struct AppDisplay {
    #[tabled(rename = "ITEM ID")]
    id: String,

    #[tabled(rename = "APP ID")]
    application_id: String,

    #[tabled(rename = "NAME")]
    name: String,

    #[tabled(rename = "NICE NAME")]
    nice_name: String,

    #[tabled(rename = "INSTANCE")]
    instance_url: String,

    #[tabled(rename = "ENABLED")]
    enabled: bool,
}

impl From<DeployApplication> for AppDisplay {
    fn from(app: DeployApplication) -> Self {
        Self {
            id: app.id.map(|id| id.to_string()).unwrap_or_default(),
            application_id: app.application_id,
            name: app.application_name,
            nice_name: app.nice_name,
            instance_url: app.instance_url,
            enabled: app.enabled,
        }
    }
}

/// Run the apps list command
pub fn list(format: OutputFormat, config_path: Option<&str>) -> Result<()> {
    let config = Config::load(config_path)?;
    let store = Store::open(&config.database_path()?)?;

    let collector = Collector::prototype(config.servers.clone(), config.nice_names.clone());
    let collector_id = store.upsert_collector(&collector)?;
    let apps = store.find_by_collector_id(collector_id)?;

    let display_apps: Vec<AppDisplay> = apps.into_iter().map(|a| a.into()).collect();

    match format {
        OutputFormat::Table => println!("{}", table::format_table(&display_apps)),
        OutputFormat::Json => println!("{}", json::format_json(&display_apps)?),
    }
    Ok(())
}
