//! Run one collection cycle

use std::time::Duration;

use crate::client::HttpDeployManagerClient;
use crate::collector::CollectorTask;
use crate::config::Config;
use crate::error::Result;
use crate::models::Collector;
use crate::store::Store;

/// Execute a single cycle: the external scheduler invokes this per cron tick
pub async fn run(config_path: Option<&str>) -> Result<()> {
    let config = Config::load(config_path)?;
    config.validate()?;

    let collector = Collector::prototype(config.servers.clone(), config.nice_names.clone());
    let mut store = Store::open(&config.database_path()?)?;
    let client = HttpDeployManagerClient::new(
        config.api_token.clone(),
        Duration::from_secs(config.timeout_secs),
    )?;

    CollectorTask::new(&client, &mut store).run(&collector).await
}
