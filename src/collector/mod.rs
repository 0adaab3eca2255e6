//! Collection cycle: reconciles remote deploy-manager state into the store
//!
//! One run per collector, instance URLs processed sequentially. Per URL:
//! prune stale applications, recompute enablement from dashboard bindings,
//! merge newly discovered applications, then replace the environment
//! snapshots of every enabled application.

use std::time::Instant;

use crate::client::DeployManagerApi;
use crate::error::{Error, Result, StoreError};
use crate::models::{
    Collector, CollectorId, DeployApplication, EnvResCompData, Environment, EnvironmentComponent,
    EnvironmentStatus,
};
use crate::store::Store;

/// Executes collection cycles against a gateway and a store
pub struct CollectorTask<'a, C: DeployManagerApi> {
    client: &'a C,
    store: &'a mut Store,
}

impl<'a, C: DeployManagerApi> CollectorTask<'a, C> {
    pub fn new(client: &'a C, store: &'a mut Store) -> Self {
        Self { client, store }
    }

    /// Run one full collection cycle for the collector.
    ///
    /// A gateway failure aborts the remainder of the current instance URL's
    /// processing and propagates; the next scheduled run retries from
    /// scratch.
    pub async fn run(&mut self, collector: &Collector) -> Result<()> {
        let collector_id = self.store.upsert_collector(collector)?;

        for instance_url in &collector.servers {
            log::info!("===== collecting {} =====", instance_url);
            let start = Instant::now();

            self.clean(collector, collector_id)?;

            let discovered = self.client.list_applications(instance_url).await?;
            self.add_new_applications(discovered, collector, collector_id)?;

            let enabled = self
                .store
                .find_enabled_applications(collector_id, instance_url)?;
            self.update_data(enabled).await?;

            log::info!("Finished {} in {:?}", instance_url, start.elapsed());
        }
        Ok(())
    }

    /// Prune stale applications, then recompute every tracked application's
    /// enabled flag from the dashboard-binding reference set.
    fn clean(&mut self, collector: &Collector, collector_id: CollectorId) -> Result<()> {
        self.delete_unwanted_applications(collector, collector_id)?;

        let referenced = self.store.referenced_collector_item_ids()?;
        let mut apps = self.store.find_by_collector_id(collector_id)?;
        for app in &mut apps {
            app.enabled = app.id.is_some_and(|id| referenced.contains(&id));
        }
        self.store.save_enabled_flags(&apps)?;
        Ok(())
    }

    /// Delete tracked applications whose instance URL is no longer served by
    /// the collector, or that belong to a different collector id.
    fn delete_unwanted_applications(
        &mut self,
        collector: &Collector,
        collector_id: CollectorId,
    ) -> Result<()> {
        let stale: Vec<_> = self
            .store
            .find_by_collector_id(collector_id)?
            .into_iter()
            .filter(|app| {
                !collector.servers.contains(&app.instance_url)
                    || app.collector_id != Some(collector_id)
            })
            .filter_map(|app| app.id)
            .collect();

        if !stale.is_empty() {
            let deleted = self.store.delete_applications(&stale)?;
            log::info!("Pruned {} stale application(s)", deleted);
        }
        Ok(())
    }

    /// Merge discovered applications into the registry. New applications are
    /// created disabled; existing ones only get an empty nice name
    /// back-filled.
    fn add_new_applications(
        &mut self,
        discovered: Vec<DeployApplication>,
        collector: &Collector,
        collector_id: CollectorId,
    ) -> Result<()> {
        let start = Instant::now();
        let mut count = 0;

        log::info!("All apps: {}", discovered.len());
        for mut application in discovered {
            let existing = self.store.find_application(
                collector_id,
                &application.instance_url,
                &application.application_id,
            )?;
            let nice_name = resolve_nice_name(collector, &application.instance_url);

            match existing {
                None => {
                    application.collector_id = Some(collector_id);
                    application.enabled = false;
                    application.description = application.application_name.clone();
                    if !nice_name.is_empty() {
                        application.nice_name = nice_name;
                    }
                    match self.store.insert_application(&application) {
                        Ok(_) => {}
                        Err(StoreError::Duplicate(_)) => {
                            log::info!(
                                "Duplicate application not allowed: {} ({})",
                                application.application_name,
                                application.instance_url
                            );
                        }
                        Err(e) => return Err(e.into()),
                    }
                    count += 1;
                }
                Some(mut existing)
                    if existing.nice_name.is_empty() && !nice_name.is_empty() =>
                {
                    existing.nice_name = nice_name;
                    self.store.update_application(&existing)?;
                }
                Some(_) => {}
            }
        }
        log::info!("New apps: {} in {:?}", count, start.elapsed());
        Ok(())
    }

    /// Refresh the environment snapshots of each enabled application.
    ///
    /// Components and statuses accumulate across all environments of the
    /// application, then replace the stored rows per category. An empty
    /// category leaves the stored rows untouched: an instance that returns
    /// nothing must not wipe the last known snapshot.
    async fn update_data(&mut self, applications: Vec<DeployApplication>) -> Result<()> {
        for application in applications {
            let start = Instant::now();
            let mut comp_list = Vec::new();
            let mut status_list = Vec::new();

            for environment in self.client.list_environments(&application).await? {
                let combined = self
                    .client
                    .fetch_env_resource_data(&application, &environment)
                    .await?;

                comp_list.extend(environment_components(&combined, &environment, &application));
                status_list.extend(environment_statuses(&combined));
            }

            let owner = application.id.ok_or_else(|| {
                Error::Other(format!(
                    "enabled application {} has no stored id",
                    application.application_id
                ))
            })?;

            if !comp_list.is_empty() {
                self.store.replace_components(owner, &comp_list)?;
            }
            if !status_list.is_empty() {
                self.store.replace_statuses(owner, &status_list)?;
            }

            log::info!(
                " {}: {} component(s), {} status(es) in {:?}",
                application.application_name,
                comp_list.len(),
                status_list.len(),
                start.elapsed()
            );
        }
        Ok(())
    }
}

/// Resolve the configured nice name for an application's instance URL.
///
/// Servers and nice names correspond by index; URL comparison is
/// case-insensitive. Returns an empty string when there is no in-bounds
/// match or either list is empty.
fn resolve_nice_name(collector: &Collector, instance_url: &str) -> String {
    if collector.servers.is_empty() || collector.nice_names.is_empty() {
        return String::new();
    }
    for (i, server) in collector.servers.iter().enumerate() {
        if server.eq_ignore_ascii_case(instance_url) && collector.nice_names.len() > i {
            return collector.nice_names[i].clone();
        }
    }
    String::new()
}

/// Build component snapshot rows for one environment.
///
/// The environment name is taken from the environment being iterated, not
/// from the fetched record; the display URL is synthesized from the
/// application's instance URL and the environment id.
fn environment_components(
    combined: &[EnvResCompData],
    environment: &Environment,
    application: &DeployApplication,
) -> Vec<EnvironmentComponent> {
    let environment_url = format!(
        "{}/#environment/{}",
        application.instance_url.trim_end_matches('/'),
        environment.id
    );

    combined
        .iter()
        .map(|data| EnvironmentComponent {
            collector_item_id: data.collector_item_id,
            environment_name: environment.name.clone(),
            component_name: data.component_name.clone(),
            component_version: data.component_version.clone(),
            deployed: data.deployed,
            as_of: data.as_of,
            environment_url: environment_url.clone(),
        })
        .collect()
}

/// Build status snapshot rows. All fields, including the environment name,
/// are copied verbatim from the fetched records.
fn environment_statuses(combined: &[EnvResCompData]) -> Vec<EnvironmentStatus> {
    combined
        .iter()
        .map(|data| EnvironmentStatus {
            collector_item_id: data.collector_item_id,
            component_id: data.component_id.clone(),
            component_name: data.component_name.clone(),
            environment_name: data.environment_name.clone(),
            resource_name: data.resource_name.clone(),
            online: data.online,
        })
        .collect()
}
