//! Mock deploy-manager gateway for testing
//!
//! Configure fixture responses via builder methods, then hand the mock to a
//! collector task. No network involved.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::DeployManagerApi;
use crate::error::{ApiError, Result};
use crate::models::{DeployApplication, EnvResCompData, Environment};

/// Tracks gateway call counts for test verification
#[derive(Default, Debug, Clone)]
pub struct CallCounts {
    pub list_applications: usize,
    pub list_environments: usize,
    pub fetch_env_resource_data: usize,
}

/// Mock gateway.
///
/// # Example
/// ```ignore
/// let mock = MockDeployManagerClient::new()
///     .with_applications("http://x", vec![app])
///     .await;
/// let apps = mock.list_applications("http://x").await?;
/// ```
#[derive(Default)]
pub struct MockDeployManagerClient {
    /// Applications per instance URL
    applications: Arc<Mutex<HashMap<String, Vec<DeployApplication>>>>,
    /// Environments per remote application id
    environments: Arc<Mutex<HashMap<String, Vec<Environment>>>>,
    /// Combined records per (remote application id, environment id)
    records: Arc<Mutex<HashMap<(String, String), Vec<EnvResCompData>>>>,
    /// Error to return, consumed on first use
    error: Arc<Mutex<Option<ApiError>>>,
    call_counts: Arc<Mutex<CallCounts>>,
}

impl MockDeployManagerClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_applications(self, instance_url: &str, apps: Vec<DeployApplication>) -> Self {
        self.applications
            .lock()
            .await
            .insert(instance_url.to_string(), apps);
        self
    }

    pub async fn with_environments(self, application_id: &str, envs: Vec<Environment>) -> Self {
        self.environments
            .lock()
            .await
            .insert(application_id.to_string(), envs);
        self
    }

    pub async fn with_records(
        self,
        application_id: &str,
        environment_id: &str,
        records: Vec<EnvResCompData>,
    ) -> Self {
        self.records.lock().await.insert(
            (application_id.to_string(), environment_id.to_string()),
            records,
        );
        self
    }

    /// Fail the next gateway call with the given error
    pub async fn with_error(self, error: ApiError) -> Self {
        *self.error.lock().await = Some(error);
        self
    }

    /// Replace the combined-record fixture mid-test
    pub async fn set_records(
        &self,
        application_id: &str,
        environment_id: &str,
        records: Vec<EnvResCompData>,
    ) {
        self.records.lock().await.insert(
            (application_id.to_string(), environment_id.to_string()),
            records,
        );
    }

    pub async fn call_counts(&self) -> CallCounts {
        self.call_counts.lock().await.clone()
    }

    async fn take_error(&self) -> Option<ApiError> {
        self.error.lock().await.take()
    }
}

#[async_trait]
impl DeployManagerApi for MockDeployManagerClient {
    async fn list_applications(&self, instance_url: &str) -> Result<Vec<DeployApplication>> {
        self.call_counts.lock().await.list_applications += 1;
        if let Some(err) = self.take_error().await {
            return Err(err.into());
        }
        Ok(self
            .applications
            .lock()
            .await
            .get(instance_url)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_environments(
        &self,
        application: &DeployApplication,
    ) -> Result<Vec<Environment>> {
        self.call_counts.lock().await.list_environments += 1;
        if let Some(err) = self.take_error().await {
            return Err(err.into());
        }
        Ok(self
            .environments
            .lock()
            .await
            .get(&application.application_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_env_resource_data(
        &self,
        application: &DeployApplication,
        environment: &Environment,
    ) -> Result<Vec<EnvResCompData>> {
        self.call_counts.lock().await.fetch_env_resource_data += 1;
        if let Some(err) = self.take_error().await {
            return Err(err.into());
        }
        Ok(self
            .records
            .lock()
            .await
            .get(&(
                application.application_id.clone(),
                environment.id.clone(),
            ))
            .cloned()
            .unwrap_or_default())
    }
}
