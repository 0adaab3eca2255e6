//! Remote deploy-manager gateway

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{DeployApplication, EnvResCompData, Environment};

pub mod http;
#[cfg(test)]
pub mod mock;

pub use http::HttpDeployManagerClient;
#[cfg(test)]
#[allow(unused_imports)]
pub use mock::MockDeployManagerClient;

/// Read-only gateway to a remote deploy-manager instance.
///
/// Implementations carry no collection state; fetch failures propagate to
/// the caller and abort the remainder of the current instance's cycle.
#[async_trait]
pub trait DeployManagerApi: Send + Sync {
    /// Fetch all applications served by the given instance URL.
    async fn list_applications(&self, instance_url: &str) -> Result<Vec<DeployApplication>>;

    /// Fetch all environments of a tracked application.
    async fn list_environments(&self, application: &DeployApplication)
        -> Result<Vec<Environment>>;

    /// Fetch the combined component/resource/status records for one
    /// (application, environment) pair.
    async fn fetch_env_resource_data(
        &self,
        application: &DeployApplication,
        environment: &Environment,
    ) -> Result<Vec<EnvResCompData>>;
}
