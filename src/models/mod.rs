//! Domain model for the deploy-manager collector

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Collector name used for the persisted registry row
pub const COLLECTOR_NAME: &str = "deploy-manager";

/// Store-assigned identity of a collector row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectorId(pub i64);

impl fmt::Display for CollectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Store-assigned identity of a tracked application (its collector item id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub i64);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One collection source: the deploy-manager integration identity plus its
/// configured server URLs and index-parallel nice names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collector {
    pub id: Option<CollectorId>,
    pub name: String,
    pub enabled: bool,
    pub online: bool,
    pub servers: Vec<String>,
    pub nice_names: Vec<String>,
}

impl Collector {
    /// Build a fully-initialized collector value from configuration.
    pub fn prototype(servers: Vec<String>, nice_names: Vec<String>) -> Self {
        Self {
            id: None,
            name: COLLECTOR_NAME.to_string(),
            enabled: true,
            online: true,
            servers,
            nice_names,
        }
    }
}

/// A deployable unit tracked in a remote deploy-manager instance.
///
/// Equality and hashing are defined over `(instance_url, application_id)`
/// only; store identity and mutable attributes do not participate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployApplication {
    pub id: Option<ApplicationId>,
    pub collector_id: Option<CollectorId>,
    pub instance_url: String,
    pub application_id: String,
    pub application_name: String,
    pub nice_name: String,
    pub description: String,
    pub enabled: bool,
}

impl DeployApplication {
    /// A freshly discovered application, not yet persisted.
    pub fn discovered(instance_url: &str, application_id: &str, application_name: &str) -> Self {
        Self {
            id: None,
            collector_id: None,
            instance_url: instance_url.to_string(),
            application_id: application_id.to_string(),
            application_name: application_name.to_string(),
            nice_name: String::new(),
            description: String::new(),
            enabled: false,
        }
    }
}

impl PartialEq for DeployApplication {
    fn eq(&self, other: &Self) -> bool {
        self.application_id == other.application_id && self.instance_url == other.instance_url
    }
}

impl Eq for DeployApplication {}

impl Hash for DeployApplication {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.instance_url.hash(state);
        self.application_id.hash(state);
    }
}

/// A named deployment target within an application. Fetched per cycle,
/// never persisted standalone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub id: String,
    pub name: String,
}

/// Per-environment component snapshot row, fully replaced each cycle for a
/// given owning application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentComponent {
    pub collector_item_id: ApplicationId,
    pub environment_name: String,
    pub component_name: String,
    pub component_version: String,
    pub deployed: bool,
    pub as_of: DateTime<Utc>,
    pub environment_url: String,
}

/// Per-environment resource status snapshot row, same replace lifecycle as
/// [`EnvironmentComponent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentStatus {
    pub collector_item_id: ApplicationId,
    pub component_id: String,
    pub component_name: String,
    pub environment_name: String,
    pub resource_name: String,
    pub online: bool,
}

/// Combined environment/resource/component record as fetched from the
/// gateway for one (application, environment) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvResCompData {
    pub collector_item_id: ApplicationId,
    pub component_id: String,
    pub component_name: String,
    pub component_version: String,
    pub deployed: bool,
    pub environment_name: String,
    pub as_of: DateTime<Utc>,
    pub online: bool,
    pub resource_name: String,
}
