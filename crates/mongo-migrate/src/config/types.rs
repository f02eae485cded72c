//! Configuration type definitions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::resolver::UnknownPointerPolicy;
use crate::uri::{ConnectionInfo, DeploymentMode};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Database connection.
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Migration behavior.
    #[serde(default)]
    pub migration: MigrationConfig,

    /// Managed-cloud provisioning.
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
}

/// Database connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// MongoDB connection URI. Usually supplied through the `URI` environment variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    /// Connect and server selection timeout in seconds (default: 30).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            uri: None,
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Directory of descriptor files (default: "migrations").
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// Pause between applied migrations in milliseconds (default: 2000).
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// What to do when the recorded version is not in the directory (default: fail).
    #[serde(default)]
    pub on_unknown_pointer: UnknownPointerPolicy,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            pacing_ms: default_pacing_ms(),
            on_unknown_pointer: UnknownPointerPolicy::default(),
        }
    }
}

/// Managed-cloud provisioning configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    /// Azure resource group of the Cosmos DB account.
    #[serde(default)]
    pub resource_group: String,

    /// Provisioning tool executable (default: "az").
    #[serde(default = "default_executable")]
    pub executable: String,

    /// Deployment mode (default: auto, derived from the connection host).
    #[serde(default)]
    pub mode: ModeSetting,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            resource_group: String::new(),
            executable: default_executable(),
            mode: ModeSetting::default(),
        }
    }
}

/// Configured deployment mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeSetting {
    /// Local when the host is localhost or loopback, managed cloud otherwise.
    #[default]
    Auto,
    Local,
    ManagedCloud,
}

impl ModeSetting {
    /// Resolve against the parsed connection.
    pub fn resolve(&self, info: &ConnectionInfo) -> DeploymentMode {
        match self {
            ModeSetting::Auto => info.deployment_mode(),
            ModeSetting::Local => DeploymentMode::Local,
            ModeSetting::ManagedCloud => DeploymentMode::ManagedCloud,
        }
    }
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_pacing_ms() -> u64 {
    2000
}

fn default_executable() -> String {
    "az".to_string()
}
