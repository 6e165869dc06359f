//! Configuration module
//!
//! Power-control settings plus the free-form environment data the test
//! framework hands us.

mod env;
mod file;

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use env::{print_env_help, EnvBuilder, EnvConfig, EnvGuard};
pub use file::ConfigFile;

/// Key in [`EnvData`] marking a bastion-host deployment
pub const BASTION_IP_KEY: &str = "bastion_ip";

/// Application configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Power-control tuning
    #[serde(default)]
    pub power: PowerConfig,

    /// Environment data (`ENV_DATA`)
    #[serde(default)]
    pub env_data: EnvData,
}

impl AppConfig {
    /// Resolve the effective configuration.
    ///
    /// The file is `path`, else `ZNODES_CONFIG`, else the first file found in
    /// the standard locations. Environment overrides and then the CLI
    /// concurrency are applied on top, and the result is validated.
    pub fn resolve(path: Option<&str>, env: &EnvConfig, concurrency: Option<usize>) -> Result<Self> {
        let file = match path.or(env.config_file.as_deref()) {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::load_default()?,
        };

        let mut app = file.app;
        env.apply(&mut app);
        if let Some(concurrency) = concurrency {
            app.power.max_concurrent = concurrency;
        }

        app.validate().context("Invalid effective configuration")?;
        debug!("Effective power config: {:?}", app.power);
        Ok(app)
    }

    pub fn validate(&self) -> Result<()> {
        self.power.validate()
    }
}

/// Timings and naming used by the node power controller
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerConfig {
    /// Dotted OCP version, used in domain names
    pub ocp_version: String,

    /// Domain name prefix
    pub domain_prefix: String,

    /// Prefix hypervisor commands with sudo
    pub use_sudo: bool,

    /// Command listing kernel modules
    pub lsmod_command: String,

    /// Module marking a KVM host
    pub kvm_marker: String,

    /// Default per-operation timeout in seconds
    pub timeout_secs: u64,

    /// Pause after stopping services, for pods to drain
    pub grace_period_secs: u64,

    /// Interval between domain state samples
    pub poll_interval_secs: u64,

    /// API server probes before giving up after a start
    pub connectivity_tries: u32,

    /// Nodes handled at the same time
    pub max_concurrent: usize,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            ocp_version: "4.14".to_string(),
            domain_prefix: "test-ocp".to_string(),
            use_sudo: true,
            lsmod_command: crate::virt::LSMOD_COMMAND.to_string(),
            kvm_marker: crate::virt::KVM_MARKER.to_string(),
            timeout_secs: 900,
            grace_period_secs: 360,
            poll_interval_secs: 3,
            connectivity_tries: 900,
            max_concurrent: 4,
        }
    }
}

impl PowerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            anyhow::bail!("power.poll_interval_secs must be greater than 0");
        }
        if self.max_concurrent == 0 {
            anyhow::bail!("power.max_concurrent must be greater than 0");
        }
        if self.connectivity_tries == 0 {
            anyhow::bail!("power.connectivity_tries must be greater than 0");
        }
        if self.ocp_version.trim().is_empty() {
            anyhow::bail!("power.ocp_version must not be empty");
        }
        Ok(())
    }
}

/// Free-form deployment data
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvData(BTreeMap<String, serde_json::Value>);

impl EnvData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Presence of the key is enough, whatever its value
    pub fn has_bastion(&self) -> bool {
        self.contains_key(BASTION_IP_KEY)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_power_config() {
        let config = PowerConfig::default();
        assert_eq!(config.grace_period(), Duration::from_secs(360));
        assert_eq!(config.poll_interval(), Duration::from_secs(3));
        assert_eq!(config.timeout(), Duration::from_secs(900));
        assert_eq!(config.connectivity_tries, 900);
    }

    #[test]
    fn test_bastion_presence() {
        assert!(!EnvData::new().has_bastion());
        assert!(EnvData::new().with(BASTION_IP_KEY, "10.0.0.5").has_bastion());
        // a null value still counts as present
        assert!(EnvData::new()
            .with(BASTION_IP_KEY, serde_json::Value::Null)
            .has_bastion());
    }

    fn write_config(dir: &tempfile::TempDir, yaml: &str) -> String {
        let path = dir.path().join("znodes.yaml");
        std::fs::write(&path, yaml).unwrap();
        path.to_string_lossy().to_string()
    }

    #[test]
    fn test_resolve_layers_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "power:\n  max_concurrent: 3\n  grace_period_secs: 10\n");

        let app = AppConfig::resolve(Some(&path), &EnvConfig::default(), None).unwrap();
        assert_eq!(app.power.max_concurrent, 3);
        assert_eq!(app.power.grace_period_secs, 10);

        let env = EnvConfig {
            concurrency: Some(2),
            ocp_version: Some("4.16".to_string()),
            ..Default::default()
        };
        let app = AppConfig::resolve(Some(&path), &env, None).unwrap();
        assert_eq!(app.power.max_concurrent, 2);
        assert_eq!(app.power.ocp_version, "4.16");

        // --concurrency wins over ZNODES_CONCURRENCY
        let app = AppConfig::resolve(Some(&path), &env, Some(7)).unwrap();
        assert_eq!(app.power.max_concurrent, 7);
    }

    #[test]
    fn test_resolve_uses_config_from_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "power:\n  ocp_version: \"4.12\"\n");
        let env = EnvConfig {
            config_file: Some(path),
            ..Default::default()
        };

        let app = AppConfig::resolve(None, &env, None).unwrap();
        assert_eq!(app.power.ocp_version, "4.12");
    }

    #[test]
    fn test_resolve_rejects_invalid_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "power:\n  poll_interval_secs: 5\n");

        let zero_interval = EnvConfig {
            poll_interval: Some(0),
            ..Default::default()
        };
        let err = AppConfig::resolve(Some(&path), &zero_interval, None).unwrap_err();
        assert!(format!("{err:#}").contains("poll_interval_secs"));

        let empty_version = EnvConfig {
            ocp_version: Some(String::new()),
            ..Default::default()
        };
        let err = AppConfig::resolve(Some(&path), &empty_version, None).unwrap_err();
        assert!(format!("{err:#}").contains("ocp_version"));

        let err = AppConfig::resolve(Some(&path), &EnvConfig::default(), Some(0)).unwrap_err();
        assert!(format!("{err:#}").contains("max_concurrent"));
    }

    #[test]
    fn test_partial_power_section() {
        let config: AppConfig =
            serde_yaml::from_str("power:\n  grace_period_secs: 10\n").unwrap();
        assert_eq!(config.power.grace_period_secs, 10);
        assert_eq!(config.power.poll_interval_secs, 3);
        assert!(config.env_data.is_empty());
    }
}
