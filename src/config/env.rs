//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

use super::{AppConfig, BASTION_IP_KEY};

/// Environment variable prefix
const ENV_PREFIX: &str = "ZNODES";

/// Overrides read from `ZNODES_*` environment variables
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvConfig {
    /// Config file from ZNODES_CONFIG
    pub config_file: Option<String>,
    /// OCP version from ZNODES_OCP_VERSION
    pub ocp_version: Option<String>,
    /// Timeout from ZNODES_TIMEOUT
    pub timeout: Option<u64>,
    /// Grace period from ZNODES_GRACE_PERIOD
    pub grace_period: Option<u64>,
    /// Poll interval from ZNODES_POLL_INTERVAL
    pub poll_interval: Option<u64>,
    /// Concurrency from ZNODES_CONCURRENCY
    pub concurrency: Option<usize>,
    /// Bastion host from ZNODES_BASTION_IP
    pub bastion_ip: Option<String>,
    /// Log filter from ZNODES_LOG
    pub log: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            config_file: get_env("CONFIG"),
            ocp_version: get_env("OCP_VERSION"),
            timeout: get_env_parse("TIMEOUT"),
            grace_period: get_env_parse("GRACE_PERIOD"),
            poll_interval: get_env_parse("POLL_INTERVAL"),
            concurrency: get_env_parse("CONCURRENCY"),
            bastion_ip: get_env("BASTION_IP"),
            log: get_env("LOG"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        *self != Self::default()
    }

    /// Apply the overrides on top of file configuration
    pub fn apply(&self, config: &mut AppConfig) {
        let power = &mut config.power;
        if let Some(version) = &self.ocp_version {
            power.ocp_version = version.clone();
        }
        if let Some(timeout) = self.timeout {
            power.timeout_secs = timeout;
        }
        if let Some(grace) = self.grace_period {
            power.grace_period_secs = grace;
        }
        if let Some(interval) = self.poll_interval {
            power.poll_interval_secs = interval;
        }
        if let Some(concurrency) = self.concurrency {
            power.max_concurrent = concurrency;
        }
        if let Some(bastion) = &self.bastion_ip {
            config.env_data.insert(BASTION_IP_KEY, bastion.clone());
        }
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {}_CONFIG:         {:?}", ENV_PREFIX, self.config_file);
        println!("  {}_OCP_VERSION:    {:?}", ENV_PREFIX, self.ocp_version);
        println!("  {}_TIMEOUT:        {:?}", ENV_PREFIX, self.timeout);
        println!("  {}_GRACE_PERIOD:   {:?}", ENV_PREFIX, self.grace_period);
        println!("  {}_POLL_INTERVAL:  {:?}", ENV_PREFIX, self.poll_interval);
        println!("  {}_CONCURRENCY:    {:?}", ENV_PREFIX, self.concurrency);
        println!("  {}_BASTION_IP:     {:?}", ENV_PREFIX, self.bastion_ip);
        println!("  {}_LOG:            {:?}", ENV_PREFIX, self.log);
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Builder for setting environment variables (useful for testing)
#[derive(Default)]
pub struct EnvBuilder {
    vars: Vec<(String, String)>,
}

impl EnvBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn var(mut self, name: &str, value: impl ToString) -> Self {
        self.vars
            .push((format!("{ENV_PREFIX}_{name}"), value.to_string()));
        self
    }

    pub fn ocp_version(self, version: &str) -> Self {
        self.var("OCP_VERSION", version)
    }

    pub fn grace_period(self, secs: u64) -> Self {
        self.var("GRACE_PERIOD", secs)
    }

    pub fn bastion_ip(self, ip: &str) -> Self {
        self.var("BASTION_IP", ip)
    }

    /// Apply and return guard that restores on drop
    pub fn apply_scoped(self) -> EnvGuard {
        let previous = self
            .vars
            .iter()
            .map(|(k, _)| (k.clone(), env::var(k).ok()))
            .collect();

        for (key, value) in self.vars {
            env::set_var(key, value);
        }

        EnvGuard { previous }
    }
}

/// Guard that restores environment variables on drop
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

/// Print all ZNODES environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_CONFIG         Path to configuration file");
    println!("  {ENV_PREFIX}_OCP_VERSION    OCP version used in domain names (e.g. 4.14)");
    println!("  {ENV_PREFIX}_TIMEOUT        Default operation timeout in seconds");
    println!("  {ENV_PREFIX}_GRACE_PERIOD   Pause after stopping services, in seconds");
    println!("  {ENV_PREFIX}_POLL_INTERVAL  Domain state poll interval in seconds");
    println!("  {ENV_PREFIX}_CONCURRENCY    Nodes handled at the same time");
    println!("  {ENV_PREFIX}_BASTION_IP     Bastion host; forces generic mode");
    println!("  {ENV_PREFIX}_LOG            Log filter (e.g. debug, znodes=trace)");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_OCP_VERSION=4.14");
    println!("  znodes restart worker-0 worker-1");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_config_default() {
        let config = EnvConfig::default();
        assert!(!config.has_any());
    }

    #[test]
    fn test_apply_overrides() {
        let env = EnvConfig {
            grace_period: Some(5),
            concurrency: Some(1),
            bastion_ip: Some("10.0.0.1".to_string()),
            ..Default::default()
        };
        assert!(env.has_any());

        let mut config = AppConfig::default();
        env.apply(&mut config);

        assert_eq!(config.power.grace_period_secs, 5);
        assert_eq!(config.power.max_concurrent, 1);
        assert_eq!(config.power.poll_interval_secs, 3);
        assert!(config.env_data.has_bastion());
    }

    #[test]
    fn test_env_builder() {
        let _guard = EnvBuilder::new()
            .ocp_version("4.16")
            .grace_period(42)
            .bastion_ip("192.168.1.10")
            .apply_scoped();

        let config = EnvConfig::load();
        assert_eq!(config.ocp_version.as_deref(), Some("4.16"));
        assert_eq!(config.grace_period, Some(42));
        assert_eq!(config.bastion_ip.as_deref(), Some("192.168.1.10"));
    }
}
