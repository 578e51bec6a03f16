//! Monitor configuration.
//!
//! Supports loading from YAML files with environment variable overrides.
//!
//! ```yaml
//! receivers:
//!   - name: Living Room
//!     host: 192.168.1.40
//!   - name: Studio
//!     host: avr-studio.local
//!     port: 80
//! poll_interval: 10
//! settle_delay_ms: 1500
//! ```

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use denonavr_core::protocol_constants::DEFAULT_PORT;
use serde::Deserialize;

/// One receiver to monitor.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ReceiverConfig {
    /// Display name, used by `power --receiver`.
    pub name: String,
    /// Host name or IP address.
    pub host: String,
    /// HTTP port of the AppCommand interface.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Monitor configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Receivers to poll.
    pub receivers: Vec<ReceiverConfig>,

    /// Seconds between background polls.
    /// Override: `DENONAVR_POLL_INTERVAL`
    pub poll_interval: u64,

    /// Milliseconds to wait after a command before re-polling.
    /// Override: `DENONAVR_SETTLE_DELAY_MS`
    pub settle_delay_ms: u64,

    /// HTTP request timeout in seconds.
    /// Override: `DENONAVR_REQUEST_TIMEOUT`
    pub request_timeout: u64,

    /// Zone mapped to the first stereo member flag.
    pub stereo_first_zone: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let core = denonavr_core::Config::default();
        Self {
            receivers: Vec::new(),
            poll_interval: core.poll_interval_secs,
            settle_delay_ms: core.settle_delay_ms,
            request_timeout: core.request_timeout_secs,
            stereo_first_zone: core.stereo_first_zone,
        }
    }
}

impl MonitorConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies overrides looked up by environment variable name.
    ///
    /// Unparsable values are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(interval) = lookup("DENONAVR_POLL_INTERVAL").and_then(|v| v.parse().ok()) {
            self.poll_interval = interval;
        }

        if let Some(delay) = lookup("DENONAVR_SETTLE_DELAY_MS").and_then(|v| v.parse().ok()) {
            self.settle_delay_ms = delay;
        }

        if let Some(timeout) = lookup("DENONAVR_REQUEST_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.request_timeout = timeout;
        }
    }

    /// Checks the receiver list. Receiver identity is never validated by the
    /// core library.
    pub fn validate(&self) -> Result<()> {
        if self.receivers.is_empty() {
            bail!("No receivers configured (use --host or a config file)");
        }

        let mut hosts = HashSet::new();
        let mut names = HashSet::new();
        for receiver in &self.receivers {
            if receiver.name.trim().is_empty() {
                bail!("Receiver {} has an empty name", receiver.host);
            }
            if receiver.host.trim().is_empty() {
                bail!("Receiver '{}' has an empty host", receiver.name);
            }
            if receiver.port == 0 {
                bail!("Receiver '{}' has port 0", receiver.name);
            }
            if !hosts.insert((receiver.host.to_ascii_lowercase(), receiver.port)) {
                bail!("Receiver {}:{} is configured twice", receiver.host, receiver.port);
            }
            if !names.insert(receiver.name.as_str()) {
                bail!("Receiver name '{}' is used twice", receiver.name);
            }
        }

        self.to_core_config()
            .validate()
            .map_err(|e| anyhow::anyhow!(e))
    }

    /// Finds a receiver by name, case-insensitively.
    pub fn receiver(&self, name: &str) -> Option<&ReceiverConfig> {
        self.receivers
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }

    /// Converts to denonavr-core's Config type.
    pub fn to_core_config(&self) -> denonavr_core::Config {
        denonavr_core::Config {
            poll_interval_secs: self.poll_interval,
            settle_delay_ms: self.settle_delay_ms,
            request_timeout_secs: self.request_timeout,
            stereo_first_zone: self.stereo_first_zone,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn receiver(name: &str, host: &str) -> ReceiverConfig {
        ReceiverConfig {
            name: name.into(),
            host: host.into(),
            port: DEFAULT_PORT,
        }
    }

    #[test]
    fn loads_yaml_with_default_port() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "receivers:\n  - name: Living Room\n    host: 192.168.1.40\n  - name: Studio\n    host: avr.local\n    port: 80\nsettle_delay_ms: 2000"
        )
        .unwrap();

        let config = MonitorConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.receivers.len(), 2);
        assert_eq!(config.receivers[0].port, 8080);
        assert_eq!(config.receivers[1].port, 80);
        assert_eq!(config.settle_delay_ms, 2000);
        assert_eq!(config.stereo_first_zone, 2);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = MonitorConfig::load(Some(&dir.path().join("absent.yaml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "receivers: [unterminated").unwrap();
        let err = MonitorConfig::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn overrides_replace_parsable_values_only() {
        let env: HashMap<&str, &str> = [
            ("DENONAVR_POLL_INTERVAL", "30"),
            ("DENONAVR_SETTLE_DELAY_MS", "soon"),
            ("DENONAVR_REQUEST_TIMEOUT", "2"),
        ]
        .into_iter()
        .collect();

        let mut config = MonitorConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.poll_interval, 30);
        assert_eq!(config.settle_delay_ms, 1500);
        assert_eq!(config.request_timeout, 2);
    }

    #[test]
    fn validate_requires_receivers() {
        assert!(MonitorConfig::default().validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicates_and_blanks() {
        let mut config = MonitorConfig {
            receivers: vec![receiver("a", "10.0.0.1"), receiver("b", "10.0.0.1")],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.receivers = vec![receiver("a", "10.0.0.1"), receiver("a", "10.0.0.2")];
        assert!(config.validate().is_err());

        config.receivers = vec![receiver(" ", "10.0.0.1")];
        assert!(config.validate().is_err());

        config.receivers = vec![receiver("a", "10.0.0.1"), receiver("b", "10.0.0.2")];
        config.validate().unwrap();
    }

    #[test]
    fn validate_checks_core_values() {
        let config = MonitorConfig {
            receivers: vec![receiver("a", "10.0.0.1")],
            poll_interval: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn receiver_lookup_ignores_case() {
        let config = MonitorConfig {
            receivers: vec![receiver("Living Room", "10.0.0.1")],
            ..Default::default()
        };
        assert_eq!(config.receiver("living room").unwrap().host, "10.0.0.1");
        assert!(config.receiver("kitchen").is_none());
    }

    #[test]
    fn core_config_carries_timing() {
        let config = MonitorConfig {
            poll_interval: 5,
            settle_delay_ms: 900,
            ..Default::default()
        };
        let core = config.to_core_config();
        assert_eq!(core.poll_interval_secs, 5);
        assert_eq!(core.settle_delay_ms, 900);
    }
}
