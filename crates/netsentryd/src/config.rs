//! Configuration management for netsentryd.
//!
//! Loads settings from /etc/netsentry/config.toml, falling back to a
//! netsentry.toml in the working directory. The network lists have no sane
//! defaults, so a missing or structurally invalid configuration is fatal at
//! startup; everything else defaults to the values below.

use anyhow::{bail, Context, Result};
use netsentry_common::NetworkProfile;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// System-wide config file path
pub const CONFIG_PATH: &str = "/etc/netsentry/config.toml";

/// Fallback config file path for running from a checkout
pub const LOCAL_CONFIG_PATH: &str = "netsentry.toml";

/// Known networks, ranked by preference
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworksConfig {
    /// Primary SSIDs in preference order, most preferred first
    #[serde(default)]
    pub primary_ssids: Vec<String>,

    /// Shared password for the primary networks; empty for open networks
    #[serde(default)]
    pub primary_password: String,

    /// Last-resort network, typically a phone hotspot
    #[serde(default)]
    pub secondary_ssid: String,

    #[serde(default)]
    pub secondary_password: String,
}

/// Monitoring cadence and thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Host probed to establish connectivity
    #[serde(default = "default_probe_target")]
    pub probe_target: String,

    /// Consecutive failed probes that trigger a recovery episode
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Seconds between monitoring ticks
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,

    /// While on the secondary network, seconds between attempts to steer
    /// the system back toward a primary network
    #[serde(default = "default_reselect_interval")]
    pub reselect_interval_secs: u64,

    /// Latency samples kept per tier for the rolling average
    #[serde(default = "default_latency_samples")]
    pub latency_sample_size: usize,

    /// Tick-to-tick gap beyond which the host is assumed to have slept
    #[serde(default = "default_wake_threshold")]
    pub wake_threshold_secs: u64,

    /// Probing pause after a wake event, while the OS re-establishes
    /// its own network state
    #[serde(default = "default_wake_grace")]
    pub wake_grace_secs: u64,
}

fn default_probe_target() -> String {
    "8.8.8.8".to_string()
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_tick_interval() -> u64 {
    3
}

fn default_reselect_interval() -> u64 {
    300
}

fn default_latency_samples() -> usize {
    10
}

fn default_wake_threshold() -> u64 {
    60
}

fn default_wake_grace() -> u64 {
    15
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            probe_target: default_probe_target(),
            failure_threshold: default_failure_threshold(),
            tick_interval_secs: default_tick_interval(),
            reselect_interval_secs: default_reselect_interval(),
            latency_sample_size: default_latency_samples(),
            wake_threshold_secs: default_wake_threshold(),
            wake_grace_secs: default_wake_grace(),
        }
    }
}

/// Wireless interface settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceConfig {
    /// Interface the watchdog drives, usually en0
    #[serde(default = "default_interface")]
    pub name: String,
}

fn default_interface() -> String {
    "en0".to_string()
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self {
            name: default_interface(),
        }
    }
}

/// Command timeouts and settle delays
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    /// Probe timeout in milliseconds
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Timeout for querying the associated network name
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,

    /// Timeout for a forceful connection command
    #[serde(default = "default_switch_timeout")]
    pub switch_timeout_secs: u64,

    /// Pause between radio off and radio on during a soft reselect
    #[serde(default = "default_radio_toggle_gap")]
    pub radio_toggle_gap_secs: u64,

    /// Wait after a timed reselect before resuming monitoring
    #[serde(default = "default_reselect_settle")]
    pub reselect_settle_secs: u64,

    /// Wait after a gentle recovery attempt before verifying it
    #[serde(default = "default_gentle_settle")]
    pub gentle_settle_secs: u64,

    /// Wait after an accepted forceful connection before verifying it
    #[serde(default = "default_forceful_settle")]
    pub forceful_settle_secs: u64,
}

fn default_probe_timeout_ms() -> u64 {
    1500
}

fn default_query_timeout() -> u64 {
    10
}

fn default_switch_timeout() -> u64 {
    15
}

fn default_radio_toggle_gap() -> u64 {
    2
}

fn default_reselect_settle() -> u64 {
    10
}

fn default_gentle_settle() -> u64 {
    15
}

fn default_forceful_settle() -> u64 {
    10
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: default_probe_timeout_ms(),
            query_timeout_secs: default_query_timeout(),
            switch_timeout_secs: default_switch_timeout(),
            radio_toggle_gap_secs: default_radio_toggle_gap(),
            reselect_settle_secs: default_reselect_settle(),
            gentle_settle_secs: default_gentle_settle(),
            forceful_settle_secs: default_forceful_settle(),
        }
    }
}

/// Full watchdog configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub networks: NetworksConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub interface: InterfaceConfig,

    #[serde(default)]
    pub timeouts: TimeoutsConfig,
}

impl Config {
    /// Load config from the standard locations.
    pub fn load() -> Result<Self> {
        Self::load_from_path(Path::new(CONFIG_PATH))
            .or_else(|_| Self::load_from_path(Path::new(LOCAL_CONFIG_PATH)))
            .with_context(|| {
                format!(
                    "no readable config at {} or ./{}",
                    CONFIG_PATH, LOCAL_CONFIG_PATH
                )
            })
    }

    /// Load config from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Reject structurally invalid configuration before monitoring starts.
    pub fn validate(&self) -> Result<()> {
        if self.networks.primary_ssids.is_empty() {
            bail!("no primary networks configured");
        }
        if self.networks.secondary_ssid.trim().is_empty() {
            bail!("no secondary network configured");
        }
        let mut seen = HashSet::new();
        for ssid in self
            .networks
            .primary_ssids
            .iter()
            .chain(std::iter::once(&self.networks.secondary_ssid))
        {
            if ssid.trim().is_empty() {
                bail!("empty SSID in network list");
            }
            if !seen.insert(ssid.as_str()) {
                bail!("duplicate SSID in network list: '{}'", ssid);
            }
        }
        if self.monitor.probe_target.trim().is_empty() {
            bail!("probe target must not be empty");
        }
        if self.monitor.failure_threshold == 0 {
            bail!("failure threshold must be at least 1");
        }
        if self.monitor.tick_interval_secs == 0 {
            bail!("tick interval must be at least 1 second");
        }
        if self.monitor.latency_sample_size == 0 {
            bail!("latency sample size must be at least 1");
        }
        if self.monitor.wake_threshold_secs <= self.monitor.tick_interval_secs {
            bail!("wake detection threshold must exceed the tick interval");
        }
        if self.interface.name.trim().is_empty() {
            bail!("wireless interface must not be empty");
        }
        Ok(())
    }

    /// The ranked known-network list: primaries in order, then the secondary.
    pub fn profiles(&self) -> Vec<NetworkProfile> {
        let mut profiles: Vec<NetworkProfile> = self
            .networks
            .primary_ssids
            .iter()
            .enumerate()
            .map(|(rank, ssid)| {
                NetworkProfile::primary(ssid.clone(), self.networks.primary_password.clone(), rank)
            })
            .collect();
        profiles.push(NetworkProfile::secondary(
            self.networks.secondary_ssid.clone(),
            self.networks.secondary_password.clone(),
        ));
        profiles
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.monitor.tick_interval_secs)
    }

    pub fn reselect_interval(&self) -> Duration {
        Duration::from_secs(self.monitor.reselect_interval_secs)
    }

    pub fn wake_threshold(&self) -> Duration {
        Duration::from_secs(self.monitor.wake_threshold_secs)
    }

    pub fn wake_grace(&self) -> Duration {
        Duration::from_secs(self.monitor.wake_grace_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.probe_timeout_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.query_timeout_secs)
    }

    pub fn switch_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.switch_timeout_secs)
    }

    pub fn radio_toggle_gap(&self) -> Duration {
        Duration::from_secs(self.timeouts.radio_toggle_gap_secs)
    }

    pub fn reselect_settle(&self) -> Duration {
        Duration::from_secs(self.timeouts.reselect_settle_secs)
    }

    pub fn gentle_settle(&self) -> Duration {
        Duration::from_secs(self.timeouts.gentle_settle_secs)
    }

    pub fn forceful_settle(&self) -> Duration {
        Duration::from_secs(self.timeouts.forceful_settle_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netsentry_common::Tier;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.networks.primary_ssids = vec!["Home-5G".into(), "Home".into()];
        config.networks.primary_password = "pw".into();
        config.networks.secondary_ssid = "Hotspot".into();
        config
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.monitor.probe_target, "8.8.8.8");
        assert_eq!(config.monitor.failure_threshold, 3);
        assert_eq!(config.monitor.tick_interval_secs, 3);
        assert_eq!(config.monitor.reselect_interval_secs, 300);
        assert_eq!(config.timeouts.probe_timeout_ms, 1500);
        assert_eq!(config.interface.name, "en0");
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[networks]
primary_ssids = ["Cafe", "Cafe-5G"]
primary_password = "espresso"
secondary_ssid = "Phone"
secondary_password = "tether"

[monitor]
failure_threshold = 5
tick_interval_secs = 10
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.networks.primary_ssids.len(), 2);
        assert_eq!(config.monitor.failure_threshold, 5);
        assert_eq!(config.monitor.tick_interval_secs, 10);
        // Defaults for missing fields
        assert_eq!(config.monitor.reselect_interval_secs, 300);
        assert_eq!(config.timeouts.switch_timeout_secs, 15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_primaries() {
        let mut config = valid_config();
        config.networks.primary_ssids.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_missing_secondary() {
        let mut config = valid_config();
        config.networks.secondary_ssid = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let mut config = valid_config();
        config.networks.primary_ssids = vec!["Home".into(), "Home".into()];
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.networks.secondary_ssid = "Home-5G".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_thresholds() {
        let mut config = valid_config();
        config.monitor.failure_threshold = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.monitor.tick_interval_secs = 0;
        assert!(config.validate().is_err());

        // Wake threshold must be well above the tick cadence
        let mut config = valid_config();
        config.monitor.wake_threshold_secs = config.monitor.tick_interval_secs;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_profiles_ordering() {
        let config = valid_config();
        let profiles = config.profiles();
        assert_eq!(profiles.len(), 3);
        assert_eq!(profiles[0].ssid, "Home-5G");
        assert_eq!(profiles[0].tier, Tier::Primary);
        assert_eq!(profiles[0].rank, 0);
        assert_eq!(profiles[1].rank, 1);
        assert_eq!(profiles[2].ssid, "Hotspot");
        assert_eq!(profiles[2].tier, Tier::Secondary);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("netsentry.toml");
        std::fs::write(
            &path,
            r#"
[networks]
primary_ssids = ["Lab"]
secondary_ssid = "Phone"
"#,
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.networks.primary_ssids, vec!["Lab".to_string()]);

        assert!(Config::load_from_path(&dir.path().join("missing.toml")).is_err());
    }
}
