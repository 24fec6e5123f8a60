use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::monitor::status::StatusValue;

pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_ALERT_COOLDOWN_SECS: u64 = 60;

/// One monitored HTTP(S) endpoint.
///
/// `status` is written to disk for external readers but never read back:
/// a freshly loaded target always starts out `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub url: String,
    #[serde(rename = "monitor", default)]
    pub monitor_enabled: bool,
    #[serde(skip_deserializing)]
    pub status: StatusValue,
}

impl Target {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            monitor_enabled: true,
            status: StatusValue::Unknown,
        }
    }

    pub fn with_monitor(mut self, enabled: bool) -> Self {
        self.monitor_enabled = enabled;
        self
    }
}

/// Process-wide monitor configuration, persisted after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(rename = "servers")]
    pub targets: Vec<Target>,
    #[serde(rename = "check_interval", default = "default_check_interval")]
    pub check_interval_seconds: u64,
    #[serde(rename = "alert_interval", default = "default_alert_cooldown")]
    pub alert_cooldown_seconds: u64,
    #[serde(rename = "notification_enabled", default = "default_true")]
    pub notifications_enabled: bool,
    #[serde(default = "default_true")]
    pub vibration_enabled: bool,
}

fn default_check_interval() -> u64 {
    DEFAULT_CHECK_INTERVAL_SECS
}

fn default_alert_cooldown() -> u64 {
    DEFAULT_ALERT_COOLDOWN_SECS
}

fn default_true() -> bool {
    true
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            targets: vec![
                Target::new("Google", "https://www.google.com"),
                Target::new("GitHub", "https://github.com"),
                Target::new("Naver", "https://www.naver.com").with_monitor(false),
            ],
            check_interval_seconds: DEFAULT_CHECK_INTERVAL_SECS,
            alert_cooldown_seconds: DEFAULT_ALERT_COOLDOWN_SECS,
            notifications_enabled: true,
            vibration_enabled: true,
        }
    }
}

impl MonitorConfig {
    pub fn empty() -> Self {
        Self {
            targets: Vec::new(),
            ..Self::default()
        }
    }

    pub fn with_targets(mut self, targets: Vec<Target>) -> Self {
        self.targets = targets;
        self
    }

    pub fn with_check_interval(mut self, secs: u64) -> Self {
        self.check_interval_seconds = secs;
        self
    }

    pub fn with_alert_cooldown(mut self, secs: u64) -> Self {
        self.alert_cooldown_seconds = secs;
        self
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds.max(1))
    }

    pub fn alert_cooldown(&self) -> Duration {
        Duration::from_secs(self.alert_cooldown_seconds)
    }

    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name == name)
    }

    pub fn target_mut(&mut self, name: &str) -> Option<&mut Target> {
        self.targets.iter_mut().find(|t| t.name == name)
    }

    pub fn enabled_targets(&self) -> Vec<Target> {
        self.targets
            .iter()
            .filter(|t| t.monitor_enabled)
            .cloned()
            .collect()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.check_interval_seconds == 0 {
            return Err("check_interval must be greater than zero".into());
        }

        let mut names = HashSet::new();
        for (i, t) in self.targets.iter().enumerate() {
            if t.name.trim().is_empty() {
                return Err(format!("Target at index {} has an empty name", i));
            }
            if !names.insert(t.name.as_str()) {
                return Err(format!("Duplicate target name: {}", t.name));
            }
            validate_target_url(&t.url)
                .map_err(|e| format!("Target '{}' has an invalid URL: {}", t.name, e))?;
        }

        Ok(())
    }
}

/// Targets must be absolute `http` or `https` URLs.
pub fn validate_target_url(raw: &str) -> Result<Url, String> {
    let parsed = Url::parse(raw).map_err(|e| format!("{} ({})", raw, e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(format!("{} (unsupported scheme '{}')", raw, other)),
    }
}

/// Runtime knobs for the monitoring engine that are not part of the
/// persisted configuration.
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// Upper bound on a single probe, connect included.
    pub probe_timeout: Duration,
    /// Probes in flight at once during a sweep.
    pub max_concurrent_probes: usize,
    /// Capacity of the recent-transition ring.
    pub event_limit: usize,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(10),
            max_concurrent_probes: 4,
            event_limit: 200,
        }
    }
}

impl MonitorOptions {
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_max_concurrent_probes(mut self, max: usize) -> Self {
        self.max_concurrent_probes = max.max(1);
        self
    }

    pub fn with_event_limit(mut self, limit: usize) -> Self {
        self.event_limit = limit.max(1);
        self
    }
}
