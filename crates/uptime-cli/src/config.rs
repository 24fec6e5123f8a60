//! TOML configuration for the `serve` command.
//!
//! Example:
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:8080"
//! log_format = "json"
//!
//! [store]
//! path = "/var/lib/uptime-monitor/config.json"
//!
//! [probe]
//! timeout_secs = 10
//! max_concurrent = 4
//! event_limit = 200
//!
//! [notifications]
//! app_name = "Server Monitor"
//!
//! [[webhook]]
//! url = "https://hooks.example.com/uptime"
//! events = ["problem", "recovery"]
//! secret = "shared-key"
//! ```
//!
//! The monitored targets and their settings live in the JSON store, not
//! here; this file only describes the process.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use uptime_core::notify::DEFAULT_APP_NAME;
use uptime_core::{MonitorOptions, WebhookConfig};

pub const DEFAULT_STORE_PATH: &str = "config.json";

const WEBHOOK_KINDS: [&str; 3] = ["recovery", "problem", "test"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,

    #[serde(default)]
    pub webhook: Vec<WebhookConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_format: default_log_format(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_log_format() -> String {
    "pretty".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    #[serde(default = "default_event_limit")]
    pub event_limit: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_concurrent: default_max_concurrent(),
            event_limit: default_event_limit(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_concurrent() -> usize {
    4
}

fn default_event_limit() -> usize {
    200
}

impl ProbeConfig {
    pub fn to_options(&self) -> MonitorOptions {
        MonitorOptions::default()
            .with_probe_timeout(Duration::from_secs(self.timeout_secs))
            .with_max_concurrent_probes(self.max_concurrent)
            .with_event_limit(self.event_limit)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Write notifications to the log.
    #[serde(default = "default_true")]
    pub log: bool,

    /// Log the feedback pulse as well.
    #[serde(default = "default_true")]
    pub feedback: bool,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            log: true,
            feedback: true,
        }
    }
}

fn default_app_name() -> String {
    DEFAULT_APP_NAME.into()
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file {}: {}", path.display(), e))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        match self.server.log_format.as_str() {
            "pretty" | "json" => {}
            other => {
                return Err(format!(
                    "Invalid log_format '{}': must be 'pretty' or 'json'",
                    other
                ))
            }
        }

        if self.probe.timeout_secs == 0 {
            return Err("probe.timeout_secs must be greater than zero".into());
        }
        if self.probe.max_concurrent == 0 {
            return Err("probe.max_concurrent must be greater than zero".into());
        }

        for (i, wh) in self.webhook.iter().enumerate() {
            let parsed = url::Url::parse(&wh.url)
                .map_err(|e| format!("Invalid webhook URL at index {}: {} ({})", i, wh.url, e))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(format!("Webhook URL must use http or https: {}", wh.url));
            }
            if let Some(bad) = wh.events.iter().find(|e| !WEBHOOK_KINDS.contains(&e.as_str())) {
                return Err(format!(
                    "Unknown webhook event '{}' for {}: expected one of {}",
                    bad,
                    wh.url,
                    WEBHOOK_KINDS.join(", ")
                ));
            }
        }

        Ok(())
    }
}
