//! Shared, write-through handle over the live [`MonitorConfig`].
//!
//! The scheduler worker and every control path (API, CLI) hold clones of the
//! same [`SharedConfig`]. Locks are held only for the duration of a read or a
//! mutation, never across a probe, so toggles apply immediately even while a
//! sweep is in flight. Each mutation is persisted before the lock is
//! released; status updates from the worker are not.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::{validate_target_url, MonitorConfig, Target};
use crate::monitor::status::StatusValue;
use crate::store::ConfigStore;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    #[error("Target '{0}' not found")]
    TargetNotFound(String),
    #[error("Target '{0}' already exists")]
    DuplicateTarget(String),
    #[error("Invalid target URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),
}

/// Snapshot of the two delivery switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationFlags {
    pub notifications: bool,
    pub vibration: bool,
}

/// Partial settings update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub check_interval_seconds: Option<u64>,
    pub alert_cooldown_seconds: Option<u64>,
    pub notifications_enabled: Option<bool>,
    pub vibration_enabled: Option<bool>,
}

#[derive(Clone)]
pub struct SharedConfig {
    inner: Arc<RwLock<MonitorConfig>>,
    store: Arc<dyn ConfigStore>,
}

impl SharedConfig {
    pub fn new(config: MonitorConfig, store: Arc<dyn ConfigStore>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
            store,
        }
    }

    /// Load from the store (falling back to defaults) and wrap.
    pub fn load(store: Arc<dyn ConfigStore>) -> Self {
        let config = store.load();
        Self::new(config, store)
    }

    pub async fn snapshot(&self) -> MonitorConfig {
        self.inner.read().await.clone()
    }

    pub async fn targets(&self) -> Vec<Target> {
        self.inner.read().await.targets.clone()
    }

    pub async fn enabled_targets(&self) -> Vec<Target> {
        self.inner.read().await.enabled_targets()
    }

    pub async fn check_interval(&self) -> Duration {
        self.inner.read().await.check_interval()
    }

    pub async fn alert_cooldown(&self) -> Duration {
        self.inner.read().await.alert_cooldown()
    }

    pub async fn notification_flags(&self) -> NotificationFlags {
        let c = self.inner.read().await;
        NotificationFlags {
            notifications: c.notifications_enabled,
            vibration: c.vibration_enabled,
        }
    }

    /// Store the worker's latest observation. Returns false when the target
    /// was removed while its probe was in flight.
    pub async fn record_status(&self, name: &str, status: StatusValue) -> bool {
        match self.inner.write().await.target_mut(name) {
            Some(t) => {
                t.status = status;
                true
            }
            None => false,
        }
    }

    /// Write the current state to the store, statuses included.
    pub async fn persist(&self) {
        let config = self.inner.read().await;
        self.save(&config).await;
    }

    /// Hand a snapshot to the store on the blocking pool. Callers keep their
    /// lock until this returns, so saves land in mutation order.
    async fn save(&self, config: &MonitorConfig) {
        let store = Arc::clone(&self.store);
        let snapshot = config.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || store.save(&snapshot)).await {
            warn!(error = %e, "Config save task failed");
        }
    }

    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut MonitorConfig) -> Result<T, ControlError>,
    ) -> Result<T, ControlError> {
        let mut config = self.inner.write().await;
        let out = f(&mut config)?;
        self.save(&config).await;
        Ok(out)
    }

    pub async fn set_target_enabled(&self, name: &str, enabled: bool) -> Result<(), ControlError> {
        self.mutate(|c| {
            let t = c
                .target_mut(name)
                .ok_or_else(|| ControlError::TargetNotFound(name.to_string()))?;
            t.monitor_enabled = enabled;
            Ok(())
        })
        .await?;
        info!(target_name = %name, enabled, "Target monitoring toggled");
        Ok(())
    }

    /// Returns how many targets are affected.
    pub async fn set_all_enabled(&self, enabled: bool) -> usize {
        let count = self
            .mutate(|c| {
                for t in c.targets.iter_mut() {
                    t.monitor_enabled = enabled;
                }
                Ok(c.targets.len())
            })
            .await
            .unwrap_or(0);
        info!(enabled, count, "Monitoring toggled for all targets");
        count
    }

    pub async fn add_target(&self, mut target: Target) -> Result<(), ControlError> {
        validate_target_url(&target.url).map_err(ControlError::InvalidUrl)?;
        if target.name.trim().is_empty() {
            return Err(ControlError::InvalidSetting(
                "target name must not be empty".into(),
            ));
        }
        target.status = StatusValue::Unknown;
        let name = target.name.clone();
        self.mutate(|c| {
            if c.target(&target.name).is_some() {
                return Err(ControlError::DuplicateTarget(target.name.clone()));
            }
            c.targets.push(target);
            Ok(())
        })
        .await?;
        info!(target_name = %name, "Target added");
        Ok(())
    }

    pub async fn remove_target(&self, name: &str) -> Result<Target, ControlError> {
        let removed = self
            .mutate(|c| {
                let idx = c
                    .targets
                    .iter()
                    .position(|t| t.name == name)
                    .ok_or_else(|| ControlError::TargetNotFound(name.to_string()))?;
                Ok(c.targets.remove(idx))
            })
            .await?;
        info!(target_name = %name, "Target removed");
        Ok(removed)
    }

    pub async fn set_notifications_enabled(&self, enabled: bool) {
        let _ = self
            .mutate(|c| {
                c.notifications_enabled = enabled;
                Ok(())
            })
            .await;
        info!(enabled, "Notifications toggled");
    }

    /// Flip the notification switch and return the new value.
    pub async fn toggle_notifications(&self) -> bool {
        let enabled = self
            .mutate(|c| {
                c.notifications_enabled = !c.notifications_enabled;
                Ok(c.notifications_enabled)
            })
            .await
            .unwrap_or_default();
        info!(enabled, "Notifications toggled");
        enabled
    }

    pub async fn set_vibration_enabled(&self, enabled: bool) {
        let _ = self
            .mutate(|c| {
                c.vibration_enabled = enabled;
                Ok(())
            })
            .await;
        info!(enabled, "Vibration toggled");
    }

    pub async fn set_check_interval(&self, secs: u64) -> Result<(), ControlError> {
        self.apply_settings(SettingsUpdate {
            check_interval_seconds: Some(secs),
            ..Default::default()
        })
        .await
    }

    pub async fn set_alert_cooldown(&self, secs: u64) {
        let _ = self
            .apply_settings(SettingsUpdate {
                alert_cooldown_seconds: Some(secs),
                ..Default::default()
            })
            .await;
    }

    /// Apply several settings at once; validated as a whole, persisted once.
    pub async fn apply_settings(&self, update: SettingsUpdate) -> Result<(), ControlError> {
        if update.check_interval_seconds == Some(0) {
            return Err(ControlError::InvalidSetting(
                "check_interval must be greater than zero".into(),
            ));
        }
        self.mutate(|c| {
            if let Some(v) = update.check_interval_seconds {
                c.check_interval_seconds = v;
            }
            if let Some(v) = update.alert_cooldown_seconds {
                c.alert_cooldown_seconds = v;
            }
            if let Some(v) = update.notifications_enabled {
                c.notifications_enabled = v;
            }
            if let Some(v) = update.vibration_enabled {
                c.vibration_enabled = v;
            }
            Ok(())
        })
        .await?;
        info!(?update, "Settings updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn shared() -> (SharedConfig, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let config = SharedConfig::new(MonitorConfig::default(), store.clone());
        (config, store)
    }

    #[tokio::test]
    async fn toggling_a_target_is_written_through() {
        let (config, store) = shared();
        config.set_target_enabled("Naver", true).await.unwrap();

        let persisted = store.read().unwrap();
        assert!(persisted.target("Naver").unwrap().monitor_enabled);
        assert_eq!(config.enabled_targets().await.len(), 3);
    }

    #[tokio::test]
    async fn toggling_unknown_target_fails_without_saving() {
        let (config, store) = shared();
        let err = config.set_target_enabled("nope", true).await.unwrap_err();
        assert_eq!(err, ControlError::TargetNotFound("nope".into()));
        assert!(store.contents().is_none());
    }

    #[tokio::test]
    async fn set_all_enabled_flips_every_target() {
        let (config, store) = shared();
        assert_eq!(config.set_all_enabled(false).await, 3);
        assert!(config.enabled_targets().await.is_empty());
        assert!(store.read().unwrap().enabled_targets().is_empty());

        config.set_all_enabled(true).await;
        assert_eq!(config.enabled_targets().await.len(), 3);
    }

    #[tokio::test]
    async fn add_target_validates_and_appends() {
        let (config, store) = shared();
        config
            .add_target(Target::new("api", "https://api.example/health"))
            .await
            .unwrap();
        let targets = config.targets().await;
        assert_eq!(targets.last().unwrap().name, "api");
        assert_eq!(store.read().unwrap().targets.len(), 4);

        let dup = config
            .add_target(Target::new("api", "https://other.example"))
            .await
            .unwrap_err();
        assert_eq!(dup, ControlError::DuplicateTarget("api".into()));

        let bad = config
            .add_target(Target::new("bad", "localhost:8080"))
            .await
            .unwrap_err();
        assert!(matches!(bad, ControlError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn added_target_starts_unknown() {
        let (config, _) = shared();
        let mut t = Target::new("api", "https://api.example");
        t.status = StatusValue::Online;
        config.add_target(t).await.unwrap();
        let snapshot = config.snapshot().await;
        assert_eq!(snapshot.target("api").unwrap().status, StatusValue::Unknown);
    }

    #[tokio::test]
    async fn remove_target_returns_it() {
        let (config, _) = shared();
        let removed = config.remove_target("GitHub").await.unwrap();
        assert_eq!(removed.url, "https://github.com");
        assert!(config.snapshot().await.target("GitHub").is_none());
        assert!(config.remove_target("GitHub").await.is_err());
    }

    #[tokio::test]
    async fn settings_updates_persist() {
        let (config, store) = shared();
        assert!(!config.toggle_notifications().await);
        config.set_vibration_enabled(false).await;
        config.set_check_interval(45).await.unwrap();
        config.set_alert_cooldown(0).await;

        let persisted = store.read().unwrap();
        assert!(!persisted.notifications_enabled);
        assert!(!persisted.vibration_enabled);
        assert_eq!(persisted.check_interval_seconds, 45);
        assert_eq!(persisted.alert_cooldown_seconds, 0);
        assert_eq!(
            config.notification_flags().await,
            NotificationFlags {
                notifications: false,
                vibration: false
            }
        );
    }

    #[tokio::test]
    async fn zero_interval_rejected() {
        let (config, store) = shared();
        let err = config.set_check_interval(0).await.unwrap_err();
        assert!(matches!(err, ControlError::InvalidSetting(_)));
        assert!(store.contents().is_none());
        assert_eq!(config.check_interval().await, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn record_status_is_not_persisted() {
        let (config, store) = shared();
        assert!(config.record_status("Google", StatusValue::Online).await);
        assert!(!config.record_status("missing", StatusValue::Online).await);
        assert!(store.contents().is_none());

        config.persist().await;
        assert!(store.contents().unwrap().contains("\"online\""));
    }

    /// Store whose writes block the calling thread for a while.
    #[derive(Default)]
    struct SlowStore {
        writing: std::sync::atomic::AtomicBool,
        inner: MemoryStore,
    }

    impl ConfigStore for SlowStore {
        fn location(&self) -> String {
            "slow".into()
        }

        fn read(&self) -> Result<MonitorConfig, crate::store::StoreError> {
            self.inner.read()
        }

        fn write(&self, config: &MonitorConfig) -> Result<(), crate::store::StoreError> {
            use std::sync::atomic::Ordering;
            self.writing.store(true, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(300));
            let out = self.inner.write(config);
            self.writing.store(false, Ordering::SeqCst);
            out
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn saving_does_not_stall_the_runtime() {
        use std::sync::atomic::Ordering;
        let store = Arc::new(SlowStore::default());
        let config = SharedConfig::new(MonitorConfig::default(), store.clone());

        let writer = {
            let config = config.clone();
            tokio::spawn(async move { config.set_check_interval(30).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(store.writing.load(Ordering::SeqCst));

        writer.await.unwrap().unwrap();
        assert!(!store.writing.load(Ordering::SeqCst));
        assert_eq!(store.read().unwrap().check_interval_seconds, 30);
    }
}
