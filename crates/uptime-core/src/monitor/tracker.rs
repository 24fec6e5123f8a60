//! Per-target status memory and alert gating.
//!
//! The tracker remembers the last classified status of every target, keyed
//! by target name, and turns consecutive observations into
//! [`Evaluation`]s. Whether an evaluation becomes a [`TransitionEvent`] is
//! decided here as well:
//!
//! - no change, no event;
//! - a change away from `Unknown` only establishes the baseline;
//! - problem alerts for the same target are rate-limited by the cooldown
//!   window, and an outage whose first alert was held back also has its
//!   recovery held back.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::event::TransitionEvent;
use super::status::StatusValue;
use crate::config::Target;
use crate::prober::Prober;

/// Outcome of comparing a fresh probe result with the stored one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub new_status: StatusValue,
    pub previous_status: StatusValue,
    pub transitioned: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertDecision {
    /// Status did not change.
    Unchanged,
    /// First observation after `Unknown`.
    Baseline,
    Deliver,
    /// Held back by the cooldown window.
    Suppressed,
}

/// Alert bookkeeping for one target. Lives only in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertTiming {
    pub last_alert: Option<DateTime<Utc>>,
    pub last_problem_alert: Option<DateTime<Utc>>,
    pub outage_muted: bool,
}

impl AlertTiming {
    pub fn decide(
        &mut self,
        eval: &Evaluation,
        cooldown: Duration,
        now: DateTime<Utc>,
    ) -> AlertDecision {
        if !eval.transitioned {
            return AlertDecision::Unchanged;
        }
        if eval.previous_status.is_unknown() || eval.new_status.is_unknown() {
            return AlertDecision::Baseline;
        }

        if eval.new_status.is_online() {
            if self.outage_muted {
                self.outage_muted = false;
                return AlertDecision::Suppressed;
            }
            self.last_alert = Some(now);
            return AlertDecision::Deliver;
        }

        if self.within_cooldown(cooldown, now) {
            if eval.previous_status.is_online() {
                self.outage_muted = true;
            }
            return AlertDecision::Suppressed;
        }

        self.last_alert = Some(now);
        self.last_problem_alert = Some(now);
        self.outage_muted = false;
        AlertDecision::Deliver
    }

    fn within_cooldown(&self, cooldown: Duration, now: DateTime<Utc>) -> bool {
        let Some(last) = self.last_problem_alert else {
            return false;
        };
        if cooldown.is_zero() {
            return false;
        }
        let window_ms = i64::try_from(cooldown.as_millis()).unwrap_or(i64::MAX);
        (now - last).num_milliseconds() < window_ms
    }
}

pub struct StateTracker {
    prober: Arc<dyn Prober>,
    statuses: RwLock<HashMap<String, StatusValue>>,
    alerts: RwLock<HashMap<String, AlertTiming>>,
}

impl StateTracker {
    pub fn new(prober: Arc<dyn Prober>) -> Self {
        Self {
            prober,
            statuses: RwLock::new(HashMap::new()),
            alerts: RwLock::new(HashMap::new()),
        }
    }

    /// Start the given targets at `Unknown`. Already known targets keep
    /// their status.
    pub async fn seed<'a>(&self, names: impl IntoIterator<Item = &'a str>) {
        let mut statuses = self.statuses.write().await;
        for name in names {
            statuses
                .entry(name.to_string())
                .or_insert(StatusValue::Unknown);
        }
    }

    pub async fn forget(&self, name: &str) {
        self.statuses.write().await.remove(name);
        self.alerts.write().await.remove(name);
    }

    pub async fn status(&self, name: &str) -> StatusValue {
        self.statuses
            .read()
            .await
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn last_alert_time(&self, name: &str) -> Option<DateTime<Utc>> {
        self.alerts
            .read()
            .await
            .get(name)
            .and_then(|t| t.last_alert)
    }

    /// Probe the target and fold the result into the stored status.
    pub async fn evaluate(&self, target: &Target) -> Evaluation {
        let status = self.prober.check(target).await;
        self.observe(&target.name, status).await
    }

    pub async fn observe(&self, name: &str, status: StatusValue) -> Evaluation {
        let mut statuses = self.statuses.write().await;
        let stored = statuses
            .entry(name.to_string())
            .or_insert(StatusValue::Unknown);

        if *stored == status {
            return Evaluation {
                new_status: status,
                previous_status: stored.clone(),
                transitioned: false,
            };
        }

        let previous = std::mem::replace(stored, status.clone());
        info!(target_name = %name, from = %previous, to = %status, "Status changed");
        Evaluation {
            new_status: status,
            previous_status: previous,
            transitioned: true,
        }
    }

    /// Decide whether `eval` becomes an alert, recording alert timing if so.
    pub async fn transition_event(
        &self,
        name: &str,
        eval: &Evaluation,
        cooldown: Duration,
        now: DateTime<Utc>,
    ) -> Option<TransitionEvent> {
        if !eval.transitioned {
            return None;
        }

        let mut alerts = self.alerts.write().await;
        let timing = alerts.entry(name.to_string()).or_default();
        match timing.decide(eval, cooldown, now) {
            AlertDecision::Deliver => Some(TransitionEvent::new(
                name,
                eval.previous_status.clone(),
                eval.new_status.clone(),
                now,
            )),
            AlertDecision::Suppressed => {
                debug!(
                    target_name = %name,
                    to = %eval.new_status,
                    cooldown_secs = cooldown.as_secs(),
                    "Alert suppressed by cooldown"
                );
                None
            }
            AlertDecision::Baseline | AlertDecision::Unchanged => None,
        }
    }
}
