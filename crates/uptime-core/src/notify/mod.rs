//! Rendering and delivery of transition notifications.
//!
//! The [`Notifier`] turns a status transition into a [`Notification`] and
//! hands it to every configured [`NotificationSink`], optionally followed by
//! a feedback pulse. Delivery never fails outward: sink errors are logged
//! and counted, monitoring carries on.

mod dispatcher;
mod logging;
mod webhook;

pub use dispatcher::{transition_channel, NotificationDispatcher};
pub use logging::{LogFeedback, LogSink};
pub use webhook::{WebhookConfig, WebhookPayload, WebhookSink};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::control::SharedConfig;
use crate::monitor::event::{TransitionEvent, TransitionKind};
use crate::monitor::status::StatusValue;

pub const DEFAULT_APP_NAME: &str = "Server Monitor";

const TRANSITION_TIMEOUT_SECS: u32 = 10;
const TEST_TIMEOUT_SECS: u32 = 5;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },
    #[error("{url} rejected the notification with HTTP {status}")]
    Rejected { url: String, status: u16 },
    #[error("Request to {url} failed: {message}")]
    Network { url: String, message: String },
    #[error("Failed to serialize notification: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Recovery,
    Problem,
    Test,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recovery => "recovery",
            Self::Problem => "problem",
            Self::Test => "test",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Recovery => "Server Recovered",
            Self::Problem => "Server Problem",
            Self::Test => "Test Notification",
        }
    }

    /// Length of the feedback pulse: short for good news, long for bad.
    pub fn pulse(&self) -> Duration {
        match self {
            Self::Problem => Duration::from_millis(500),
            Self::Recovery | Self::Test => Duration::from_millis(200),
        }
    }
}

impl From<TransitionKind> for NotificationKind {
    fn from(kind: TransitionKind) -> Self {
        match kind {
            TransitionKind::Recovery => Self::Recovery,
            TransitionKind::Problem => Self::Problem,
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The transition a notification was rendered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionContext {
    pub target_name: String,
    pub previous_status: StatusValue,
    pub new_status: StatusValue,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub app_name: String,
    pub timeout_seconds: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<TransitionContext>,
}

/// Delivery target for rendered notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &str;
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError>;
}

/// Physical feedback such as a vibration motor.
#[async_trait]
pub trait FeedbackSink: Send + Sync {
    async fn pulse(&self, duration: Duration) -> Result<(), DeliveryError>;
}

/// Per-call delivery tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliverySummary {
    pub delivered: usize,
    pub failed: usize,
    pub pulsed: bool,
}

pub struct Notifier {
    config: SharedConfig,
    sinks: Vec<Arc<dyn NotificationSink>>,
    feedback: Option<Arc<dyn FeedbackSink>>,
    app_name: String,
}

impl Notifier {
    pub fn new(config: SharedConfig) -> Self {
        Self {
            config,
            sinks: Vec::new(),
            feedback: None,
            app_name: DEFAULT_APP_NAME.to_string(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_feedback(mut self, feedback: Arc<dyn FeedbackSink>) -> Self {
        self.feedback = Some(feedback);
        self
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn sink_names(&self) -> Vec<String> {
        self.sinks.iter().map(|s| s.name().to_string()).collect()
    }

    /// Build the notification for a transition. `None` when the new status
    /// is `Unknown`, which is never announced.
    pub fn render(
        &self,
        target_name: &str,
        previous: &StatusValue,
        new: &StatusValue,
        timestamp: DateTime<Utc>,
    ) -> Option<Notification> {
        let kind = NotificationKind::from(TransitionKind::of(new)?);
        Some(Notification {
            kind,
            title: kind.title().to_string(),
            message: format!("{}\n{} → {}", target_name, previous, new),
            app_name: self.app_name.clone(),
            timeout_seconds: TRANSITION_TIMEOUT_SECS,
            context: Some(TransitionContext {
                target_name: target_name.to_string(),
                previous_status: previous.clone(),
                new_status: new.clone(),
                timestamp,
            }),
        })
    }

    /// Announce a transition. Returns `None` when notifications are off or
    /// the transition is not announceable.
    pub async fn notify(
        &self,
        target_name: &str,
        previous: &StatusValue,
        new: &StatusValue,
    ) -> Option<DeliverySummary> {
        self.announce(target_name, previous, new, Utc::now()).await
    }

    pub async fn notify_event(&self, event: &TransitionEvent) -> Option<DeliverySummary> {
        self.announce(
            &event.target_name,
            &event.previous_status,
            &event.new_status,
            event.timestamp,
        )
        .await
    }

    async fn announce(
        &self,
        target_name: &str,
        previous: &StatusValue,
        new: &StatusValue,
        timestamp: DateTime<Utc>,
    ) -> Option<DeliverySummary> {
        let flags = self.config.notification_flags().await;
        if !flags.notifications {
            debug!(target_name = %target_name, to = %new, "Notifications disabled, skipping");
            return None;
        }
        let notification = self.render(target_name, previous, new, timestamp)?;
        Some(self.dispatch(&notification, flags.vibration).await)
    }

    /// Send the fixed test notification. Not gated by the notification
    /// switch; the pulse still follows the vibration switch.
    pub async fn send_test(&self) -> DeliverySummary {
        let kind = NotificationKind::Test;
        let notification = Notification {
            kind,
            title: kind.title().to_string(),
            message: "Server monitor is up and running!".to_string(),
            app_name: self.app_name.clone(),
            timeout_seconds: TEST_TIMEOUT_SECS,
            context: None,
        };
        let vibration = self.config.notification_flags().await.vibration;
        self.dispatch(&notification, vibration).await
    }

    async fn dispatch(&self, notification: &Notification, vibration: bool) -> DeliverySummary {
        let mut summary = DeliverySummary::default();
        for sink in &self.sinks {
            match sink.deliver(notification).await {
                Ok(()) => summary.delivered += 1,
                Err(e) => {
                    summary.failed += 1;
                    warn!(
                        sink = sink.name(),
                        kind = %notification.kind,
                        error = %e,
                        "Notification delivery failed"
                    );
                }
            }
        }

        if vibration {
            if let Some(feedback) = &self.feedback {
                match feedback.pulse(notification.kind.pulse()).await {
                    Ok(()) => summary.pulsed = true,
                    Err(e) => warn!(error = %e, "Feedback pulse failed"),
                }
            }
        }
        summary
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Sink that remembers everything it was given.
    #[derive(Default)]
    pub struct RecordingSink {
        pub received: Mutex<Vec<Notification>>,
        pub fail: bool,
    }

    impl RecordingSink {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        pub fn titles(&self) -> Vec<String> {
            self.received
                .lock()
                .unwrap()
                .iter()
                .map(|n| n.title.clone())
                .collect()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
            self.received.lock().unwrap().push(notification.clone());
            if self.fail {
                return Err(DeliveryError::Network {
                    url: "memory".into(),
                    message: "refused".into(),
                });
            }
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct RecordingFeedback {
        pub pulses: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl FeedbackSink for RecordingFeedback {
        async fn pulse(&self, duration: Duration) -> Result<(), DeliveryError> {
            self.pulses.lock().unwrap().push(duration);
            Ok(())
        }
    }
}
