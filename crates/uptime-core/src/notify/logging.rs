use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use super::{DeliveryError, FeedbackSink, Notification, NotificationSink};

/// Writes notifications to the tracing log. The default sink when no
/// desktop or webhook delivery is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        let target_name = notification
            .context
            .as_ref()
            .map(|c| c.target_name.as_str())
            .unwrap_or("-");
        info!(
            kind = %notification.kind,
            app_name = %notification.app_name,
            target_name,
            timeout_secs = notification.timeout_seconds,
            message = %notification.message.replace('\n', ": "),
            "{}",
            notification.title
        );
        Ok(())
    }
}

/// Stand-in for a vibration motor: records the pulse in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFeedback;

#[async_trait]
impl FeedbackSink for LogFeedback {
    async fn pulse(&self, duration: Duration) -> Result<(), DeliveryError> {
        info!(duration_ms = duration.as_millis() as u64, "Feedback pulse");
        Ok(())
    }
}
