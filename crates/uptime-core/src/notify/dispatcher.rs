use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use super::Notifier;
use crate::monitor::event::TransitionEvent;

pub fn transition_channel() -> (
    mpsc::UnboundedSender<TransitionEvent>,
    mpsc::UnboundedReceiver<TransitionEvent>,
) {
    mpsc::unbounded_channel()
}

/// Drains transitions emitted by the scheduler and hands them to the
/// [`Notifier`], so slow sinks never hold up a sweep.
pub struct NotificationDispatcher {
    rx: mpsc::UnboundedReceiver<TransitionEvent>,
    notifier: Arc<Notifier>,
}

impl NotificationDispatcher {
    pub fn new(rx: mpsc::UnboundedReceiver<TransitionEvent>, notifier: Arc<Notifier>) -> Self {
        Self { rx, notifier }
    }

    /// Run until every sender is dropped.
    pub async fn run(mut self) {
        debug!(sinks = ?self.notifier.sink_names(), "Notification dispatcher started");

        while let Some(event) = self.rx.recv().await {
            match self.notifier.notify_event(&event).await {
                Some(summary) => debug!(
                    target_name = %event.target_name,
                    delivered = summary.delivered,
                    failed = summary.failed,
                    "Transition announced"
                ),
                None => debug!(target_name = %event.target_name, "Transition not announced"),
            }
        }

        debug!("Notification dispatcher shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorConfig;
    use crate::control::SharedConfig;
    use crate::monitor::status::StatusValue;
    use crate::notify::testing::RecordingSink;
    use crate::store::MemoryStore;
    use chrono::Utc;
    use std::time::Duration;

    #[tokio::test]
    async fn dispatcher_delivers_and_shuts_down() {
        let config = SharedConfig::new(MonitorConfig::default(), Arc::new(MemoryStore::new()));
        let sink = Arc::new(RecordingSink::default());
        let notifier = Arc::new(Notifier::new(config).with_sink(sink.clone()));
        let (tx, rx) = transition_channel();

        tx.send(TransitionEvent::new(
            "a",
            StatusValue::Online,
            StatusValue::Timeout,
            Utc::now(),
        ))
        .unwrap();
        tx.send(TransitionEvent::new(
            "a",
            StatusValue::Timeout,
            StatusValue::Online,
            Utc::now(),
        ))
        .unwrap();
        drop(tx);

        tokio::time::timeout(
            Duration::from_secs(2),
            NotificationDispatcher::new(rx, notifier).run(),
        )
        .await
        .expect("dispatcher should exit once senders are gone");

        assert_eq!(sink.titles(), vec!["Server Problem", "Server Recovered"]);
    }
}
