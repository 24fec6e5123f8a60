use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::{oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{MonitorOptions, Target};
use crate::control::{ControlError, SharedConfig};
use crate::monitor::event::{EventRing, TransitionEvent};
use crate::monitor::state::*;
use crate::monitor::tracker::{Evaluation, StateTracker};
use crate::prober::Prober;

/// Periodic sweeper over the enabled targets of a [`SharedConfig`].
///
/// One background task runs while the monitor is `Running`; manual
/// refreshes run beside it without touching its timer. Emitted transitions
/// are kept in a bounded ring and, when a channel is attached, forwarded to
/// the notification dispatcher.
pub struct Monitor {
    sweeper: Sweeper,
    state: Arc<RwLock<SchedulerState>>,
    stop_tx: Mutex<Option<oneshot::Sender<()>>>,
    created_at: DateTime<Utc>,
}

/// Everything a sweep needs, cheap to clone into the worker task.
#[derive(Clone)]
struct Sweeper {
    config: SharedConfig,
    tracker: Arc<StateTracker>,
    options: MonitorOptions,
    last_sweep: Arc<RwLock<Option<DateTime<Utc>>>>,
    events: Arc<RwLock<EventRing>>,
    transitions_total: Arc<AtomicU64>,
    event_tx: Option<UnboundedSender<TransitionEvent>>,
    /// Held for a whole sweep so interval and manual sweeps never interleave.
    sweep_lock: Arc<Mutex<()>>,
}

impl Monitor {
    pub fn new(
        config: SharedConfig,
        prober: Arc<dyn Prober>,
        options: MonitorOptions,
        event_tx: Option<UnboundedSender<TransitionEvent>>,
    ) -> Self {
        let events = EventRing::new(options.event_limit);
        Self {
            sweeper: Sweeper {
                config,
                tracker: Arc::new(StateTracker::new(prober)),
                options,
                last_sweep: Arc::new(RwLock::new(None)),
                events: Arc::new(RwLock::new(events)),
                transitions_total: Arc::new(AtomicU64::new(0)),
                event_tx,
                sweep_lock: Arc::new(Mutex::new(())),
            },
            state: Arc::new(RwLock::new(SchedulerState::Stopped)),
            stop_tx: Mutex::new(None),
            created_at: Utc::now(),
        }
    }

    pub fn config(&self) -> &SharedConfig {
        &self.sweeper.config
    }

    pub fn options(&self) -> &MonitorOptions {
        &self.sweeper.options
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub async fn state(&self) -> SchedulerState {
        *self.state.read().await
    }

    pub async fn last_sweep(&self) -> Option<DateTime<Utc>> {
        *self.sweeper.last_sweep.read().await
    }

    /// Alerts emitted since startup.
    pub fn transitions_total(&self) -> u64 {
        self.sweeper.transitions_total.load(Ordering::Relaxed)
    }

    /// Start the interval loop. Returns false if it was already running.
    pub async fn start(&self) -> bool {
        let mut state = self.state.write().await;
        if !state.can_transition_to(SchedulerState::Running) {
            return false;
        }
        *state = SchedulerState::Running;

        let (tx, mut rx) = oneshot::channel();
        *self.stop_tx.lock().await = Some(tx);
        drop(state);

        let sweeper = self.sweeper.clone();
        let interval_secs = sweeper.config.check_interval().await.as_secs();
        info!(interval_secs, "Starting scheduler");

        tokio::spawn(async move {
            loop {
                sweeper.sweep(SweepTrigger::Interval).await;

                // Re-read every round so interval changes apply on the next tick.
                let interval = sweeper.config.check_interval().await;
                tokio::select! {
                    _ = &mut rx => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            info!("Scheduler stopped");
        });

        true
    }

    /// Stop scheduling new sweeps. An in-flight sweep is allowed to finish.
    pub async fn stop(&self) -> bool {
        let mut state = self.state.write().await;
        if !state.can_transition_to(SchedulerState::Stopped) {
            return false;
        }
        *state = SchedulerState::Stopped;
        if let Some(tx) = self.stop_tx.lock().await.take() {
            let _ = tx.send(());
        }
        info!("Stopping scheduler");
        true
    }

    /// Run one manual sweep and wait for it.
    pub async fn sweep_once(&self) -> SweepReport {
        self.sweeper.sweep(SweepTrigger::Manual).await
    }

    /// Kick off a manual sweep in the background. The interval clock is not
    /// reset.
    pub fn refresh_now(&self) -> JoinHandle<SweepReport> {
        let sweeper = self.sweeper.clone();
        tokio::spawn(async move { sweeper.sweep(SweepTrigger::Manual).await })
    }

    pub async fn summary(&self) -> StatusSummary {
        StatusSummary::from_targets(&self.sweeper.config.targets().await)
    }

    pub async fn targets(&self) -> Vec<TargetView> {
        let targets = self.sweeper.config.targets().await;
        let mut views = Vec::with_capacity(targets.len());
        for t in &targets {
            let last_alert = self.sweeper.tracker.last_alert_time(&t.name).await;
            views.push(TargetView::new(t, last_alert));
        }
        views
    }

    pub async fn target(&self, name: &str) -> Option<TargetView> {
        let target = self.sweeper.config.snapshot().await.target(name).cloned()?;
        let last_alert = self.sweeper.tracker.last_alert_time(name).await;
        Some(TargetView::new(&target, last_alert))
    }

    /// Recent transitions, newest first.
    pub async fn events(&self) -> Vec<TransitionEvent> {
        self.sweeper.events.read().await.list()
    }

    pub async fn set_target_enabled(&self, name: &str, enabled: bool) -> Result<(), ControlError> {
        self.sweeper.config.set_target_enabled(name, enabled).await
    }

    pub async fn set_all_enabled(&self, enabled: bool) -> usize {
        self.sweeper.config.set_all_enabled(enabled).await
    }

    pub async fn add_target(&self, target: Target) -> Result<(), ControlError> {
        let name = target.name.clone();
        self.sweeper.config.add_target(target).await?;
        // Leftovers from an earlier target with the same name must not leak in.
        self.sweeper.tracker.forget(&name).await;
        self.sweeper.tracker.seed([name.as_str()]).await;
        Ok(())
    }

    pub async fn remove_target(&self, name: &str) -> Result<Target, ControlError> {
        let removed = self.sweeper.config.remove_target(name).await?;
        self.sweeper.tracker.forget(name).await;
        self.sweeper
            .events
            .write()
            .await
            .retain_targets(|n| n != name);
        Ok(removed)
    }
}

impl Sweeper {
    async fn sweep(&self, trigger: SweepTrigger) -> SweepReport {
        let _running = self.sweep_lock.lock().await;
        let targets = self.config.enabled_targets().await;
        let cooldown = self.config.alert_cooldown().await;
        *self.last_sweep.write().await = Some(Utc::now());
        debug!(%trigger, targets = targets.len(), "Sweep started");

        let mut report = SweepReport::default();
        let mut results = stream::iter(targets)
            .map(|target| {
                let tracker = Arc::clone(&self.tracker);
                async move {
                    let name = target.name.clone();
                    // A panicking probe is confined to its own task.
                    let outcome = tokio::spawn(async move { tracker.evaluate(&target).await }).await;
                    (name, outcome)
                }
            })
            .buffered(self.options.max_concurrent_probes);

        while let Some((name, outcome)) = results.next().await {
            report.probed += 1;
            match outcome {
                Ok(eval) => self.apply(&name, eval, cooldown, &mut report).await,
                Err(e) => {
                    report.failed += 1;
                    error!(target_name = %name, error = %e, "Target evaluation failed");
                }
            }
        }

        debug!(
            %trigger,
            probed = report.probed,
            transitions = report.transitions,
            alerts = report.alerts,
            failed = report.failed,
            "Sweep finished"
        );
        report
    }

    async fn apply(
        &self,
        name: &str,
        eval: Evaluation,
        cooldown: std::time::Duration,
        report: &mut SweepReport,
    ) {
        if !self.config.record_status(name, eval.new_status.clone()).await {
            // Removed while the probe was in flight.
            self.tracker.forget(name).await;
            return;
        }
        if !eval.transitioned {
            return;
        }
        report.transitions += 1;

        if !self.config.notification_flags().await.notifications {
            // Shown in the history, but nothing is announced and the
            // cooldown clock is left alone.
            if !eval.previous_status.is_unknown() && !eval.new_status.is_unknown() {
                let event = TransitionEvent::new(
                    name,
                    eval.previous_status.clone(),
                    eval.new_status.clone(),
                    Utc::now(),
                );
                self.events.write().await.push(event);
            }
            debug!(target_name = %name, "Notifications off, transition not announced");
            return;
        }

        let Some(event) = self
            .tracker
            .transition_event(name, &eval, cooldown, Utc::now())
            .await
        else {
            return;
        };

        report.alerts += 1;
        self.transitions_total.fetch_add(1, Ordering::Relaxed);
        self.events.write().await.push(event.clone());
        if let Some(tx) = &self.event_tx {
            if tx.send(event).is_err() {
                warn!(target_name = %name, "Transition channel closed, alert dropped");
            }
        }
    }
}
