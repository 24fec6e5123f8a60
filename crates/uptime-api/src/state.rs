use std::sync::Arc;

use uptime_core::{Monitor, Notifier};

/// Handles shared by every request. Both point at the same
/// `SharedConfig`, so a toggle made here is seen by the scheduler on its
/// next probe.
#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<Monitor>,
    pub notifier: Arc<Notifier>,
}

impl AppState {
    pub fn new(monitor: Arc<Monitor>, notifier: Arc<Notifier>) -> Self {
        Self { monitor, notifier }
    }
}
