#![forbid(unsafe_code)]

pub mod config;
pub mod control;
pub mod monitor;
pub mod notify;
pub mod prober;
pub mod store;

pub use config::{validate_target_url, MonitorConfig, MonitorOptions, Target};
pub use control::{ControlError, NotificationFlags, SettingsUpdate, SharedConfig};
pub use monitor::{
    EventRing, Monitor, SchedulerState, StateTracker, StatusSummary, StatusTone, StatusValue,
    SweepReport, TargetView, TransitionEvent, TransitionKind,
};
pub use notify::{
    transition_channel, DeliveryError, DeliverySummary, FeedbackSink, LogFeedback, LogSink,
    Notification, NotificationDispatcher, NotificationKind, NotificationSink, Notifier,
    WebhookConfig, WebhookSink,
};
pub use prober::{HttpProber, Prober};
pub use store::{ConfigStore, JsonFileStore, MemoryStore, StoreError};
