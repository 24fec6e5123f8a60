pub mod engine;
pub mod event;
pub mod state;
pub mod status;
pub mod tracker;

pub use engine::Monitor;
pub use event::{EventRing, TransitionEvent, TransitionKind};
pub use state::{SchedulerState, StatusSummary, SweepReport, SweepTrigger, TargetView};
pub use status::{StatusTone, StatusValue, OTHER_ERROR_MAX_CHARS};
pub use tracker::{AlertDecision, AlertTiming, Evaluation, StateTracker};
