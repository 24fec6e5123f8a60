use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::{StatusTone, StatusValue};
use crate::config::Target;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Stopped,
    Running,
}

impl SchedulerState {
    pub fn can_transition_to(self, target: SchedulerState) -> bool {
        matches!(
            (self, target),
            (SchedulerState::Stopped, SchedulerState::Running)
                | (SchedulerState::Running, SchedulerState::Stopped)
        )
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Running => write!(f, "running"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepTrigger {
    Interval,
    Manual,
}

impl fmt::Display for SweepTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interval => write!(f, "interval"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// Tally of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub probed: usize,
    pub transitions: usize,
    pub alerts: usize,
    pub failed: usize,
}

/// Headline counts over monitored targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub online: usize,
    pub monitored: usize,
    pub problems: usize,
}

impl StatusSummary {
    pub fn from_targets(targets: &[Target]) -> Self {
        let monitored = targets.iter().filter(|t| t.monitor_enabled);
        let mut summary = Self::default();
        for t in monitored {
            summary.monitored += 1;
            if t.status.is_online() {
                summary.online += 1;
            } else if t.status.is_problem() {
                summary.problems += 1;
            }
        }
        summary
    }

    pub fn headline(&self) -> String {
        if self.problems > 0 {
            format!(
                "Problems: {} | Online: {}/{}",
                self.problems, self.online, self.monitored
            )
        } else {
            format!("Online: {}/{}", self.online, self.monitored)
        }
    }
}

/// Per-target view for presentation layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetView {
    pub name: String,
    pub url: String,
    pub monitor_enabled: bool,
    pub status: StatusValue,
    pub display: String,
    pub tone: StatusTone,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_alert: Option<DateTime<Utc>>,
}

impl TargetView {
    pub fn new(target: &Target, last_alert: Option<DateTime<Utc>>) -> Self {
        Self {
            name: target.name.clone(),
            url: target.url.clone(),
            monitor_enabled: target.monitor_enabled,
            status: target.status.clone(),
            display: target.status.to_string(),
            tone: target.status.tone(),
            last_alert,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_state_transitions() {
        assert!(SchedulerState::Stopped.can_transition_to(SchedulerState::Running));
        assert!(SchedulerState::Running.can_transition_to(SchedulerState::Stopped));
    }

    #[test]
    fn invalid_state_transitions() {
        assert!(!SchedulerState::Running.can_transition_to(SchedulerState::Running));
        assert!(!SchedulerState::Stopped.can_transition_to(SchedulerState::Stopped));
    }

    fn with_status(name: &str, enabled: bool, status: StatusValue) -> Target {
        let mut t = Target::new(name, format!("https://{}.example", name)).with_monitor(enabled);
        t.status = status;
        t
    }

    #[test]
    fn summary_counts_only_monitored_targets() {
        let targets = vec![
            with_status("a", true, StatusValue::Online),
            with_status("b", true, StatusValue::Timeout),
            with_status("c", true, StatusValue::Unknown),
            with_status("d", false, StatusValue::HttpError(500)),
            with_status("e", false, StatusValue::Online),
        ];
        let s = StatusSummary::from_targets(&targets);
        assert_eq!(
            s,
            StatusSummary {
                online: 1,
                monitored: 3,
                problems: 1
            }
        );
        assert_eq!(s.headline(), "Problems: 1 | Online: 1/3");
    }

    #[test]
    fn headline_without_problems() {
        let s = StatusSummary {
            online: 2,
            monitored: 2,
            problems: 0,
        };
        assert_eq!(s.headline(), "Online: 2/2");
    }

    #[test]
    fn view_carries_display_and_tone() {
        let t = with_status("a", true, StatusValue::HttpError(404));
        let v = TargetView::new(&t, None);
        assert_eq!(v.display, "HTTP 404");
        assert_eq!(v.tone, StatusTone::Uncertain);
        assert!(v.monitor_enabled);
    }
}
