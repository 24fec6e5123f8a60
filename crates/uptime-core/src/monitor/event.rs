use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::StatusValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// Anything into `Online`.
    Recovery,
    /// Anything into a non-online, non-unknown status.
    Problem,
}

impl TransitionKind {
    pub fn of(new_status: &StatusValue) -> Option<Self> {
        if new_status.is_online() {
            Some(Self::Recovery)
        } else if new_status.is_problem() {
            Some(Self::Problem)
        } else {
            None
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recovery => write!(f, "RECOVERED"),
            Self::Problem => write!(f, "PROBLEM"),
        }
    }
}

/// A status change worth telling someone about. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub target_name: String,
    pub previous_status: StatusValue,
    pub new_status: StatusValue,
}

impl TransitionEvent {
    pub fn new(
        target_name: impl Into<String>,
        previous_status: StatusValue,
        new_status: StatusValue,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp,
            target_name: target_name.into(),
            previous_status,
            new_status,
        }
    }

    pub fn kind(&self) -> Option<TransitionKind> {
        TransitionKind::of(&self.new_status)
    }
}

/// Fixed-capacity circular buffer for recent transitions. O(1) insert, evicts oldest when full.
#[derive(Debug, Clone)]
pub struct EventRing {
    buffer: VecDeque<TransitionEvent>,
    capacity: usize,
}

impl EventRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: TransitionEvent) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(event);
    }

    /// Newest first.
    pub fn list(&self) -> Vec<TransitionEvent> {
        self.buffer.iter().rev().cloned().collect()
    }

    pub fn retain_targets(&mut self, keep: impl Fn(&str) -> bool) {
        self.buffer.retain(|e| keep(&e.target_name));
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
