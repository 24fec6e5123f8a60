use std::fmt;

use serde::{Deserialize, Serialize};

/// Longest description kept for [`StatusValue::OtherError`], in characters.
pub const OTHER_ERROR_MAX_CHARS: usize = 20;

/// Classified outcome of the most recent probe of a target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum StatusValue {
    #[default]
    Unknown,
    Online,
    Timeout,
    ConnectionFailed,
    HttpError(u16),
    OtherError(String),
}

impl StatusValue {
    /// Build an `OtherError`, truncating the description to [`OTHER_ERROR_MAX_CHARS`].
    pub fn other(description: impl AsRef<str>) -> Self {
        Self::OtherError(
            description
                .as_ref()
                .chars()
                .take(OTHER_ERROR_MAX_CHARS)
                .collect(),
        )
    }

    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Anything observed that is not `Online`.
    pub fn is_problem(&self) -> bool {
        !matches!(self, Self::Online | Self::Unknown)
    }

    pub fn tone(&self) -> StatusTone {
        match self {
            Self::Online => StatusTone::Up,
            Self::Timeout | Self::ConnectionFailed => StatusTone::Down,
            Self::Unknown | Self::HttpError(_) | Self::OtherError(_) => StatusTone::Uncertain,
        }
    }
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Online => write!(f, "online"),
            Self::Timeout => write!(f, "timeout"),
            Self::ConnectionFailed => write!(f, "connection failed"),
            Self::HttpError(code) => write!(f, "HTTP {}", code),
            Self::OtherError(msg) => write!(f, "error: {}", msg),
        }
    }
}

/// Coarse display grouping for presentation layers.
///
/// Unreachable endpoints are `Down`; endpoints that answered with something
/// other than 200, or failed in an unexpected way, are `Uncertain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTone {
    Up,
    Down,
    Uncertain,
}
