mod http;

pub use http::{classify_error, classify_status, HttpProber};

use async_trait::async_trait;

use crate::config::Target;
use crate::monitor::status::StatusValue;

/// Executes one reachability check against a target.
///
/// Implementations never fail: every outcome, including transport faults,
/// is folded into a [`StatusValue`]. There are no retries inside a check;
/// the scheduler's interval is the retry cadence.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn check(&self, target: &Target) -> StatusValue;
}
