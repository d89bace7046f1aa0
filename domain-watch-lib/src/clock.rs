//! Time source used by the estimator latency, timestamps and auto-refresh.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Injectable clock.
///
/// Production code uses [`TokioClock`]; tests run the same clock under
/// tokio's paused time so delays complete instantly and deterministically.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Suspend the caller for `duration`.
    async fn after(&self, duration: Duration);

    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by `tokio::time` and the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn after(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
