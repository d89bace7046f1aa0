//! Heuristic availability estimation.
//!
//! There is no registry lookup here. The estimator matches the domain's
//! primary label against a list of well-known tokens and otherwise flips a
//! biased coin, after a simulated lookup delay. Results are always tagged
//! [`Confidence::Heuristic`](crate::types::Confidence::Heuristic). A real
//! registry client can replace it by implementing [`AvailabilityEstimator`].

use crate::clock::Clock;
use crate::error::DomainWatchError;
use crate::types::{AvailabilityResult, DomainName, WatchConfig};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Registrar label for domains matching a known token.
pub const KNOWN_REGISTRAR: &str = "Known Domain";

/// Registrar label for everything else.
pub const UNKNOWN_REGISTRAR: &str = "Unknown";

/// Draws above this value count as "available" (about 40% of draws).
const AVAILABLE_THRESHOLD: f64 = 0.6;

/// Produces a registration-status estimate for one domain.
#[async_trait]
pub trait AvailabilityEstimator: Send + Sync {
    async fn estimate(&self, domain: &DomainName) -> Result<AvailabilityResult, DomainWatchError>;
}

/// Source of uniform values in `[0, 1)`.
pub trait RandomSource: Send + Sync {
    fn next_f64(&self) -> f64;
}

/// Thread-local RNG from the `rand` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::random::<f64>()
    }
}

/// Known-token match plus a biased random draw.
pub struct HeuristicEstimator {
    known_tokens: Vec<String>,
    min_latency: Duration,
    max_latency: Duration,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
}

impl HeuristicEstimator {
    /// Build from config, drawing randomness from [`ThreadRandom`].
    pub fn new(config: &WatchConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            known_tokens: config
                .known_domains
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            min_latency: config.min_latency,
            max_latency: config.max_latency,
            clock,
            random: Arc::new(ThreadRandom),
        }
    }

    /// Swap the random source (deterministic sequences in tests).
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    /// Whether the primary label contains one of the known tokens.
    pub fn is_known(&self, domain: &DomainName) -> bool {
        let label = domain.primary_label();
        self.known_tokens.iter().any(|token| label.contains(token.as_str()))
    }

    fn draw(&self) -> f64 {
        self.random.next_f64().clamp(0.0, 1.0)
    }

    /// Simulated lookup delay in `[min_latency, max_latency)`.
    fn latency(&self) -> Duration {
        let spread = self.max_latency.saturating_sub(self.min_latency);
        self.min_latency + spread.mul_f64(self.draw())
    }
}

#[async_trait]
impl AvailabilityEstimator for HeuristicEstimator {
    async fn estimate(&self, domain: &DomainName) -> Result<AvailabilityResult, DomainWatchError> {
        let delay = self.latency();
        self.clock.after(delay).await;

        let result = if self.is_known(domain) {
            AvailabilityResult::heuristic(false, KNOWN_REGISTRAR)
        } else {
            AvailabilityResult::heuristic(self.draw() > AVAILABLE_THRESHOLD, UNKNOWN_REGISTRAR)
        };

        debug!(
            domain = %domain,
            available = result.available,
            registrar = %result.registrar,
            delay_ms = delay.as_millis() as u64,
            "heuristic availability estimate"
        );
        Ok(result)
    }
}
