//! Domain status pipeline.
//!
//! This module runs the per-domain checks: reachability probe and
//! availability estimate side by side, fanned out across every tracked
//! domain, with each domain's state reported to a [`StatusSink`] as soon as
//! it changes.

use crate::clock::{Clock, TokioClock};
use crate::error::DomainWatchError;
use crate::protocols::{
    AvailabilityEstimator, HeuristicEstimator, HttpReachabilityProbe, ReachabilityProbe,
};
use crate::types::{CheckOutcome, CheckState, DomainCheckResult, DomainName, WatchConfig};
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// Receives per-domain state changes while checks run.
///
/// For any one domain, `Checking` is always delivered before the terminal
/// state of that check. Across domains updates arrive in completion order.
pub trait StatusSink: Send + Sync {
    fn update(&self, domain: &DomainName, state: &CheckState);
}

/// Sink that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl StatusSink for NullSink {
    fn update(&self, _domain: &DomainName, _state: &CheckState) {}
}

/// Aggregate result of [`DomainStatusPipeline::check_all`].
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// One terminal outcome per requested domain, in completion order
    pub outcomes: Vec<CheckOutcome>,

    /// Wall time of the whole batch
    pub duration: Duration,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn resolved(&self) -> impl Iterator<Item = &DomainCheckResult> {
        self.outcomes.iter().filter_map(CheckOutcome::result)
    }

    pub fn errored_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_resolved()).count()
    }

    pub fn available_count(&self) -> usize {
        self.resolved().filter(|r| r.availability.available).count()
    }

    pub fn alive_count(&self) -> usize {
        self.resolved().filter(|r| r.reachability.alive()).count()
    }

    pub fn outcome_for(&self, domain: &DomainName) -> Option<&CheckOutcome> {
        self.outcomes.iter().find(|o| o.domain() == domain)
    }
}

/// Orchestrates reachability and availability checks.
pub struct DomainStatusPipeline {
    probe: Arc<dyn ReachabilityProbe>,
    estimator: Arc<dyn AvailabilityEstimator>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn StatusSink>,
}

impl DomainStatusPipeline {
    pub fn new(
        probe: Arc<dyn ReachabilityProbe>,
        estimator: Arc<dyn AvailabilityEstimator>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            probe,
            estimator,
            clock,
            sink,
        }
    }

    /// Production wiring: HTTP probe, heuristic estimator, tokio clock.
    pub fn from_config(
        config: &WatchConfig,
        sink: Arc<dyn StatusSink>,
    ) -> Result<Self, DomainWatchError> {
        let clock: Arc<dyn Clock> = Arc::new(TokioClock);
        let probe = HttpReachabilityProbe::new(config.probe_timeout)?;
        let estimator = HeuristicEstimator::new(config, clock.clone());

        Ok(Self::new(
            Arc::new(probe),
            Arc::new(estimator),
            clock,
            sink,
        ))
    }

    /// Replace the sink (the controller interposes its own state board).
    pub fn with_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Check a single domain.
    ///
    /// Emits `Checking`, runs probe and estimator concurrently, then emits
    /// and returns the terminal outcome. An estimator error or a panic in
    /// either collaborator becomes `Errored` for this domain only.
    #[instrument(skip(self), fields(domain = %domain))]
    pub async fn check_one(&self, domain: &DomainName) -> CheckOutcome {
        self.sink.update(domain, &CheckState::Checking);

        let checks = async {
            tokio::join!(self.probe.probe(domain), self.estimator.estimate(domain))
        };

        let outcome = match AssertUnwindSafe(checks).catch_unwind().await {
            Ok((reachability, Ok(availability))) => CheckOutcome::Resolved(DomainCheckResult {
                domain: domain.clone(),
                reachability,
                availability,
                checked_at: self.clock.now(),
            }),
            Ok((_, Err(e))) => {
                warn!(error = %e, "availability estimate failed");
                errored(domain, e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(%message, "domain check panicked");
                errored(domain, message)
            }
        };

        self.sink.update(domain, &outcome.to_state());
        outcome
    }

    /// Check every domain concurrently and wait for all of them.
    ///
    /// A slow or failing domain never holds back the others' updates; the
    /// report is returned once the slowest check has finished.
    pub async fn check_all(&self, domains: &[DomainName]) -> BatchReport {
        let start = Instant::now();

        let mut pending: FuturesUnordered<_> =
            domains.iter().map(|domain| self.check_one(domain)).collect();

        let mut outcomes = Vec::with_capacity(domains.len());
        while let Some(outcome) = pending.next().await {
            outcomes.push(outcome);
        }

        let report = BatchReport {
            outcomes,
            duration: start.elapsed(),
        };

        info!(
            total = report.len(),
            errored = report.errored_count(),
            alive = report.alive_count(),
            available = report.available_count(),
            duration_ms = report.duration.as_millis() as u64,
            "batch check finished"
        );
        report
    }
}

fn errored(domain: &DomainName, message: String) -> CheckOutcome {
    CheckOutcome::Errored {
        domain: domain.clone(),
        message: DomainWatchError::pipeline(domain.as_str(), message).to_string(),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unexpected fault".to_string()
    }
}
