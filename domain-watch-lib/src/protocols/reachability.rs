//! Reachability probing over HTTPS with HTTP fallback.
//!
//! A domain counts as "alive" when a bodiless existence-check request over
//! some transport completes without a network-level failure. The response
//! status is deliberately ignored: the dashboard this mirrors could only see
//! opaque cross-origin responses, so completion is the whole signal. Treat
//! it as a coarse approximation, not a verified HTTP status check.

use crate::error::DomainWatchError;
use crate::types::{DomainName, ReachabilityResult, Transport};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Determines whether a domain responds to network probes.
///
/// Implementations never fail outward: every failure becomes a dead result.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn probe(&self, domain: &DomainName) -> ReachabilityResult;
}

/// One existence-check request over one transport.
#[async_trait]
pub trait ExistenceCheck: Send + Sync {
    async fn check(&self, domain: &DomainName, transport: Transport)
        -> Result<(), DomainWatchError>;
}

/// `HEAD` request through reqwest. Any HTTP response counts as success.
#[derive(Clone)]
pub struct ReqwestExistenceCheck {
    http_client: reqwest::Client,
}

impl ReqwestExistenceCheck {
    pub fn new() -> Result<Self, DomainWatchError> {
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| {
                DomainWatchError::network_with_source(
                    "Failed to create probe HTTP client",
                    e.to_string(),
                )
            })?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl ExistenceCheck for ReqwestExistenceCheck {
    async fn check(
        &self,
        domain: &DomainName,
        transport: Transport,
    ) -> Result<(), DomainWatchError> {
        let scheme = transport.scheme().ok_or_else(|| {
            DomainWatchError::probe(domain.as_str(), transport, "no scheme for transport")
        })?;
        let url = format!("{}://{}/", scheme, domain);

        let response = self
            .http_client
            .head(&url)
            .send()
            .await
            .map_err(|e| DomainWatchError::probe(domain.as_str(), transport, e.to_string()))?;

        debug!(%url, status = %response.status(), "existence check completed");
        Ok(())
    }
}

/// Probe that walks [`Transport::PROBE_ORDER`] until one attempt completes.
///
/// Each attempt gets its own `timeout`. When an attempt finishes or times
/// out its future is dropped, which cancels the request and its timer.
/// Worst-case duration is therefore `timeout` per transport.
pub struct HttpReachabilityProbe<C = ReqwestExistenceCheck> {
    check: C,
    timeout: Duration,
}

impl HttpReachabilityProbe<ReqwestExistenceCheck> {
    /// Create a probe backed by real HTTP requests.
    pub fn new(timeout: Duration) -> Result<Self, DomainWatchError> {
        Ok(Self::with_check(ReqwestExistenceCheck::new()?, timeout))
    }
}

impl<C: ExistenceCheck> HttpReachabilityProbe<C> {
    /// Create a probe with a custom existence check.
    pub fn with_check(check: C, timeout: Duration) -> Self {
        Self { check, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl<C: ExistenceCheck> ReachabilityProbe for HttpReachabilityProbe<C> {
    #[instrument(skip(self), fields(domain = %domain))]
    async fn probe(&self, domain: &DomainName) -> ReachabilityResult {
        for transport in Transport::PROBE_ORDER {
            match tokio::time::timeout(self.timeout, self.check.check(domain, transport)).await {
                Ok(Ok(())) => {
                    debug!(%transport, "domain is alive");
                    return ReachabilityResult::alive_via(transport);
                }
                Ok(Err(e)) => {
                    debug!(%transport, error = %e, "transport attempt failed");
                }
                Err(_) => {
                    debug!(%transport, timeout = ?self.timeout, "transport attempt timed out");
                }
            }
        }

        ReachabilityResult::dead()
    }
}
