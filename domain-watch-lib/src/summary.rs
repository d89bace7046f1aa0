//! External workflow status summary.
//!
//! A scheduled job may publish a small `status-summary.json` report
//! (`{"lastUpdate": "<ISO-8601>"}`). The dashboard reads it once at startup
//! and caches the timestamp in persisted state so it survives restarts even
//! when the report is later unreachable.

use crate::error::DomainWatchError;
use crate::storage::{StateStore, WORKFLOW_UPDATE_KEY};
use crate::utils::human_timestamp;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Wire shape of the report; other fields are ignored.
#[derive(Debug, Deserialize)]
struct WorkflowSummary {
    #[serde(rename = "lastUpdate")]
    last_update: String,
}

/// Loads the workflow report and caches its timestamp.
pub struct SummaryFetcher {
    http_client: reqwest::Client,
    state: Arc<dyn StateStore>,
}

impl SummaryFetcher {
    pub fn new(state: Arc<dyn StateStore>) -> Result<Self, DomainWatchError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                DomainWatchError::network_with_source(
                    "Failed to create summary HTTP client",
                    e.to_string(),
                )
            })?;

        Ok(Self { http_client, state })
    }

    /// Fetch the report from `source` (URL or local path) and cache it.
    ///
    /// Returns the cached human-readable timestamp. Any failure is logged at
    /// debug level and leaves the previously cached value in place.
    pub async fn refresh(&self, source: &str) -> Option<String> {
        match self.fetch(source).await {
            Ok(updated) => {
                let text = human_timestamp(&updated);
                match self.state.set(WORKFLOW_UPDATE_KEY, &text) {
                    Ok(()) => Some(text),
                    Err(e) => {
                        debug!(error = %e, "could not cache workflow timestamp");
                        self.cached()
                    }
                }
            }
            Err(e) => {
                debug!(%source, error = %e, "workflow summary unavailable");
                self.cached()
            }
        }
    }

    /// The cached timestamp, if any.
    pub fn cached(&self) -> Option<String> {
        self.state.get(WORKFLOW_UPDATE_KEY).ok().flatten()
    }

    async fn fetch(&self, source: &str) -> Result<DateTime<Utc>, DomainWatchError> {
        let body = if source.starts_with("http://") || source.starts_with("https://") {
            let response = self.http_client.get(source).send().await?;
            if !response.status().is_success() {
                return Err(DomainWatchError::network(format!(
                    "summary request returned {}",
                    response.status()
                )));
            }
            response.text().await?
        } else {
            tokio::fs::read_to_string(source).await.map_err(|e| {
                DomainWatchError::storage(source, format!("Failed to read summary: {}", e))
            })?
        };

        parse_summary(&body)
    }
}

/// Extract the `lastUpdate` timestamp from a report body.
///
/// Accepts RFC 3339 and zone-less ISO-8601 (treated as UTC), down to a
/// bare date or a time without seconds.
pub fn parse_summary(body: &str) -> Result<DateTime<Utc>, DomainWatchError> {
    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

    let summary: WorkflowSummary = serde_json::from_str(body)?;
    let raw = summary.last_update.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|e| DomainWatchError::config(format!("Invalid lastUpdate '{}': {}", raw, e)))
}

/// Record "now" as the latest workflow update (the `--workflow` trigger).
pub fn mark_workflow_update_now(
    state: &dyn StateStore,
    now: DateTime<Utc>,
) -> Result<String, DomainWatchError> {
    let text = human_timestamp(&now);
    state.set(WORKFLOW_UPDATE_KEY, &text)?;
    Ok(text)
}
