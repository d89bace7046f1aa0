//! Core data types for domain tracking and status checking.
//!
//! This module defines the validated domain name, the per-check results,
//! the per-domain state machine, rolled-up dashboard statistics and the
//! runtime configuration.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::DomainWatchError;
use crate::utils::normalize_domain;

/// A syntactically valid, lowercase domain name.
///
/// Construct with [`DomainName::parse`]; the inner string is guaranteed to
/// match the `label(.label)*.tld` grammar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DomainName(String);

impl DomainName {
    /// Normalize (trim + lowercase) and validate raw user input.
    pub fn parse(raw: &str) -> Result<Self, DomainWatchError> {
        normalize_domain(raw).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First label of the name ("mail" for "mail.example.com").
    pub fn primary_label(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DomainName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DomainName {
    type Error = DomainWatchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DomainName> for String {
    fn from(name: DomainName) -> Self {
        name.0
    }
}

/// Network protocol variant used by a reachability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transport {
    #[serde(rename = "secure")]
    Secure,
    #[serde(rename = "plain")]
    Plain,
    #[serde(rename = "none")]
    None,
}

impl Transport {
    /// Probe order: secure first, then plain.
    pub const PROBE_ORDER: [Transport; 2] = [Transport::Secure, Transport::Plain];

    /// URL scheme for this transport, `None` for [`Transport::None`].
    pub fn scheme(&self) -> Option<&'static str> {
        match self {
            Transport::Secure => Some("https"),
            Transport::Plain => Some("http"),
            Transport::None => None,
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Secure => write!(f, "HTTPS"),
            Transport::Plain => write!(f, "HTTP"),
            Transport::None => write!(f, "none"),
        }
    }
}

/// Outcome of a reachability probe.
///
/// `alive` is a coarse signal: it only means a request over `transport`
/// completed without a network-level failure. No HTTP status is inspected.
/// `transport` is [`Transport::None`] exactly when `alive` is false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReachabilityResult {
    alive: bool,
    transport: Transport,
}

impl ReachabilityResult {
    /// The domain answered over `transport`.
    pub fn alive_via(transport: Transport) -> Self {
        Self {
            alive: transport != Transport::None,
            transport,
        }
    }

    /// Every transport attempt failed or timed out.
    pub fn dead() -> Self {
        Self {
            alive: false,
            transport: Transport::None,
        }
    }

    pub fn alive(&self) -> bool {
        self.alive
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }
}

/// How much an availability estimate can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    /// Pattern match plus randomness; not backed by any registry data.
    #[serde(rename = "heuristic")]
    Heuristic,
    /// Answer from a real registry lookup.
    #[serde(rename = "authoritative")]
    Authoritative,
}

impl Confidence {
    pub fn label(&self) -> &'static str {
        match self {
            Confidence::Heuristic => "heuristic",
            Confidence::Authoritative => "authoritative",
        }
    }
}

/// Estimate of whether a domain is unregistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityResult {
    /// Whether the domain looks free for registration
    pub available: bool,

    /// Registrar label ("Known Domain" / "Unknown" for the heuristic)
    pub registrar: String,

    /// Always check this before presenting `available` as fact
    pub confidence: Confidence,
}

impl AvailabilityResult {
    pub fn heuristic<R: Into<String>>(available: bool, registrar: R) -> Self {
        Self {
            available,
            registrar: registrar.into(),
            confidence: Confidence::Heuristic,
        }
    }

    pub fn is_authoritative(&self) -> bool {
        self.confidence == Confidence::Authoritative
    }
}

/// Combined result of one domain check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainCheckResult {
    pub domain: DomainName,
    pub reachability: ReachabilityResult,
    pub availability: AvailabilityResult,
    pub checked_at: DateTime<Utc>,
}

/// Per-domain check state.
///
/// `NotChecked → Checking → {Resolved | Errored}`; any new check moves the
/// domain back to `Checking`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CheckState {
    NotChecked,
    Checking,
    Resolved(DomainCheckResult),
    Errored { message: String },
}

impl CheckState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckState::Resolved(_) | CheckState::Errored { .. })
    }

    pub fn result(&self) -> Option<&DomainCheckResult> {
        match self {
            CheckState::Resolved(result) => Some(result),
            _ => None,
        }
    }
}

/// Terminal outcome of a single `check_one` call.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    Resolved(DomainCheckResult),
    Errored { domain: DomainName, message: String },
}

impl CheckOutcome {
    pub fn domain(&self) -> &DomainName {
        match self {
            CheckOutcome::Resolved(result) => &result.domain,
            CheckOutcome::Errored { domain, .. } => domain,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, CheckOutcome::Resolved(_))
    }

    pub fn result(&self) -> Option<&DomainCheckResult> {
        match self {
            CheckOutcome::Resolved(result) => Some(result),
            CheckOutcome::Errored { .. } => None,
        }
    }

    /// The state this outcome leaves the domain in.
    pub fn to_state(&self) -> CheckState {
        match self {
            CheckOutcome::Resolved(result) => CheckState::Resolved(result.clone()),
            CheckOutcome::Errored { message, .. } => CheckState::Errored {
                message: message.clone(),
            },
        }
    }
}

/// Rolled-up dashboard statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    /// Number of tracked domains
    pub total: usize,

    /// Resolved domains the heuristic considers available
    pub available: usize,

    /// Resolved domains that answered a probe
    pub alive: usize,

    /// When the last full refresh finished
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_refreshed: Option<DateTime<Local>>,

    /// Cached timestamp of the external workflow report
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_workflow_update: Option<String>,
}

/// Runtime configuration for the dashboard core.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Independent timeout for each transport attempt
    /// Default: 10 seconds
    pub probe_timeout: Duration,

    /// Period of the automatic full refresh
    /// Default: 5 minutes
    pub refresh_interval: Duration,

    /// Lower bound of the simulated registry lookup latency
    /// Default: 1000 ms
    pub min_latency: Duration,

    /// Upper bound (exclusive) of the simulated lookup latency
    /// Default: 3000 ms
    pub max_latency: Duration,

    /// Tokens that mark a domain as well known (and therefore registered)
    pub known_domains: Vec<String>,

    /// File holding the persisted key-value state
    pub state_file: PathBuf,

    /// Location of the external workflow summary (path or URL)
    pub summary_source: String,
}

/// Tokens matched against a domain's primary label by the heuristic.
pub const DEFAULT_KNOWN_DOMAINS: [&str; 8] = [
    "google",
    "github",
    "stackoverflow",
    "example",
    "microsoft",
    "apple",
    "amazon",
    "facebook",
];

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(10),
            refresh_interval: Duration::from_secs(5 * 60),
            min_latency: Duration::from_millis(1000),
            max_latency: Duration::from_millis(3000),
            known_domains: DEFAULT_KNOWN_DOMAINS.iter().map(|s| s.to_string()).collect(),
            state_file: crate::config::default_state_path(),
            summary_source: "./status-summary.json".to_string(),
        }
    }
}

impl WatchConfig {
    /// Set the per-transport probe timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the automatic refresh period. Clamped to at least one second.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval.max(Duration::from_secs(1));
        self
    }

    /// Set the simulated lookup latency range. An inverted range is swapped.
    pub fn with_latency(mut self, min: Duration, max: Duration) -> Self {
        if min <= max {
            self.min_latency = min;
            self.max_latency = max;
        } else {
            self.min_latency = max;
            self.max_latency = min;
        }
        self
    }

    pub fn with_known_domains(mut self, tokens: Vec<String>) -> Self {
        self.known_domains = tokens;
        self
    }

    pub fn with_state_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.state_file = path.into();
        self
    }

    pub fn with_summary_source<S: Into<String>>(mut self, source: S) -> Self {
        self.summary_source = source.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_name_normalizes() {
        let name = DomainName::parse("  Example.ORG ").unwrap();
        assert_eq!(name.as_str(), "example.org");
        assert_eq!(name.primary_label(), "example");
    }

    #[test]
    fn test_domain_name_serde_validates() {
        let name: DomainName = serde_json::from_str("\"github.com\"").unwrap();
        assert_eq!(name.as_str(), "github.com");
        assert!(serde_json::from_str::<DomainName>("\"not a domain\"").is_err());
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"github.com\"");
    }

    #[test]
    fn test_reachability_invariant() {
        let alive = ReachabilityResult::alive_via(Transport::Plain);
        assert!(alive.alive());
        assert_eq!(alive.transport(), Transport::Plain);

        let dead = ReachabilityResult::dead();
        assert!(!dead.alive());
        assert_eq!(dead.transport(), Transport::None);

        // Passing `None` can never produce an alive result.
        assert_eq!(ReachabilityResult::alive_via(Transport::None), dead);
    }

    #[test]
    fn test_heuristic_is_not_authoritative() {
        let result = AvailabilityResult::heuristic(true, "Unknown");
        assert!(!result.is_authoritative());
        assert_eq!(result.confidence.label(), "heuristic");
    }

    #[test]
    fn test_check_state_serialization() {
        let json = serde_json::to_value(CheckState::Errored {
            message: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(json["state"], "errored");
        assert_eq!(json["message"], "boom");

        let json = serde_json::to_value(CheckState::NotChecked).unwrap();
        assert_eq!(json["state"], "not_checked");
    }

    #[test]
    fn test_config_builders() {
        let config = WatchConfig::default()
            .with_refresh_interval(Duration::from_millis(10))
            .with_latency(Duration::from_millis(500), Duration::from_millis(100));
        assert_eq!(config.refresh_interval, Duration::from_secs(1));
        assert_eq!(config.min_latency, Duration::from_millis(100));
        assert_eq!(config.max_latency, Duration::from_millis(500));
        assert_eq!(config.probe_timeout, Duration::from_secs(10));
        assert_eq!(config.known_domains.len(), 8);
    }
}
