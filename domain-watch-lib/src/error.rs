//! Error handling for the domain-watch core.
//!
//! Validation and duplicate errors are surfaced straight to the intent that
//! caused them. Probe failures never leave the probe: they are folded into a
//! dead `ReachabilityResult`. Pipeline errors are isolated to one domain and
//! end up as an `Errored` state for that domain.

use std::fmt;
use std::time::Duration;

use crate::types::Transport;

/// Main error type for domain-watch operations.
#[derive(Debug, Clone)]
pub enum DomainWatchError {
    /// Input does not match the domain-name grammar
    InvalidDomain { domain: String, reason: String },

    /// Domain is already tracked
    DuplicateDomain { domain: String },

    /// Intent referenced a domain that is not tracked
    UnknownDomain { domain: String },

    /// One transport attempt of a reachability probe failed
    ProbeError {
        domain: String,
        transport: Transport,
        message: String,
    },

    /// Unexpected fault while checking a single domain
    PipelineError { domain: String, message: String },

    /// A full refresh is already running
    RefreshInProgress,

    /// Persisted state could not be read or written
    Storage { path: String, message: String },

    /// Configuration errors (invalid settings, unparsable files, etc.)
    ConfigError { message: String },

    /// Network-related errors outside the probe (summary fetch, client setup)
    NetworkError {
        message: String,
        source: Option<String>,
    },

    /// Timeout errors when operations take too long
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl DomainWatchError {
    /// Create a new invalid domain error.
    pub fn invalid_domain<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::InvalidDomain {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    /// Create a new duplicate domain error.
    pub fn duplicate<D: Into<String>>(domain: D) -> Self {
        Self::DuplicateDomain {
            domain: domain.into(),
        }
    }

    /// Create a new unknown domain error.
    pub fn unknown_domain<D: Into<String>>(domain: D) -> Self {
        Self::UnknownDomain {
            domain: domain.into(),
        }
    }

    /// Create a new probe error for one transport attempt.
    pub fn probe<D: Into<String>, M: Into<String>>(
        domain: D,
        transport: Transport,
        message: M,
    ) -> Self {
        Self::ProbeError {
            domain: domain.into(),
            transport,
            message: message.into(),
        }
    }

    /// Create a new pipeline error.
    pub fn pipeline<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::PipelineError {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new storage error.
    pub fn storage<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new network error.
    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new network error with source information.
    pub fn network_with_source<M: Into<String>, S: Into<String>>(message: M, source: S) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the user can fix this by changing their input.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidDomain { .. } | Self::DuplicateDomain { .. } | Self::UnknownDomain { .. }
        )
    }

    /// Check if this error suggests the operation should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError { .. }
                | Self::Timeout { .. }
                | Self::ProbeError { .. }
                | Self::RefreshInProgress
        )
    }
}

impl fmt::Display for DomainWatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDomain { domain, reason } => {
                write!(f, "Invalid domain '{}': {}", domain, reason)
            }
            Self::DuplicateDomain { domain } => {
                write!(f, "Domain '{}' is already in the list", domain)
            }
            Self::UnknownDomain { domain } => {
                write!(f, "Domain '{}' is not being tracked", domain)
            }
            Self::ProbeError {
                domain,
                transport,
                message,
            } => {
                write!(f, "{} probe failed for '{}': {}", transport, domain, message)
            }
            Self::PipelineError { domain, message } => {
                write!(f, "Error checking domain '{}': {}", domain, message)
            }
            Self::RefreshInProgress => write!(f, "A refresh is already in progress"),
            Self::Storage { path, message } => {
                write!(f, "Storage error at '{}': {}", path, message)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::NetworkError { message, source } => {
                if let Some(source) = source {
                    write!(f, "Network error: {} (source: {})", message, source)
                } else {
                    write!(f, "Network error: {}", message)
                }
            }
            Self::Timeout {
                operation,
                duration,
            } => {
                write!(f, "Timeout after {:?} during: {}", duration, operation)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for DomainWatchError {}

impl From<reqwest::Error> for DomainWatchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout("HTTP request", Duration::from_secs(30))
        } else if err.is_connect() {
            Self::network_with_source("Connection failed", err.to_string())
        } else {
            Self::network_with_source("HTTP request failed", err.to_string())
        }
    }
}

impl From<serde_json::Error> for DomainWatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal {
            message: format!("JSON parsing failed: {}", err),
        }
    }
}

impl From<std::io::Error> for DomainWatchError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}
