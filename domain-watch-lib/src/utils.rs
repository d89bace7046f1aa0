//! Utility functions for domain validation and value parsing.
//!
//! This module contains the domain-name grammar used by the store, plus
//! small parsers shared by the configuration layers.

use crate::error::DomainWatchError;
use chrono::{DateTime, Local, TimeZone};
use regex::Regex;
use std::time::Duration;

lazy_static::lazy_static! {
    /// 1-63 chars, alphanumeric, hyphens only inside the label.
    static ref LABEL_RE: Regex = Regex::new(r"^[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?$").unwrap();

    /// Final label: 2-63 chars, must start with a letter.
    static ref TLD_RE: Regex = Regex::new(r"^[a-z](?:[a-z0-9-]{0,61}[a-z0-9])$").unwrap();
}

/// Maximum length of a full domain name in presentation format.
const MAX_DOMAIN_LEN: usize = 253;

/// Normalize and validate a domain name.
///
/// Input is trimmed and lowercased, then checked against the
/// `label(.label)*.tld` grammar.
///
/// # Returns
///
/// The normalized name, or `DomainWatchError::InvalidDomain` describing the
/// first rule that failed.
pub fn normalize_domain(raw: &str) -> Result<String, DomainWatchError> {
    let domain = raw.trim().to_lowercase();

    if domain.is_empty() {
        return Err(DomainWatchError::invalid_domain(
            raw,
            "Domain name cannot be empty",
        ));
    }

    if domain.len() > MAX_DOMAIN_LEN {
        return Err(DomainWatchError::invalid_domain(
            raw,
            format!("Domain name is longer than {} characters", MAX_DOMAIN_LEN),
        ));
    }

    let labels: Vec<&str> = domain.split('.').collect();
    let (tld, rest) = match labels.split_last() {
        Some((tld, rest)) if !rest.is_empty() => (tld, rest),
        _ => {
            return Err(DomainWatchError::invalid_domain(
                raw,
                "Domain name needs at least one dot (e.g. example.com)",
            ))
        }
    };

    for label in rest {
        if !LABEL_RE.is_match(label) {
            return Err(DomainWatchError::invalid_domain(
                raw,
                format!(
                    "Label '{}' must be 1-63 letters, digits or inner hyphens",
                    label
                ),
            ));
        }
    }

    if !TLD_RE.is_match(tld) {
        return Err(DomainWatchError::invalid_domain(
            raw,
            format!(
                "Top-level label '{}' must be at least 2 characters and start with a letter",
                tld
            ),
        ));
    }

    Ok(domain)
}

/// Parse a duration string like "500ms", "10s", "5m" or a bare number of seconds.
pub fn parse_duration_string(value: &str) -> Option<Duration> {
    let value = value.trim().to_lowercase();

    if let Some(ms) = value.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = value.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = value.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .map(|m| Duration::from_secs(m * 60))
    } else {
        // Assume seconds if no unit
        value.parse::<u64>().ok().map(Duration::from_secs)
    }
}

/// Parse a boolean flag value the way environment variables are usually written.
pub fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Render a timestamp as local human-readable text.
pub fn human_timestamp<Tz: TimeZone>(time: &DateTime<Tz>) -> String {
    time.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_domains() {
        assert_eq!(normalize_domain("example.com").unwrap(), "example.com");
        assert_eq!(normalize_domain(" GitHub.COM ").unwrap(), "github.com");
        assert!(normalize_domain("sub.example.co.uk").is_ok());
        assert!(normalize_domain("nonexistent-domain-12345.com").is_ok());
        assert!(normalize_domain("kanoe.moe").is_ok());
        assert!(normalize_domain("a.io").is_ok());
        assert!(normalize_domain("xn--80ak6aa92e.xn--p1ai").is_ok());
    }

    #[test]
    fn test_invalid_domains() {
        for bad in [
            "",
            "   ",
            "x",
            "not a domain",
            "-bad.com",
            "bad-.com",
            "example.c",
            "example.123",
            ".com",
            "example.",
            "exa..mple.com",
            "under_score.com",
        ] {
            assert!(
                matches!(
                    normalize_domain(bad),
                    Err(DomainWatchError::InvalidDomain { .. })
                ),
                "'{}' should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_label_length_limits() {
        let ok = format!("{}.com", "a".repeat(63));
        let too_long = format!("{}.com", "a".repeat(64));
        assert!(normalize_domain(&ok).is_ok());
        assert!(normalize_domain(&too_long).is_err());

        let huge = format!("{}.com", ["abcdefghij"; 30].join("."));
        assert!(huge.len() > MAX_DOMAIN_LEN);
        assert!(normalize_domain(&huge).is_err());
    }

    #[test]
    fn test_parse_duration_string() {
        assert_eq!(parse_duration_string("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration_string("10s"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration_string("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration_string("7"), Some(Duration::from_secs(7)));
        assert_eq!(parse_duration_string("soon"), None);
    }

    #[test]
    fn test_parse_bool_flag() {
        assert_eq!(parse_bool_flag("YES"), Some(true));
        assert_eq!(parse_bool_flag("off"), Some(false));
        assert_eq!(parse_bool_flag("maybe"), None);
    }
}
