//! Ordered set of tracked domains with write-through persistence.

use crate::error::DomainWatchError;
use crate::storage::{StateStore, DOMAINS_KEY};
use crate::types::DomainName;
use std::sync::Arc;
use tracing::{debug, warn};

/// Seed list used when no domain list has been persisted yet.
pub const DEFAULT_DOMAINS: [&str; 8] = [
    "google.com",
    "github.com",
    "stackoverflow.com",
    "example.com",
    "nonexistent-domain-12345.com",
    "test-domain-availability.org",
    "kanoe.moe",
    "domain-checker-test.net",
];

/// The tracked domain list.
///
/// Insertion order is preserved and every name appears at most once. Each
/// successful mutation is persisted before the method returns; if the write
/// fails the mutation is rolled back and the storage error is returned.
pub struct DomainStore {
    state: Arc<dyn StateStore>,
    domains: Vec<DomainName>,
}

impl DomainStore {
    /// Restore the list from `state`.
    ///
    /// Never fails: a missing or unparsable entry yields the default seed
    /// list. Invalid or repeated names inside an otherwise valid list are
    /// skipped.
    pub fn load(state: Arc<dyn StateStore>) -> Self {
        let domains = match state.get(DOMAINS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(names) => Self::parse_persisted(names),
                Err(e) => {
                    warn!(error = %e, "persisted domain list is not a JSON array, using defaults");
                    Self::default_domains()
                }
            },
            Ok(None) => {
                debug!("no persisted domain list, using defaults");
                Self::default_domains()
            }
            Err(e) => {
                warn!(error = %e, "could not read persisted domain list, using defaults");
                Self::default_domains()
            }
        };

        Self { state, domains }
    }

    /// The fixed seed list, in display order.
    pub fn default_domains() -> Vec<DomainName> {
        DEFAULT_DOMAINS
            .iter()
            .filter_map(|d| DomainName::parse(d).ok())
            .collect()
    }

    fn parse_persisted(names: Vec<String>) -> Vec<DomainName> {
        let mut domains: Vec<DomainName> = Vec::with_capacity(names.len());
        for raw in names {
            match DomainName::parse(&raw) {
                Ok(name) if domains.contains(&name) => {
                    warn!(domain = %name, "skipping repeated persisted domain");
                }
                Ok(name) => domains.push(name),
                Err(e) => warn!(error = %e, "skipping invalid persisted domain"),
            }
        }
        domains
    }

    pub fn domains(&self) -> &[DomainName] {
        &self.domains
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn contains(&self, name: &DomainName) -> bool {
        self.domains.contains(name)
    }

    /// Validate `raw` and append it.
    ///
    /// # Errors
    ///
    /// - `InvalidDomain` if `raw` does not match the domain grammar
    /// - `DuplicateDomain` if the name is already tracked
    /// - `Storage` if the new list could not be persisted
    pub fn add(&mut self, raw: &str) -> Result<DomainName, DomainWatchError> {
        let name = DomainName::parse(raw)?;

        if self.contains(&name) {
            return Err(DomainWatchError::duplicate(name.as_str()));
        }

        self.domains.push(name.clone());
        if let Err(e) = self.persist() {
            self.domains.pop();
            return Err(e);
        }

        debug!(domain = %name, total = self.domains.len(), "domain added");
        Ok(name)
    }

    /// Remove `name` if tracked.
    ///
    /// Returns `Ok(false)` without touching storage when the name is absent
    /// (including names that are not valid domains at all).
    pub fn remove(&mut self, name: &str) -> Result<bool, DomainWatchError> {
        let Ok(name) = DomainName::parse(name) else {
            return Ok(false);
        };
        let Some(index) = self.domains.iter().position(|d| *d == name) else {
            return Ok(false);
        };

        let removed = self.domains.remove(index);
        if let Err(e) = self.persist() {
            self.domains.insert(index, removed);
            return Err(e);
        }

        debug!(domain = %name, total = self.domains.len(), "domain removed");
        Ok(true)
    }

    /// Drop every tracked domain and persist the empty list.
    pub fn clear(&mut self) -> Result<(), DomainWatchError> {
        let previous = std::mem::take(&mut self.domains);
        if let Err(e) = self.persist() {
            self.domains = previous;
            return Err(e);
        }
        Ok(())
    }

    fn persist(&self) -> Result<(), DomainWatchError> {
        let names: Vec<&str> = self.domains.iter().map(DomainName::as_str).collect();
        let json = serde_json::to_string(&names)?;
        self.state.set(DOMAINS_KEY, &json)
    }
}
