//! Configuration file parsing and management.
//!
//! This module loads TOML configuration files, reads `DW_*` environment
//! variables and folds both onto a [`WatchConfig`] with proper precedence.

use crate::error::DomainWatchError;
use crate::types::WatchConfig;
use crate::utils::{parse_bool_flag, parse_duration_string};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// File name of the persisted state when no data directory is known.
const FALLBACK_STATE_FILE: &str = ".domain-watch-state.json";

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    /// Default values for CLI options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Heuristic availability estimator settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<AvailabilityConfig>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    /// Per-transport probe timeout (e.g. "10s", "500ms")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_timeout: Option<String>,

    /// Automatic refresh period (e.g. "5m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_interval: Option<String>,

    /// Where the tracked domain list is persisted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_file: Option<String>,

    /// Path or URL of the workflow status summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_source: Option<String>,

    /// Default pretty output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pretty: Option<bool>,

    /// Default JSON output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AvailabilityConfig {
    /// Tokens marking a domain as well known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub known_domains: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_latency_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_latency_ms: Option<u64>,
}

impl FileConfig {
    /// Overlay the values present in this file onto `config`.
    ///
    /// Assumes the file has been validated; unparsable durations are skipped.
    pub fn apply_to(&self, mut config: WatchConfig) -> WatchConfig {
        if let Some(defaults) = &self.defaults {
            if let Some(timeout) = defaults.probe_timeout.as_deref().and_then(parse_duration_string)
            {
                config = config.with_probe_timeout(timeout);
            }
            if let Some(interval) = defaults
                .refresh_interval
                .as_deref()
                .and_then(parse_duration_string)
            {
                config = config.with_refresh_interval(interval);
            }
            if let Some(path) = &defaults.state_file {
                config = config.with_state_file(path);
            }
            if let Some(source) = &defaults.summary_source {
                config = config.with_summary_source(source.clone());
            }
        }

        if let Some(availability) = &self.availability {
            if let Some(tokens) = &availability.known_domains {
                config = config.with_known_domains(tokens.clone());
            }
            let min = availability
                .min_latency_ms
                .map(Duration::from_millis)
                .unwrap_or(config.min_latency);
            let max = availability
                .max_latency_ms
                .map(Duration::from_millis)
                .unwrap_or(config.max_latency);
            config = config.with_latency(min, max);
        }

        config
    }
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to report which files were picked up
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// `Storage` if the file is missing or unreadable, `ConfigError` if it
    /// does not parse or fails validation.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, DomainWatchError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DomainWatchError::storage(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            DomainWatchError::storage(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            DomainWatchError::config(format!(
                "Failed to parse TOML configuration {}: {}",
                path.display(),
                e
            ))
        })?;

        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config < global (`~/.domain-watch.toml`) < local
    /// (`./domain-watch.toml` or `./.domain-watch.toml`).
    pub fn discover_and_load(&self) -> FileConfig {
        self.load_layers(&self.candidate_paths())
    }

    /// Load and merge `paths`, lowest precedence first.
    ///
    /// Missing files are skipped silently; broken ones with a warning.
    pub fn load_layers(&self, paths: &[PathBuf]) -> FileConfig {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        for path in paths.iter().filter(|p| p.exists()) {
            match self.load_file(path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "ignoring config file"),
            }
        }

        if self.verbose && loaded_files.len() > 1 {
            for (i, path) in loaded_files.iter().enumerate() {
                let status = if i == loaded_files.len() - 1 {
                    "highest precedence"
                } else {
                    "overridden where set later"
                };
                debug!(path = %path.display(), status, "config layer");
            }
        }

        merged_config
    }

    /// Standard config locations, lowest precedence first.
    fn candidate_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        let xdg_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")));
        if let Some(dir) = xdg_dir {
            paths.push(dir.join("domain-watch").join("config.toml"));
        }

        if let Some(home) = env::var_os("HOME") {
            paths.push(Path::new(&home).join(".domain-watch.toml"));
        }

        // Only the first local file found is used.
        if let Some(local) = ["./domain-watch.toml", "./.domain-watch.toml"]
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
        {
            paths.push(local);
        }

        paths
    }

    /// Merge two configurations; values from `higher` take precedence.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(mut lower_defaults), Some(higher_defaults)) => {
                    if higher_defaults.probe_timeout.is_some() {
                        lower_defaults.probe_timeout = higher_defaults.probe_timeout;
                    }
                    if higher_defaults.refresh_interval.is_some() {
                        lower_defaults.refresh_interval = higher_defaults.refresh_interval;
                    }
                    if higher_defaults.state_file.is_some() {
                        lower_defaults.state_file = higher_defaults.state_file;
                    }
                    if higher_defaults.summary_source.is_some() {
                        lower_defaults.summary_source = higher_defaults.summary_source;
                    }
                    if higher_defaults.pretty.is_some() {
                        lower_defaults.pretty = higher_defaults.pretty;
                    }
                    if higher_defaults.json.is_some() {
                        lower_defaults.json = higher_defaults.json;
                    }
                    Some(lower_defaults)
                }
                (lower_defaults, higher_defaults) => higher_defaults.or(lower_defaults),
            },
            availability: match (lower.availability, higher.availability) {
                (Some(mut lower_avail), Some(higher_avail)) => {
                    if higher_avail.known_domains.is_some() {
                        lower_avail.known_domains = higher_avail.known_domains;
                    }
                    if higher_avail.min_latency_ms.is_some() {
                        lower_avail.min_latency_ms = higher_avail.min_latency_ms;
                    }
                    if higher_avail.max_latency_ms.is_some() {
                        lower_avail.max_latency_ms = higher_avail.max_latency_ms;
                    }
                    Some(lower_avail)
                }
                (lower_avail, higher_avail) => higher_avail.or(lower_avail),
            },
        }
    }

    /// Validate a configuration for common issues.
    pub fn validate_config(&self, config: &FileConfig) -> Result<(), DomainWatchError> {
        if let Some(defaults) = &config.defaults {
            for (field, value) in [
                ("probe_timeout", &defaults.probe_timeout),
                ("refresh_interval", &defaults.refresh_interval),
            ] {
                if let Some(value) = value {
                    match parse_duration_string(value) {
                        Some(d) if !d.is_zero() => {}
                        _ => {
                            return Err(DomainWatchError::config(format!(
                                "Invalid {} '{}'. Use format like '500ms', '10s', '5m'",
                                field, value
                            )));
                        }
                    }
                }
            }

            if let Some(path) = &defaults.state_file {
                if path.trim().is_empty() {
                    return Err(DomainWatchError::config("state_file cannot be empty"));
                }
            }
        }

        if let Some(availability) = &config.availability {
            if let Some(tokens) = &availability.known_domains {
                if tokens.iter().any(|t| t.trim().is_empty()) {
                    return Err(DomainWatchError::config(
                        "known_domains cannot contain empty tokens",
                    ));
                }
            }

            if let (Some(min), Some(max)) = (availability.min_latency_ms, availability.max_latency_ms)
            {
                if min >= max {
                    return Err(DomainWatchError::config(format!(
                        "min_latency_ms ({}) must be below max_latency_ms ({})",
                        min, max
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// Values come from the `DW_*` variables; invalid ones are logged and ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub timeout: Option<Duration>,
    pub interval: Option<Duration>,
    pub state_file: Option<String>,
    pub summary: Option<String>,
    pub config: Option<String>,
    pub pretty: Option<bool>,
    pub json: Option<bool>,
}

/// Load configuration from the process environment.
pub fn load_env_config() -> EnvConfig {
    EnvConfig::from_lookup(|key| env::var(key).ok())
}

impl EnvConfig {
    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let duration = |key: &str| {
            let raw = lookup(key)?;
            match parse_duration_string(&raw) {
                Some(d) if !d.is_zero() => {
                    debug!(key, value = %raw, "using environment override");
                    Some(d)
                }
                _ => {
                    warn!(key, value = %raw, "invalid duration, use format like '10s' or '5m'");
                    None
                }
            }
        };
        let flag = |key: &str| {
            let raw = lookup(key)?;
            let parsed = parse_bool_flag(&raw);
            if parsed.is_none() {
                warn!(key, value = %raw, "invalid flag, use true/false");
            }
            parsed
        };
        let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            timeout: duration("DW_TIMEOUT"),
            interval: duration("DW_INTERVAL"),
            state_file: text("DW_STATE_FILE"),
            summary: text("DW_SUMMARY"),
            config: text("DW_CONFIG"),
            pretty: flag("DW_PRETTY"),
            json: flag("DW_JSON"),
        }
    }

    /// Overlay the values present in the environment onto `config`.
    pub fn apply_to(&self, mut config: WatchConfig) -> WatchConfig {
        if let Some(timeout) = self.timeout {
            config = config.with_probe_timeout(timeout);
        }
        if let Some(interval) = self.interval {
            config = config.with_refresh_interval(interval);
        }
        if let Some(path) = &self.state_file {
            config = config.with_state_file(path);
        }
        if let Some(source) = &self.summary {
            config = config.with_summary_source(source.clone());
        }
        config
    }
}

/// Default location of the persisted state file.
///
/// `$XDG_DATA_HOME/domain-watch/state.json`, then
/// `~/.local/share/domain-watch/state.json`, else a dotfile in the working
/// directory.
pub fn default_state_path() -> PathBuf {
    env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".local").join("share")))
        .map(|dir| dir.join("domain-watch").join("state.json"))
        .unwrap_or_else(|| PathBuf::from(FALLBACK_STATE_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_load_valid_config() {
        let temp_file = write_config(
            r#"
[defaults]
probe_timeout = "5s"
refresh_interval = "2m"
pretty = true

[availability]
known_domains = ["google", "mozilla"]
min_latency_ms = 10
max_latency_ms = 20
"#,
        );

        let manager = ConfigManager::new(false);
        let config = manager.load_file(temp_file.path()).unwrap();

        let defaults = config.defaults.clone().unwrap();
        assert_eq!(defaults.probe_timeout, Some("5s".to_string()));
        assert_eq!(defaults.pretty, Some(true));

        let watch = config.apply_to(WatchConfig::default());
        assert_eq!(watch.probe_timeout, Duration::from_secs(5));
        assert_eq!(watch.refresh_interval, Duration::from_secs(120));
        assert_eq!(watch.known_domains, vec!["google", "mozilla"]);
        assert_eq!(watch.min_latency, Duration::from_millis(10));
        assert_eq!(watch.max_latency, Duration::from_millis(20));
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let manager = ConfigManager::new(false);
        for content in [
            "[defaults]\nprobe_timeout = \"soon\"\n",
            "[defaults]\nrefresh_interval = \"0s\"\n",
            "[availability]\nmin_latency_ms = 500\nmax_latency_ms = 100\n",
            "[availability]\nknown_domains = [\"google\", \" \"]\n",
            "[defaults\nbroken",
        ] {
            let temp_file = write_config(content);
            let err = manager.load_file(temp_file.path()).unwrap_err();
            assert!(
                matches!(err, DomainWatchError::ConfigError { .. }),
                "{}: {:?}",
                content,
                err
            );
        }
    }

    #[test]
    fn test_missing_file_is_error() {
        let manager = ConfigManager::new(false);
        let result = manager.load_file("/definitely/not/here/domain-watch.toml");
        assert!(matches!(result, Err(DomainWatchError::Storage { .. })));
    }

    #[test]
    fn test_merge_configs() {
        let manager = ConfigManager::new(false);

        let lower = FileConfig {
            defaults: Some(DefaultsConfig {
                probe_timeout: Some("10s".to_string()),
                summary_source: Some("./lower.json".to_string()),
                pretty: Some(false),
                ..Default::default()
            }),
            availability: Some(AvailabilityConfig {
                known_domains: Some(vec!["google".to_string()]),
                ..Default::default()
            }),
        };

        let higher = FileConfig {
            defaults: Some(DefaultsConfig {
                probe_timeout: Some("3s".to_string()),
                pretty: Some(true),
                ..Default::default()
            }),
            availability: None,
        };

        let merged = manager.merge_configs(lower, higher);
        let defaults = merged.defaults.unwrap();

        assert_eq!(defaults.probe_timeout, Some("3s".to_string())); // Higher wins
        assert_eq!(defaults.summary_source, Some("./lower.json".to_string())); // Lower preserved
        assert_eq!(defaults.pretty, Some(true));
        assert_eq!(
            merged.availability.unwrap().known_domains,
            Some(vec!["google".to_string()])
        );
    }

    #[test]
    fn test_load_layers_precedence() {
        let dir = TempDir::new().unwrap();
        let global = dir.path().join("global.toml");
        let local = dir.path().join("local.toml");
        let broken = dir.path().join("broken.toml");
        fs::write(&global, "[defaults]\nprobe_timeout = \"20s\"\nstate_file = \"/tmp/g.json\"\n")
            .unwrap();
        fs::write(&local, "[defaults]\nprobe_timeout = \"2s\"\n").unwrap();
        fs::write(&broken, "not = [toml").unwrap();

        let manager = ConfigManager::new(true);
        let merged = manager.load_layers(&[
            dir.path().join("missing.toml"),
            global,
            broken,
            local,
        ]);

        let defaults = merged.defaults.unwrap();
        assert_eq!(defaults.probe_timeout, Some("2s".to_string()));
        assert_eq!(defaults.state_file, Some("/tmp/g.json".to_string()));
    }

    #[test]
    fn test_env_config_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("DW_TIMEOUT", "750ms"),
            ("DW_INTERVAL", "not-a-duration"),
            ("DW_STATE_FILE", "/tmp/state.json"),
            ("DW_SUMMARY", "  "),
            ("DW_PRETTY", "yes"),
            ("DW_JSON", "maybe"),
        ]);
        let env = EnvConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(env.timeout, Some(Duration::from_millis(750)));
        assert_eq!(env.interval, None);
        assert_eq!(env.state_file, Some("/tmp/state.json".to_string()));
        assert_eq!(env.summary, None);
        assert_eq!(env.pretty, Some(true));
        assert_eq!(env.json, None);

        let watch = env.apply_to(WatchConfig::default());
        assert_eq!(watch.probe_timeout, Duration::from_millis(750));
        assert_eq!(watch.refresh_interval, Duration::from_secs(300));
        assert_eq!(watch.state_file, PathBuf::from("/tmp/state.json"));
    }

    #[test]
    fn test_env_overrides_file() {
        let file = FileConfig {
            defaults: Some(DefaultsConfig {
                probe_timeout: Some("20s".to_string()),
                summary_source: Some("https://example.com/summary.json".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let env = EnvConfig {
            timeout: Some(Duration::from_secs(1)),
            ..Default::default()
        };

        let watch = env.apply_to(file.apply_to(WatchConfig::default()));
        assert_eq!(watch.probe_timeout, Duration::from_secs(1));
        assert_eq!(watch.summary_source, "https://example.com/summary.json");
    }

    #[test]
    fn test_default_state_path_is_json() {
        let path = default_state_path();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("json"));
    }
}
