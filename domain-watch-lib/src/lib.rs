//! # Domain Watch Library
//!
//! Headless core of a dashboard that tracks a list of domain names and, for
//! each one, reports whether it answers network probes and a heuristic guess
//! at whether it is registered.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use domain_watch_lib::{DashboardController, MemoryStore, NullPresenter, WatchConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let controller = DashboardController::from_config(
//!         &WatchConfig::default(),
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(NullPresenter),
//!     )?;
//!
//!     let report = controller.refresh_all().await?;
//!     println!("{} alive, {} available", report.stats.alive, report.stats.available);
//!     Ok(())
//! }
//! ```
//!
//! ## Pieces
//!
//! - **DomainStore**: ordered, validated, persisted domain list
//! - **ReachabilityProbe**: HTTPS then HTTP existence checks with per-attempt timeouts
//! - **AvailabilityEstimator**: clearly labeled heuristic, replaceable by a registry client
//! - **DomainStatusPipeline**: concurrent per-domain checks with streaming state updates
//! - **DashboardController**: intents, statistics and periodic refresh

// Re-export main public API types and functions
// This makes them available as domain_watch_lib::TypeName
pub use clock::{Clock, TokioClock};
pub use config::{
    default_state_path, load_env_config, AvailabilityConfig, ConfigManager, DefaultsConfig,
    EnvConfig, FileConfig,
};
pub use controller::{
    DashboardController, Intent, IntentOutcome, NullPresenter, Presenter, RefreshReport,
};
pub use error::DomainWatchError;
pub use pipeline::{BatchReport, DomainStatusPipeline, NullSink, StatusSink};
pub use protocols::{
    AvailabilityEstimator, ExistenceCheck, HeuristicEstimator, HttpReachabilityProbe,
    RandomSource, ReachabilityProbe, ReqwestExistenceCheck, ThreadRandom, KNOWN_REGISTRAR,
    UNKNOWN_REGISTRAR,
};
pub use storage::{JsonFileStore, MemoryStore, StateStore, DOMAINS_KEY, WORKFLOW_UPDATE_KEY};
pub use store::{DomainStore, DEFAULT_DOMAINS};
pub use summary::{mark_workflow_update_now, parse_summary, SummaryFetcher};
pub use types::{
    AvailabilityResult, CheckOutcome, CheckState, Confidence, DashboardStats, DomainCheckResult,
    DomainName, ReachabilityResult, Transport, WatchConfig, DEFAULT_KNOWN_DOMAINS,
};
pub use utils::{human_timestamp, normalize_domain, parse_bool_flag, parse_duration_string};

// Internal modules - these are not part of the public API
mod clock;
mod config;
mod controller;
mod error;
mod pipeline;
mod protocols;
mod storage;
mod store;
mod summary;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, DomainWatchError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
