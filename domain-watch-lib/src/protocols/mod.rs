//! Per-domain signal sources used by the status pipeline.
//!
//! This module contains the reachability probe (real network signal) and
//! the availability estimator (heuristic placeholder signal).

/// HTTPS/HTTP existence probing
pub mod reachability;

/// Heuristic registration-status estimate
pub mod availability;

// Re-export commonly used traits and types
pub use availability::{
    AvailabilityEstimator, HeuristicEstimator, RandomSource, ThreadRandom, KNOWN_REGISTRAR,
    UNKNOWN_REGISTRAR,
};
pub use reachability::{
    ExistenceCheck, HttpReachabilityProbe, ReachabilityProbe, ReqwestExistenceCheck,
};
