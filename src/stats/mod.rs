//! League statistics: turns raw per-game rows into dashboard view models.
//!
//! Every derivation here is a pure function over a snapshot of sessions.
//! Fetching the snapshot and caching results belong to the callers.

pub mod cache;
pub mod dates;
pub mod fun;
pub mod normalizer;
pub mod records;
pub mod repository;
pub mod rolling;
pub mod service;

mod errors;
pub mod models;

pub use cache::{start_purge_task, CacheKey, DashboardCache, QueryKind};
pub use errors::StatsError;
pub use models::*;
pub use normalizer::normalize_results;
pub use repository::{InMemoryResultStore, PostgresResultStore, ResultQuery, ResultStore};
pub use service::{DashboardOverview, StatsService};

/// Arithmetic mean; zero for an empty slice so callers never see `NaN`.
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
