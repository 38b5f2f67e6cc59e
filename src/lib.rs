// Library crate for the bowling league statistics server
// This file exposes the public API for integration tests

pub mod config;
pub mod dashboard;
pub mod shared;
pub mod stats;

// Re-export commonly used types for easier access in tests
pub use config::StatsConfig;
pub use dashboard::router;
pub use shared::{AppError, AppState};
pub use stats::{
    normalize_results, DashboardCache, InMemoryResultStore, RawGameResult, ResultStore,
    StatsError, StatsService,
};
