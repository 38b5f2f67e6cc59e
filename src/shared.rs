use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::stats::{DashboardCache, StatsError, StatsService};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub stats_service: Arc<StatsService>,
    pub cache: Arc<DashboardCache>,
}

impl AppState {
    pub fn new(stats_service: Arc<StatsService>, cache: Arc<DashboardCache>) -> Self {
        Self {
            stats_service,
            cache,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error")]
    Internal,
}

impl From<StatsError> for AppError {
    fn from(err: StatsError) -> Self {
        match err {
            StatsError::Store(msg) => AppError::DatabaseError(msg),
            StatsError::Validation(msg) => AppError::BadRequest(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::DatabaseError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", msg),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use crate::config::StatsConfig;
    use crate::stats::{InMemoryResultStore, RawGameResult, ResultStore};

    /// Builder for creating AppState with overrides for testing
    pub struct AppStateBuilder {
        store: Option<Arc<dyn ResultStore>>,
        config: StatsConfig,
    }

    impl AppStateBuilder {
        pub fn new() -> Self {
            Self {
                store: None,
                config: StatsConfig::default(),
            }
        }

        pub fn with_store(mut self, store: Arc<dyn ResultStore>) -> Self {
            self.store = Some(store);
            self
        }

        pub fn with_results(self, rows: Vec<RawGameResult>) -> Self {
            self.with_store(Arc::new(InMemoryResultStore::with_results(rows)))
        }

        pub fn build(self) -> AppState {
            let store = self
                .store
                .unwrap_or_else(|| Arc::new(InMemoryResultStore::new()));
            let cache = Arc::new(DashboardCache::new(self.config.cache_ttl));
            let service = StatsService::builder(store).with_config(self.config).build();
            AppState::new(Arc::new(service), cache)
        }
    }

    impl Default for AppStateBuilder {
        fn default() -> Self {
            Self::new()
        }
    }
}
