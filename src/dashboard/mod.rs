pub mod handlers;
pub mod types;

use axum::{routing::get, Router};

use crate::shared::AppState;

/// Read-only JSON routes for the dashboard UI.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/dashboard", get(handlers::overview))
        .route("/dashboard/top-members", get(handlers::top_members))
        .route("/dashboard/dates", get(handlers::date_groups))
        .route("/dashboard/records", get(handlers::records))
        .route(
            "/dashboard/members/:member_id/synergy",
            get(handlers::synergy),
        )
        .route("/dashboard/inconsistency", get(handlers::inconsistency))
        .route("/dashboard/lanes", get(handlers::lucky_lanes))
        .route("/dashboard/comebacks", get(handlers::comebacks))
        .route("/dashboard/near-misses", get(handlers::near_misses))
        .with_state(state)
}
