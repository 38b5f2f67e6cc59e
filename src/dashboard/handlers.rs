use std::future::Future;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, instrument};

use super::types::{AsOfParams, LaneParams, LimitParams};
use crate::shared::{AppError, AppState};
use crate::stats::{fun::LaneSort, CacheKey, QueryKind, StatsError};

/// Serves `key` from the cache, computing and storing it on a miss.
async fn cached<T, F, Fut>(
    state: &AppState,
    key: CacheKey,
    compute: F,
) -> Result<Json<Value>, AppError>
where
    T: Serialize,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, StatsError>>,
{
    if let Some(hit) = state.cache.get(&key).await {
        return Ok(Json(hit));
    }

    let computed = compute().await?;
    let value = serde_json::to_value(&computed).map_err(|e| {
        error!(error = %e, kind = ?key.kind, "Failed to serialize dashboard payload");
        AppError::Internal
    })?;
    state.cache.insert(key, value.clone()).await;
    Ok(Json(value))
}

/// GET /dashboard
#[instrument(name = "dashboard_overview", skip(state))]
pub async fn overview(
    State(state): State<AppState>,
    Query(params): Query<AsOfParams>,
) -> Result<Json<Value>, AppError> {
    let as_of = params.as_of.unwrap_or_else(|| Utc::now().date_naive());
    info!(%as_of, "Building dashboard overview");

    let service = &state.stats_service;
    cached(&state, CacheKey::new(QueryKind::Overview, as_of.to_string()), || {
        service.overview(as_of)
    })
    .await
}

/// GET /dashboard/top-members
#[instrument(name = "top_members", skip(state))]
pub async fn top_members(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Value>, AppError> {
    let service = &state.stats_service;
    let limit = params.limit.unwrap_or(service.config().top_members);
    cached(&state, CacheKey::new(QueryKind::TopMembers, limit.to_string()), || {
        service.top_members(limit)
    })
    .await
}

/// GET /dashboard/dates
#[instrument(name = "date_groups", skip(state))]
pub async fn date_groups(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let service = &state.stats_service;
    cached(&state, CacheKey::new(QueryKind::DateGroups, ""), || {
        service.date_groups()
    })
    .await
}

/// GET /dashboard/records
#[instrument(name = "records", skip(state))]
pub async fn records(
    State(state): State<AppState>,
    Query(params): Query<AsOfParams>,
) -> Result<Json<Value>, AppError> {
    let as_of = params.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let service = &state.stats_service;
    cached(&state, CacheKey::new(QueryKind::Records, as_of.to_string()), || {
        service.records(as_of)
    })
    .await
}

/// GET /dashboard/members/:member_id/synergy
#[instrument(name = "synergy", skip(state))]
pub async fn synergy(
    State(state): State<AppState>,
    Path(member_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = &state.stats_service;
    cached(&state, CacheKey::new(QueryKind::Synergy, member_id.clone()), || {
        service.synergy(&member_id)
    })
    .await
}

/// GET /dashboard/inconsistency
#[instrument(name = "inconsistency", skip(state))]
pub async fn inconsistency(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let service = &state.stats_service;
    cached(&state, CacheKey::new(QueryKind::Inconsistency, ""), || {
        service.inconsistency()
    })
    .await
}

/// GET /dashboard/lanes?sort=
#[instrument(name = "lucky_lanes", skip(state))]
pub async fn lucky_lanes(
    State(state): State<AppState>,
    Query(params): Query<LaneParams>,
) -> Result<Json<Value>, AppError> {
    let sort = match params.sort.as_deref() {
        Some(raw) => raw.parse::<LaneSort>()?,
        None => LaneSort::default(),
    };
    let service = &state.stats_service;
    cached(&state, CacheKey::new(QueryKind::LuckyLanes, format!("{sort:?}")), || {
        service.lucky_lanes(sort)
    })
    .await
}

/// GET /dashboard/comebacks
#[instrument(name = "comebacks", skip(state))]
pub async fn comebacks(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let service = &state.stats_service;
    cached(&state, CacheKey::new(QueryKind::Comebacks, ""), || {
        service.comebacks()
    })
    .await
}

/// GET /dashboard/near-misses
#[instrument(name = "near_misses", skip(state))]
pub async fn near_misses(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let service = &state.stats_service;
    cached(&state, CacheKey::new(QueryKind::NearMisses, ""), || {
        service.near_misses()
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::super::router;
    use crate::shared::test_utils::AppStateBuilder;
    use crate::stats::{RawGameResult, ResultQuery, ResultStore};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chrono::NaiveDate;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt; // for `oneshot`

    fn row(session: &str, member: &str, game: u8, score: u16, lane: u32) -> RawGameResult {
        RawGameResult {
            session_id: session.to_string(),
            member_id: member.to_string(),
            member_name: member.to_uppercase(),
            game_number: game,
            score,
            session_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            lane_number: Some(lane),
            session_name: Some("Spring league".to_string()),
            strikes: None,
            spares: None,
        }
    }

    fn league_rows() -> Vec<RawGameResult> {
        vec![
            row("s1", "amy", 1, 196, 4),
            row("s1", "amy", 3, 210, 4),
            row("s1", "bob", 1, 150, 4),
            row("s1", "bob", 2, 160, 4),
        ]
    }

    async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[derive(Default)]
    struct CountingStore {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ResultStore for CountingStore {
        async fn fetch_results(
            &self,
            _query: &ResultQuery,
        ) -> Result<Vec<RawGameResult>, crate::stats::StatsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(league_rows())
        }
    }

    #[tokio::test]
    async fn test_near_misses_handler() {
        let app = router(AppStateBuilder::new().with_results(league_rows()).build());

        let (status, body) = get_json(app, "/dashboard/near-misses").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["hall_of_fame"][0]["score"], 210);
        assert_eq!(body["almost_there"][0]["score"], 196);
        assert_eq!(body["almost_there"][0]["gap_to_200"], 4);
    }

    #[tokio::test]
    async fn test_lanes_handler_with_sort() {
        let app = router(AppStateBuilder::new().with_results(league_rows()).build());

        let (status, body) = get_json(app, "/dashboard/lanes?sort=games").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["lane_number"], 4);
        assert_eq!(body[0]["total_games"], 4);
    }

    #[tokio::test]
    async fn test_lanes_handler_rejects_unknown_sort() {
        let app = router(AppStateBuilder::new().build());

        let (status, body) = get_json(app, "/dashboard/lanes?sort=vibes").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("vibes"));
    }

    #[tokio::test]
    async fn test_records_handler_with_as_of() {
        let app = router(AppStateBuilder::new().with_results(league_rows()).build());

        let (status, body) = get_json(app, "/dashboard/records?as_of=2024-06-01").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["highest_single_game"]["score"], 210);
        assert_eq!(body["highest_single_game"]["member"]["name"], "AMY");
    }

    #[tokio::test]
    async fn test_synergy_handler_for_unknown_member() {
        let app = router(AppStateBuilder::new().with_results(league_rows()).build());

        let (status, body) = get_json(app, "/dashboard/members/nobody/synergy").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_repeated_requests_are_served_from_cache() {
        let store = Arc::new(CountingStore::default());
        let app = router(AppStateBuilder::new().with_store(store.clone()).build());

        let (first, _) = get_json(app.clone(), "/dashboard/comebacks").await;
        let (second, body) = get_json(app, "/dashboard/comebacks").await;

        assert_eq!(first, StatusCode::OK);
        assert_eq!(second, StatusCode::OK);
        assert_eq!(body[0]["improvement"], 14);
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }
}
