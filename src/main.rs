use std::sync::Arc;

use pinsheet::{
    router,
    stats::{start_purge_task, PostgresResultStore, RawGameResult},
    AppState, DashboardCache, InMemoryResultStore, ResultStore, StatsConfig, StatsService,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pinsheet=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting league statistics server");

    let config = StatsConfig::from_env();
    let store = result_store().await;

    let cache = Arc::new(DashboardCache::new(config.cache_ttl));
    tokio::spawn(start_purge_task(cache.clone(), cache.ttl()));
    let bind_addr = config.bind_addr.clone();
    let service = StatsService::builder(store).with_config(config).build();
    let app_state = AppState::new(Arc::new(service), cache);

    let app = router(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap();
    info!("Server running on http://{}", bind_addr);
    axum::serve(listener, app).await.unwrap();
}

/// Postgres when `DATABASE_URL` is set, otherwise an in-memory store seeded
/// from `PINSHEET_SCORES_FILE` (a JSON array of game rows) if present.
async fn result_store() -> Arc<dyn ResultStore> {
    if let Ok(database_url) = std::env::var("DATABASE_URL") {
        let pool = sqlx::PgPool::connect(&database_url)
            .await
            .expect("Failed to connect to database");
        info!("Using PostgreSQL result store");
        return Arc::new(PostgresResultStore::new(pool));
    }

    let rows = match std::env::var("PINSHEET_SCORES_FILE") {
        Ok(path) => match std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                serde_json::from_str::<Vec<RawGameResult>>(&raw).map_err(|e| e.to_string())
            }) {
            Ok(rows) => {
                info!(path = %path, rows = rows.len(), "Seeded in-memory result store");
                rows
            }
            Err(e) => {
                warn!(path = %path, error = %e, "Could not load scores file, starting empty");
                Vec::new()
            }
        },
        Err(_) => Vec::new(),
    };

    Arc::new(InMemoryResultStore::with_results(rows))
}
