use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::{sync::RwLock, time::interval};
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Overview,
    TopMembers,
    DateGroups,
    Records,
    Synergy,
    Inconsistency,
    LuckyLanes,
    Comebacks,
    NearMisses,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: QueryKind,
    pub params: String,
}

impl CacheKey {
    pub fn new(kind: QueryKind, params: impl Into<String>) -> Self {
        Self {
            kind,
            params: params.into(),
        }
    }
}

struct CacheEntry {
    value: Value,
    stored_at: Instant,
}

/// Short-lived cache of rendered dashboard payloads.
///
/// Owned by whoever serves the dashboard; the derivations never consult it.
pub struct DashboardCache {
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl DashboardCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Value> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.stored_at.elapsed() < self.ttl {
            debug!(kind = ?key.kind, params = %key.params, "Dashboard cache hit");
            Some(entry.value.clone())
        } else {
            None
        }
    }

    pub async fn insert(&self, key: CacheKey, value: Value) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drops stale entries and returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Periodically drops expired entries so keys built from request input do not
/// pile up. Runs until the task is aborted.
#[instrument(skip(cache))]
pub async fn start_purge_task(cache: Arc<DashboardCache>, every: Duration) {
    info!(
        purge_interval_ms = every.as_millis() as u64,
        "Starting dashboard cache purge task"
    );

    // `interval` panics on a zero period.
    let mut ticker = interval(every.max(Duration::from_millis(1)));

    loop {
        ticker.tick().await;

        let purged = cache.purge_expired().await;
        if purged > 0 {
            let remaining = cache.len().await;
            debug!(purged, remaining, "Purged dashboard cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn returns_fresh_entries() {
        let cache = DashboardCache::new(Duration::from_secs(300));
        let key = CacheKey::new(QueryKind::LuckyLanes, "sort=luck");

        cache.insert(key.clone(), json!({"lanes": []})).await;

        assert_eq!(cache.get(&key).await, Some(json!({"lanes": []})));
    }

    #[tokio::test]
    async fn keys_differ_by_params() {
        let cache = DashboardCache::new(Duration::from_secs(300));
        cache
            .insert(CacheKey::new(QueryKind::Synergy, "amy"), json!(1))
            .await;

        assert!(cache
            .get(&CacheKey::new(QueryKind::Synergy, "bob"))
            .await
            .is_none());
        assert!(cache
            .get(&CacheKey::new(QueryKind::Inconsistency, "amy"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn expired_entries_are_not_served_and_can_be_purged() {
        let cache = DashboardCache::new(Duration::ZERO);
        let key = CacheKey::new(QueryKind::Records, "");

        cache.insert(key.clone(), json!("stale")).await;

        assert!(cache.get(&key).await.is_none());
        assert_eq!(cache.purge_expired().await, 1);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn purge_task_drops_stale_keys_on_its_own() {
        let cache = Arc::new(DashboardCache::new(Duration::ZERO));
        for member in 0..1000 {
            cache
                .insert(CacheKey::new(QueryKind::Synergy, format!("m{member}")), json!([]))
                .await;
        }
        assert_eq!(cache.len().await, 1000);

        let task = tokio::spawn(start_purge_task(cache.clone(), Duration::from_millis(5)));
        tokio::time::sleep(Duration::from_millis(50)).await;
        task.abort();

        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn purge_keeps_fresh_entries() {
        let cache = DashboardCache::new(Duration::from_secs(60));
        cache
            .insert(CacheKey::new(QueryKind::DateGroups, ""), json!([]))
            .await;

        assert_eq!(cache.purge_expired().await, 0);
        assert_eq!(cache.len().await, 1);
    }
}
