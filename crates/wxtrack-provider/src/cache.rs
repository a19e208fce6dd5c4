//! Short-lived response cache keyed by request URL

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug)]
struct CachedResponse {
    stored_at: Instant,
    body: String,
}

/// Successful response bodies, fresh for `ttl` after they were stored.
///
/// A zero `ttl` disables caching.
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedResponse>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.body.clone())
    }

    pub async fn insert(&self, key: String, body: String) {
        if self.ttl.is_zero() {
            return;
        }
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        entries.insert(
            key,
            CachedResponse {
                stored_at: Instant::now(),
                body,
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_fresh_entries() {
        let cache = ResponseCache::new(Duration::from_secs(3600));
        cache.insert("a".into(), "body".into()).await;
        assert_eq!(cache.get("a").await.as_deref(), Some("body"));
        assert_eq!(cache.get("b").await, None);
    }

    #[tokio::test]
    async fn expired_entries_are_ignored_and_pruned() {
        let cache = ResponseCache::new(Duration::from_millis(20));
        cache.insert("a".into(), "old".into()).await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("a").await, None);

        cache.insert("b".into(), "new".into()).await;
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn zero_ttl_disables_cache() {
        let cache = ResponseCache::new(Duration::ZERO);
        cache.insert("a".into(), "body".into()).await;
        assert_eq!(cache.get("a").await, None);
        assert_eq!(cache.len().await, 0);
    }
}
