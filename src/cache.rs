use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::store::KvStore;

pub const TTL_SEARCH: Duration = Duration::from_secs(300);
pub const TTL_SUGGEST: Duration = Duration::from_secs(60);
pub const TTL_KNOWLEDGE: Duration = Duration::from_secs(3600);
pub const TTL_INSTANT: Duration = Duration::from_secs(600);

/// Fast 32-bit rolling hash rendered in base36. Collisions are tolerated:
/// the worst case is a cache miss, never a wrong hit, because a collision
/// simply overwrites the other key's slot.
pub fn cache_hash(key: &str) -> String {
    let mut h: u32 = 0;
    for b in key.as_bytes() {
        h = h.wrapping_mul(31).wrapping_add(*b as u32);
    }
    to_base36(h)
}

fn to_base36(mut n: u32) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("base36 digits are ascii")
}

/// Typed cache spaces over the KV, each with its own TTL class.
#[derive(Clone)]
pub struct CacheStore {
    kv: Arc<dyn KvStore>,
}

impl CacheStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.kv.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(v) => {
                debug!("cache hit: {}", key);
                Some(v)
            }
            Err(e) => {
                warn!("cache entry at {} failed to decode: {}", key, e);
                None
            }
        }
    }

    async fn put<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_string(value) {
            Ok(raw) => self.kv.put(key, raw, Some(ttl)).await,
            Err(e) => warn!("cache encode failed for {}: {}", key, e),
        }
    }

    pub async fn get_search<T: DeserializeOwned>(&self, composite_key: &str) -> Option<T> {
        self.get(&format!("cache:search:{}", cache_hash(composite_key)))
            .await
    }

    pub async fn put_search<T: Serialize>(&self, composite_key: &str, value: &T) {
        self.put(
            &format!("cache:search:{}", cache_hash(composite_key)),
            value,
            TTL_SEARCH,
        )
        .await;
    }

    pub async fn get_suggest<T: DeserializeOwned>(&self, query: &str) -> Option<T> {
        self.get(&format!("cache:suggest:{}", cache_hash(query)))
            .await
    }

    pub async fn put_suggest<T: Serialize>(&self, query: &str, value: &T) {
        self.put(
            &format!("cache:suggest:{}", cache_hash(query)),
            value,
            TTL_SUGGEST,
        )
        .await;
    }

    pub async fn get_knowledge<T: DeserializeOwned>(&self, query: &str) -> Option<T> {
        self.get(&format!("cache:knowledge:{}", query)).await
    }

    pub async fn put_knowledge<T: Serialize>(&self, query: &str, value: &T) {
        self.put(&format!("cache:knowledge:{}", query), value, TTL_KNOWLEDGE)
            .await;
    }

    pub async fn get_instant<T: DeserializeOwned>(&self, subkey: &str) -> Option<T> {
        self.get(&format!("cache:instant:{}", subkey)).await
    }

    pub async fn put_instant<T: Serialize>(&self, subkey: &str, value: &T) {
        self.put(&format!("cache:instant:{}", subkey), value, TTL_INSTANT)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryKv;

    #[test]
    fn hash_is_deterministic_and_base36() {
        let a = cache_hash("q=rust|p1|pp10");
        let b = cache_hash("q=rust|p1|pp10");
        assert_eq!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert_ne!(cache_hash("q=rust|p1|pp10"), cache_hash("q=rust|p2|pp10"));
    }

    #[test]
    fn base36_renders_known_values() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[tokio::test]
    async fn spaces_are_disjoint() {
        let cache = CacheStore::new(Arc::new(MemoryKv::new()));
        cache.put_search("k", &"search".to_string()).await;
        cache.put_suggest("k", &"suggest".to_string()).await;
        assert_eq!(
            cache.get_search::<String>("k").await.as_deref(),
            Some("search")
        );
        assert_eq!(
            cache.get_suggest::<String>("k").await.as_deref(),
            Some("suggest")
        );
    }
}
