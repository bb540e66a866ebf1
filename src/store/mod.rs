mod records;

pub use records::RecordStore;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Contract of the external key-value store: per-key linearizable get/put
/// with optional TTL. Values are JSON strings.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn put(&self, key: &str, value: String, ttl: Option<Duration>);
    async fn delete(&self, key: &str);
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

/// In-memory default backend. Expired entries are dropped lazily on read and
/// swept opportunistically on write.
#[derive(Default)]
pub struct MemoryKv {
    map: RwLock<HashMap<String, Entry>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Option<String> {
        let map = self.map.read().await;
        let entry = map.get(key)?;
        if let Some(expires_at) = entry.expires_at {
            if Instant::now() >= expires_at {
                return None;
            }
        }
        Some(entry.value.clone())
    }

    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) {
        let mut map = self.map.write().await;
        if map.len() > 4_096 {
            let now = Instant::now();
            map.retain(|_, e| e.expires_at.is_none_or(|at| at > now));
        }
        map.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: ttl.map(|d| Instant::now() + d),
            },
        );
    }

    async fn delete(&self, key: &str) {
        self.map.write().await.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let kv = MemoryKv::new();
        kv.put("a", "1".to_string(), None).await;
        assert_eq!(kv.get("a").await.as_deref(), Some("1"));
        kv.delete("a").await;
        assert_eq!(kv.get("a").await, None);
    }

    #[tokio::test]
    async fn expired_entries_read_as_missing() {
        let kv = MemoryKv::new();
        kv.put("t", "x".to_string(), Some(Duration::from_millis(10)))
            .await;
        assert!(kv.get("t").await.is_some());
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(kv.get("t").await, None);
    }
}
