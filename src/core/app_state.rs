use std::sync::Arc;

use crate::cache::CacheStore;
use crate::search::engines::{self, Engine};
use crate::store::{KvStore, MemoryKv, RecordStore};

#[derive(Clone)]
pub struct AppState {
    pub http_client: reqwest::Client,
    pub engines: Arc<Vec<Arc<dyn Engine>>>,
    pub kv: Arc<dyn KvStore>,
    pub cache: CacheStore,
    pub records: RecordStore,
    // In-process memos (bounded, TTL'd) — cheap lookups that sit in front of
    // the KV-backed cache spaces.
    pub rate_memo: moka::future::Cache<String, f64>,
    pub vqd_memo: moka::future::Cache<String, String>,
    // Concurrency control for outbound fan-out.
    pub outbound_limit: Arc<tokio::sync::Semaphore>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("engines", &self.engines.len())
            .finish()
    }
}

impl AppState {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self::with_kv(http_client, Arc::new(MemoryKv::new()))
    }

    pub fn with_kv(http_client: reqwest::Client, kv: Arc<dyn KvStore>) -> Self {
        Self {
            http_client,
            engines: Arc::new(engines::registry()),
            cache: CacheStore::new(kv.clone()),
            records: RecordStore::new(kv.clone()),
            kv,
            rate_memo: moka::future::Cache::builder()
                .max_capacity(1_000)
                .time_to_live(std::time::Duration::from_secs(60 * 60))
                .build(),
            vqd_memo: moka::future::Cache::builder()
                .max_capacity(1_000)
                .time_to_live(std::time::Duration::from_secs(60 * 10))
                .build(),
            outbound_limit: Arc::new(tokio::sync::Semaphore::new(
                super::config::outbound_limit(),
            )),
        }
    }
}
