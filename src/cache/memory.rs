use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;

use super::{CacheResult, LiveCache};

/// In-memory [`LiveCache`] for tests and cache-less development runs.
#[derive(Clone, Default)]
pub struct MemoryLiveCache {
    entries: Arc<DashMap<String, String>>,
}

impl MemoryLiveCache {
    /// Fresh, empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently present, for test assertions.
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl LiveCache for MemoryLiveCache {
    fn get(&self, key: String) -> BoxFuture<'static, CacheResult<Option<String>>> {
        let cache = self.clone();
        Box::pin(async move { Ok(cache.entries.get(&key).map(|entry| entry.clone())) })
    }

    fn set(&self, key: String, value: String) -> BoxFuture<'static, CacheResult<()>> {
        let cache = self.clone();
        Box::pin(async move {
            cache.entries.insert(key, value);
            Ok(())
        })
    }

    fn del(&self, key: String) -> BoxFuture<'static, CacheResult<()>> {
        let cache = self.clone();
        Box::pin(async move {
            cache.entries.remove(&key);
            Ok(())
        })
    }
}
