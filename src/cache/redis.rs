use futures::future::BoxFuture;
use redis::AsyncCommands;

use super::{CacheError, CacheResult, LiveCache};

/// Redis-backed [`LiveCache`] using a multiplexed async connection.
#[derive(Clone)]
pub struct RedisLiveCache {
    client: redis::Client,
}

impl RedisLiveCache {
    /// Build a client for the given connection URL.
    ///
    /// The connection itself is established lazily per command.
    pub fn connect(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|source| CacheError::unavailable(format!("opening `{url}`"), source))?;
        Ok(Self { client })
    }

    async fn connection(&self) -> CacheResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|source| CacheError::unavailable("connecting to redis".into(), source))
    }
}

impl LiveCache for RedisLiveCache {
    fn get(&self, key: String) -> BoxFuture<'static, CacheResult<Option<String>>> {
        let cache = self.clone();
        Box::pin(async move {
            let mut connection = cache.connection().await?;
            connection
                .get::<_, Option<String>>(&key)
                .await
                .map_err(|source| CacheError::unavailable(format!("GET `{key}`"), source))
        })
    }

    fn set(&self, key: String, value: String) -> BoxFuture<'static, CacheResult<()>> {
        let cache = self.clone();
        Box::pin(async move {
            let mut connection = cache.connection().await?;
            connection
                .set::<_, _, ()>(&key, value)
                .await
                .map_err(|source| CacheError::unavailable(format!("SET `{key}`"), source))
        })
    }

    fn del(&self, key: String) -> BoxFuture<'static, CacheResult<()>> {
        let cache = self.clone();
        Box::pin(async move {
            let mut connection = cache.connection().await?;
            connection
                .del::<_, ()>(&key)
                .await
                .map_err(|source| CacheError::unavailable(format!("DEL `{key}`"), source))
        })
    }
}
