use crate::backend::CacheBackend;
use crate::error::CacheError;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tokio::sync::Mutex;

pub struct RedisCacheBackend {
    conn: Mutex<ConnectionManager>,
}

impl RedisCacheBackend {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn: Mutex::new(conn) }
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.conn.lock().await;
        conn.get(key).await.map_err(|e| CacheError::L2(e.to_string()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.lock().await;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
            .map_err(|e| CacheError::L2(e.to_string()))
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>, CacheError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.lock().await;
        conn.get(keys).await.map_err(|e| CacheError::L2(e.to_string()))
    }

    async fn mset(&self, entries: &[(String, Vec<u8>)], ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.lock().await;
        let mut pipe = redis::pipe();
        for (key, value) in entries {
            pipe.set_ex(key, value, ttl.as_secs().max(1));
        }
        pipe.query_async::<_, ()>(&mut *conn).await.map_err(|e| CacheError::L2(e.to_string()))
    }

    async fn del_many(&self, keys: &[String]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock().await;
        conn.del::<_, ()>(keys).await.map_err(|e| CacheError::L2(e.to_string()))
    }
}
