use crate::backend::EphemeralBackend;
use crate::error::EphemeralError;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;

const CONDITIONAL_DELETE_SCRIPT: &str = r#"
local current = tonumber(redis.call("GET", KEYS[2]))
if current == nil or current <= tonumber(ARGV[1]) then
    redis.call("DEL", KEYS[1])
    redis.call("DEL", KEYS[2])
    return 1
end
return 0
"#;

fn to_err(e: redis::RedisError) -> EphemeralError {
    EphemeralError::Backend(e.to_string())
}

pub struct RedisEphemeralBackend {
    conn: Mutex<ConnectionManager>,
    script: redis::Script,
}

impl RedisEphemeralBackend {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn: Mutex::new(conn), script: redis::Script::new(CONDITIONAL_DELETE_SCRIPT) }
    }
}

#[async_trait]
impl EphemeralBackend for RedisEphemeralBackend {
    async fn exists_many(&self, keys: &[String]) -> Result<Vec<bool>, EphemeralError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.lock().await;
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.exists(key);
        }
        let results: Vec<bool> = pipe.query_async(&mut *conn).await.map_err(to_err)?;
        Ok(results)
    }

    async fn get_documents(&self, keys: &[String]) -> Result<Vec<Option<Value>>, EphemeralError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.lock().await;
        let raw: Vec<Option<String>> = conn.get(keys).await.map_err(to_err)?;
        Ok(raw.into_iter().map(|opt| opt.and_then(|s| serde_json::from_str(&s).ok())).collect())
    }

    async fn put_document(&self, key: &str, doc: &Value) -> Result<(), EphemeralError> {
        let mut conn = self.conn.lock().await;
        let serialized = serde_json::to_string(doc).map_err(|e| EphemeralError::Backend(e.to_string()))?;
        conn.set::<_, _, ()>(key, serialized).await.map_err(to_err)
    }

    async fn delete_document(&self, key: &str) -> Result<(), EphemeralError> {
        let mut conn = self.conn.lock().await;
        conn.del::<_, ()>(key).await.map_err(to_err)
    }

    async fn incr_counter(&self, counter_key: &str) -> Result<u64, EphemeralError> {
        let mut conn = self.conn.lock().await;
        conn.incr(counter_key, 1u64).await.map_err(to_err)
    }

    async fn delete_counter(&self, counter_key: &str) -> Result<(), EphemeralError> {
        let mut conn = self.conn.lock().await;
        conn.del::<_, ()>(counter_key).await.map_err(to_err)
    }

    async fn copy_snapshot(&self, doc: &Value, snapshot_key: &str, ttl: Duration) -> Result<bool, EphemeralError> {
        let mut conn = self.conn.lock().await;
        let serialized = serde_json::to_string(doc).map_err(|e| EphemeralError::Backend(e.to_string()))?;
        match conn.set_ex::<_, _, ()>(snapshot_key, serialized, ttl.as_secs().max(1)).await {
            Ok(()) => Ok(true),
            Err(e) => {
                tracing::warn!(snapshot_key, error = %e, "versioned snapshot copy failed");
                Ok(false)
            }
        }
    }

    async fn get_snapshots(&self, keys: &[String]) -> Result<Vec<Option<Value>>, EphemeralError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.lock().await;
        let raw: Vec<Option<String>> = conn.get(keys).await.map_err(to_err)?;
        Ok(raw.into_iter().map(|opt| opt.and_then(|s| serde_json::from_str(&s).ok())).collect())
    }

    async fn dirty_add(&self, set_key: &str, member: &str) -> Result<(), EphemeralError> {
        let mut conn = self.conn.lock().await;
        conn.sadd::<_, _, ()>(set_key, member).await.map_err(to_err)
    }

    async fn dirty_sample(&self, set_key: &str, n: usize) -> Result<Vec<String>, EphemeralError> {
        let mut conn = self.conn.lock().await;
        conn.srandmember_multiple(set_key, n).await.map_err(to_err)
    }

    async fn dirty_count(&self, set_key: &str) -> Result<u64, EphemeralError> {
        let mut conn = self.conn.lock().await;
        conn.scard(set_key).await.map_err(to_err)
    }

    async fn dirty_remove(&self, set_key: &str, members: &[String]) -> Result<(), EphemeralError> {
        if members.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock().await;
        conn.srem::<_, _, ()>(set_key, members).await.map_err(to_err)
    }

    async fn conditional_delete(
        &self,
        key: &str,
        counter_key: &str,
        persisted_version: u64,
    ) -> Result<bool, EphemeralError> {
        let mut conn = self.conn.lock().await;
        let deleted: i64 = self
            .script
            .key(key)
            .key(counter_key)
            .arg(persisted_version)
            .invoke_async(&mut *conn)
            .await
            .map_err(to_err)?;
        Ok(deleted == 1)
    }
}
