use crate::backend::StreamBackend;
use crate::error::StreamError;
use crate::models::StreamEntry;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::streams::StreamRangeReply;
use redis::{AsyncCommands, Script};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;

/// Claiming affinity needs the same read-then-conditionally-write
/// atomicity as the lock's compare-and-delete, so it's a small Lua script
/// rather than a GET followed by a racy SET.
const CLAIM_AFFINITY_SCRIPT: &str = r#"
local current = redis.call("GET", KEYS[1])
if current == false or current == ARGV[1] then
    redis.call("SET", KEYS[1], ARGV[1], "EX", ARGV[2])
    return ARGV[1]
else
    return current
end
"#;

pub struct RedisStreamBackend {
    conn: Mutex<ConnectionManager>,
    claim_script: Script,
}

impl RedisStreamBackend {
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn: Mutex::new(conn),
            claim_script: Script::new(CLAIM_AFFINITY_SCRIPT),
        }
    }
}

#[async_trait]
impl StreamBackend for RedisStreamBackend {
    async fn append_batch(&self, entries: &[(String, Value)], ttl: Duration) -> Result<(), StreamError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock().await;
        let mut pipe = redis::pipe();
        for (stream_key, payload) in entries {
            let serialized = serde_json::to_string(payload).map_err(|e| StreamError::Backend(e.to_string()))?;
            let timestamp = chrono::Utc::now().timestamp_millis();
            pipe.cmd("XADD")
                .arg(stream_key)
                .arg("*")
                .arg("data")
                .arg(serialized)
                .arg("timestamp")
                .arg(timestamp)
                .ignore();
            pipe.cmd("EXPIRE").arg(stream_key).arg(ttl.as_secs()).ignore();
        }
        pipe.query_async(&mut *conn).await.map_err(|e| StreamError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn pull_range(&self, stream_key: &str, from: &str, count: usize) -> Result<Vec<StreamEntry>, StreamError> {
        let mut conn = self.conn.lock().await;
        let reply: StreamRangeReply = conn
            .xrange_count(stream_key, from, "+", count)
            .await
            .map_err(|e| StreamError::Backend(e.to_string()))?;

        let mut entries = Vec::with_capacity(reply.ids.len());
        for id in reply.ids {
            let data_raw: String = id.get("data").unwrap_or_default();
            let timestamp: i64 = id.get("timestamp").unwrap_or_default();
            let data: Value = serde_json::from_str(&data_raw).unwrap_or(Value::Null);
            entries.push(StreamEntry { data, timestamp });
        }
        Ok(entries)
    }

    async fn get_affinity(&self, stream_key: &str) -> Result<Option<String>, StreamError> {
        let mut conn = self.conn.lock().await;
        let affinity_key = worldgate_core::keygen::stream_affinity_key(stream_key);
        conn.get(affinity_key).await.map_err(|e| StreamError::Backend(e.to_string()))
    }

    async fn claim_affinity(&self, stream_key: &str, world_instance_id: &str, ttl: Duration) -> Result<String, StreamError> {
        let mut conn = self.conn.lock().await;
        let affinity_key = worldgate_core::keygen::stream_affinity_key(stream_key);
        self.claim_script
            .key(affinity_key)
            .arg(world_instance_id)
            .arg(ttl.as_secs())
            .invoke_async(&mut *conn)
            .await
            .map_err(|e| StreamError::Backend(e.to_string()))
    }
}
