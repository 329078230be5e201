use crate::backend::LockBackend;
use crate::error::LockError;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Script;
use std::time::Duration;
use tokio::sync::Mutex;

/// The compare-and-delete is the one operation that needs atomicity
/// Redis's command set doesn't give us directly, so it's a tiny Lua
/// script run through `EVAL` — the same compare-and-delete pattern used
/// for the ephemeral flush fence.
const COMPARE_AND_DELETE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

pub struct RedisLockBackend {
    conn: Mutex<ConnectionManager>,
    script: Script,
}

impl RedisLockBackend {
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn: Mutex::new(conn),
            script: Script::new(COMPARE_AND_DELETE_SCRIPT),
        }
    }
}

#[async_trait]
impl LockBackend for RedisLockBackend {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, LockError> {
        let mut conn = self.conn.lock().await;
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut *conn)
            .await
            .map_err(|e| LockError::Backend(e.to_string()))?;
        Ok(result.is_some())
    }

    async fn compare_and_delete(&self, key: &str, value: &str) -> Result<bool, LockError> {
        let mut conn = self.conn.lock().await;
        let deleted: i64 = self
            .script
            .key(key)
            .arg(value)
            .invoke_async(&mut *conn)
            .await
            .map_err(|e| LockError::Backend(e.to_string()))?;
        Ok(deleted == 1)
    }
}
