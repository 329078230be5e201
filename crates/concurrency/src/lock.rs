use crate::backend::LockBackend;
use crate::error::LockError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// A holder value uniquely identifying one lock acquisition, returned by
/// `acquire` and required by `release`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holder(pub String);

impl Holder {
    fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Thin wrapper over a `LockBackend` exposing acquire/release/with_lock.
/// State machine per lock: Unowned -> Owned(holder,
/// expiresAt) -> Unowned, via release or TTL expiration. No renewals.
pub struct Lock {
    backend: Arc<dyn LockBackend>,
}

impl Lock {
    pub fn new(backend: Arc<dyn LockBackend>) -> Self {
        Self { backend }
    }

    /// Atomic "set if absent with expiry". Returns the holder value on
    /// success, `None` if another owner currently holds the lock.
    pub async fn acquire(&self, key: &str, ttl: Duration) -> Result<Option<Holder>, LockError> {
        let holder = Holder::generate();
        if self.backend.set_if_absent(key, &holder.0, ttl).await? {
            Ok(Some(holder))
        } else {
            Ok(None)
        }
    }

    /// Deletes `key` only if it currently equals `holder`'s value.
    pub async fn release(&self, key: &str, holder: &Holder) -> Result<(), LockError> {
        self.backend.compare_and_delete(key, &holder.0).await?;
        Ok(())
    }

    /// Scoped acquisition with guaranteed release on every exit path,
    /// including a panicking `fn`. Returns `Err(LockError::Contention)`
    /// without running `fn` if the lock could not be acquired.
    pub async fn with_lock<F, Fut, T>(&self, key: &str, ttl: Duration, fn_: F) -> Result<T, LockError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let holder = self.acquire(key, ttl).await?.ok_or(LockError::Contention)?;

        // Run the guarded work, releasing the lock on every path out —
        // including a panic inside `fn_`, via the drop guard below.
        struct ReleaseGuard<'a> {
            lock: &'a Lock,
            key: &'a str,
            holder: Option<Holder>,
        }
        impl Drop for ReleaseGuard<'_> {
            fn drop(&mut self) {
                if let Some(holder) = self.holder.take() {
                    let lock = self.lock.backend.clone();
                    let key = self.key.to_string();
                    tokio::spawn(async move {
                        let _ = lock.compare_and_delete(&key, &holder.0).await;
                    });
                }
            }
        }
        let mut guard = ReleaseGuard {
            lock: self,
            key,
            holder: Some(holder.clone()),
        };

        let result = fn_().await;
        // Normal path: release synchronously instead of relying on the
        // spawned drop-time release, then disarm the guard.
        self.release(key, &holder).await?;
        guard.holder = None;
        Ok(result)
    }

    /// Retries `acquire` up to `max_retries` times, sleeping `delay`
    /// between attempts.
    pub async fn acquire_with_retry(
        &self,
        key: &str,
        ttl: Duration,
        max_retries: u32,
        delay: Duration,
    ) -> Result<Holder, LockError> {
        for attempt in 0..=max_retries {
            if let Some(holder) = self.acquire(key, ttl).await? {
                return Ok(holder);
            }
            if attempt < max_retries {
                tokio::time::sleep(delay).await;
            }
        }
        Err(LockError::Contention)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LockBackend;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeLockBackend {
        values: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl LockBackend for FakeLockBackend {
        async fn set_if_absent(&self, key: &str, value: &str, _ttl: Duration) -> Result<bool, LockError> {
            let mut values = self.values.lock().unwrap();
            if values.contains_key(key) {
                Ok(false)
            } else {
                values.insert(key.to_string(), value.to_string());
                Ok(true)
            }
        }

        async fn compare_and_delete(&self, key: &str, value: &str) -> Result<bool, LockError> {
            let mut values = self.values.lock().unwrap();
            if values.get(key).map(|v| v.as_str()) == Some(value) {
                values.remove(key);
                Ok(true)
            } else {
                Ok(false)
            }
        }
    }

    #[tokio::test]
    async fn acquire_then_acquire_again_contends() {
        let lock = Lock::new(Arc::new(FakeLockBackend::default()));
        let first = lock.acquire("bg:lock", Duration::from_secs(10)).await.unwrap();
        assert!(first.is_some());
        let second = lock.acquire("bg:lock", Duration::from_secs(10)).await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn release_only_succeeds_for_matching_holder() {
        let backend = Arc::new(FakeLockBackend::default());
        let lock = Lock::new(backend.clone());
        let holder = lock.acquire("bg:lock", Duration::from_secs(10)).await.unwrap().unwrap();
        let other = Holder("not-the-holder".into());
        // Releasing with the wrong holder is a no-op, not an error.
        lock.release("bg:lock", &other).await.unwrap();
        assert!(backend.values.lock().unwrap().contains_key("bg:lock"));

        lock.release("bg:lock", &holder).await.unwrap();
        assert!(!backend.values.lock().unwrap().contains_key("bg:lock"));
    }

    #[tokio::test]
    async fn with_lock_releases_after_fn_completes() {
        let backend = Arc::new(FakeLockBackend::default());
        let lock = Lock::new(backend.clone());
        let result = lock.with_lock("bg:lock", Duration::from_secs(10), || async { 7 }).await.unwrap();
        assert_eq!(result, 7);
        assert!(!backend.values.lock().unwrap().contains_key("bg:lock"));
    }
}
