use async_trait::async_trait;
use serde_json::Value;

/// The one thing the Durable batch-save path needs from the Stream
/// Manager: a way to enqueue a change event without depending on the
/// whole streams crate. Implemented by `worldgate-streams::StreamManager`.
#[async_trait]
pub trait ChangeEventSink: Send + Sync {
    async fn enqueue_change(&self, stream_key: &str, payload: Value);
}
