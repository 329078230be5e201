use async_trait::async_trait;

/// The one thing the Ephemeral load path needs from the Stream Manager:
/// whatever world instance currently owns a stream's affinity, so a load
/// response can be augmented with it. Kept here rather than in
/// `worldgate-streams` so `worldgate-ephemeral` doesn't need to depend on
/// the whole streams crate for one lookup.
#[async_trait]
pub trait AffinityLookup: Send + Sync {
    async fn get_affinity(&self, stream_key: &str) -> Option<String>;
}
