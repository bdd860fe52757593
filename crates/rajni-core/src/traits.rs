use crate::{context::Context, error::RajniError};
use async_trait::async_trait;
use serde_json::Value;

/// Completion provider trait — the brain.
///
/// The API server and CLI talk to the model through this seam so tests can
/// substitute a canned implementation.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Send a windowed conversation context and get the assistant reply.
    ///
    /// A successful call with empty content degrades to a fallback string
    /// inside the implementation; only transport/provider failures error.
    async fn complete(&self, context: &Context) -> Result<String, RajniError>;

    /// Check if the provider is reachable and ready.
    async fn is_available(&self) -> bool;
}

/// Speech service trait — transcription and synthesis pass-throughs.
#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Raw audio bytes to text.
    async fn transcribe(&self, audio: &[u8]) -> Result<String, RajniError>;

    /// Text to audio bytes (MPEG).
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, RajniError>;
}

/// Keyed-record store trait — one storage-shape record per (table, user key).
#[async_trait]
pub trait KeyedStore: Send + Sync {
    /// Read the record for a key. `Ok(None)` means no record exists — a
    /// distinct, non-fatal outcome.
    async fn fetch(&self, table: &str, user_key: &str) -> Result<Option<Value>, RajniError>;

    /// Insert or overwrite the full record for a key (last-write-wins).
    async fn upsert(
        &self,
        table: &str,
        user_key: &str,
        record: Value,
    ) -> Result<Value, RajniError>;
}
