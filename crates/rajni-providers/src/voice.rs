//! Speech gateways: Whisper transcription and TTS synthesis.
//!
//! Pure pass-through wrappers — no retry, no local fallback.

use async_trait::async_trait;
use rajni_core::{config::OpenAiConfig, error::RajniError, traits::SpeechService};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Transcription API response.
#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Speech gateway backed by the OpenAI audio endpoints.
pub struct OpenAiSpeech {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    transcribe_model: String,
    tts_model: String,
    tts_voice: String,
}

impl OpenAiSpeech {
    /// Create from config values and the API key.
    pub fn from_config(config: &OpenAiConfig, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            transcribe_model: config.transcribe_model.clone(),
            tts_model: config.tts_model.clone(),
            tts_voice: config.tts_voice.clone(),
        }
    }
}

#[async_trait]
impl SpeechService for OpenAiSpeech {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, RajniError> {
        debug!("speech: transcribing {} bytes", audio.len());

        let part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name("audio.webm")
            .mime_str("audio/webm")
            .map_err(|e| RajniError::Provider(format!("transcription mime error: {e}")))?;

        let form = reqwest::multipart::Form::new()
            .text("model", self.transcribe_model.clone())
            .part("file", part);

        let resp = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| RajniError::Provider(format!("transcription request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RajniError::Provider(format!(
                "transcription API error {status}: {body}"
            )));
        }

        let result: TranscriptionResponse = resp
            .json()
            .await
            .map_err(|e| RajniError::Provider(format!("transcription parse failed: {e}")))?;

        Ok(result.text)
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, RajniError> {
        debug!("speech: synthesizing {} chars", text.len());

        let body = json!({
            "model": self.tts_model,
            "voice": self.tts_voice,
            "input": text,
        });

        let resp = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RajniError::Provider(format!("synthesis request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RajniError::Provider(format!(
                "synthesis API error {status}: {body}"
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| RajniError::Provider(format!("synthesis read failed: {e}")))?;

        Ok(bytes.to_vec())
    }
}
