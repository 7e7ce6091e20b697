// crates/transcribe/src/http.rs

use async_trait::async_trait;
use livecap_core::{LivecapError, LivecapResult};
use reqwest::Client;
use serde_json::Value;

use crate::{TranscriberConfig, TranscriptionBackend};

/// HTTP speech-to-text backend. POSTs raw audio bytes to the configured
/// endpoint and expects a JSON body with a `text` field.
pub struct HttpTranscriptionBackend {
    endpoint: String,
    client: Client,
}

impl HttpTranscriptionBackend {
    pub fn new(config: &TranscriberConfig) -> LivecapResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| LivecapError::Network(e.to_string()))?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            client,
        })
    }
}

#[async_trait]
impl TranscriptionBackend for HttpTranscriptionBackend {
    async fn transcribe(&self, audio: &[u8], language: &str) -> LivecapResult<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("language", language)])
            .header("Content-Type", "application/octet-stream")
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| LivecapError::Network(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LivecapError::Transcription(format!(
                "API error {}: {}",
                status, text
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| LivecapError::Transcription(format!("Failed to parse response: {}", e)))?;

        Ok(json["text"].as_str().unwrap_or("").trim().to_string())
    }
}
