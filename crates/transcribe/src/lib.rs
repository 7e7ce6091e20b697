// crates/transcribe/src/lib.rs

use std::time::{Duration, Instant};

use async_trait::async_trait;
use livecap_core::{LivecapError, LivecapResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

mod http;

pub use http::HttpTranscriptionBackend;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    #[serde(default = "TranscriberConfig::default_endpoint")]
    pub endpoint: String,
    #[serde(default = "TranscriberConfig::default_language")]
    pub default_language: String,
    #[serde(default = "TranscriberConfig::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "TranscriberConfig::default_retry_attempts")]
    pub retry_attempts: usize,
    #[serde(default = "TranscriberConfig::default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl TranscriberConfig {
    fn default_endpoint() -> String {
        "http://127.0.0.1:8081/transcribe".to_string()
    }

    fn default_language() -> String {
        "en".to_string()
    }

    fn default_request_timeout_ms() -> u64 {
        15_000
    }

    fn default_retry_attempts() -> usize {
        1
    }

    fn default_retry_backoff_ms() -> u64 {
        200
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn validate(&self) -> LivecapResult<()> {
        if self.endpoint.trim().is_empty() {
            return Err(LivecapError::Config(
                "Transcriber endpoint must not be empty".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(LivecapError::Config(
                "Transcriber request timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            default_language: Self::default_language(),
            request_timeout_ms: Self::default_request_timeout_ms(),
            retry_attempts: Self::default_retry_attempts(),
            retry_backoff_ms: Self::default_retry_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TranscriberMetrics {
    pub total_processed: u64,
    pub total_errors: u64,
    pub total_timeouts: u64,
    pub total_retries: u64,
    pub cumulative_processing_time: Duration,
    pub last_processing_time: Option<Duration>,
}

impl TranscriberMetrics {
    pub fn average_processing_time(&self) -> Option<Duration> {
        if self.total_processed == 0 {
            return None;
        }
        Some(self.cumulative_processing_time / self.total_processed as u32)
    }
}

/// Speech-to-text boundary. Implementations map opaque audio bytes plus an
/// ISO language code (or "auto") to plain UTF-8 text.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    async fn transcribe(&self, audio: &[u8], language: &str) -> LivecapResult<String>;
}

type BackendHandle = Box<dyn TranscriptionBackend>;

/// Wraps a [`TranscriptionBackend`] with an explicit per-request timeout
/// and bounded retries. Failure is never surfaced to callers as an error:
/// after exhausting retries the transcriber logs and returns an empty
/// string, which callers treat the same as "no speech detected".
pub struct Transcriber {
    config: TranscriberConfig,
    backend: BackendHandle,
    metrics: RwLock<TranscriberMetrics>,
}

impl Transcriber {
    pub fn new(config: TranscriberConfig) -> LivecapResult<Self> {
        config.validate()?;
        let backend = Box::new(HttpTranscriptionBackend::new(&config)?);
        Ok(Self {
            config,
            backend,
            metrics: RwLock::new(TranscriberMetrics::default()),
        })
    }

    pub fn with_backend(config: TranscriberConfig, backend: BackendHandle) -> Self {
        Self {
            config,
            backend,
            metrics: RwLock::new(TranscriberMetrics::default()),
        }
    }

    pub async fn transcribe(&self, audio: &[u8], language: &str) -> String {
        let mut attempt = 0usize;

        loop {
            let start = Instant::now();
            let response = timeout(
                self.config.request_timeout(),
                self.backend.transcribe(audio, language),
            )
            .await;

            match response {
                Ok(Ok(text)) => {
                    let elapsed = start.elapsed();
                    let mut metrics = self.metrics.write();
                    metrics.total_processed += 1;
                    metrics.last_processing_time = Some(elapsed);
                    metrics.cumulative_processing_time += elapsed;
                    metrics.total_retries += attempt as u64;
                    debug!(
                        "Transcribed {} bytes in {:.0}ms",
                        audio.len(),
                        elapsed.as_secs_f64() * 1000.0
                    );
                    return text;
                }
                Ok(Err(err)) => {
                    self.metrics.write().total_errors += 1;
                    if attempt >= self.config.retry_attempts {
                        self.metrics.write().total_retries += attempt as u64;
                        warn!("Transcription failed, dropping chunk: {}", err);
                        return String::new();
                    }
                    attempt += 1;
                    sleep(self.config.retry_backoff()).await;
                }
                Err(_) => {
                    self.metrics.write().total_timeouts += 1;
                    if attempt >= self.config.retry_attempts {
                        self.metrics.write().total_retries += attempt as u64;
                        warn!(
                            "Transcription timed out after {}ms, dropping chunk",
                            self.config.request_timeout_ms
                        );
                        return String::new();
                    }
                    attempt += 1;
                    sleep(self.config.retry_backoff()).await;
                }
            }
        }
    }

    pub fn get_metrics(&self) -> TranscriberMetrics {
        self.metrics.read().clone()
    }
}
