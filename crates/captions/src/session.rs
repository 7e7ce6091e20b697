// crates/captions/src/session.rs

use bytes::Bytes;
use livecap_core::{CaptionSegment, CaptionStyle};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Options supplied at session start. Absent fields fall back to the
/// service defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionOptions {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub target_languages: Vec<String>,
    #[serde(default)]
    pub style: Option<CaptionStyle>,
}

/// One live meeting's caption state, exclusively owned by the service
/// process. Removed from the registry on session end; only per-segment
/// copies survive in durable storage.
pub struct CaptionSession {
    pub session_id: String,
    pub language: String,
    pub target_languages: Vec<String>,
    pub style: CaptionStyle,
    pub speaker_colors: HashMap<String, String>,
    pub segments: Vec<CaptionSegment>,
    audio_buffer: Vec<Bytes>,
    buffered_bytes: usize,
}

impl CaptionSession {
    pub fn new(session_id: impl Into<String>, options: SessionOptions, default_language: &str) -> Self {
        let mut target_languages = Vec::new();
        for language in options.target_languages {
            if !target_languages.contains(&language) {
                target_languages.push(language);
            }
        }

        Self {
            session_id: session_id.into(),
            language: options
                .language
                .unwrap_or_else(|| default_language.to_string()),
            target_languages,
            style: options.style.unwrap_or_default(),
            speaker_colors: HashMap::new(),
            segments: Vec::new(),
            audio_buffer: Vec::new(),
            buffered_bytes: 0,
        }
    }

    /// Append a raw audio fragment; returns the cumulative buffered byte
    /// length.
    pub fn push_audio(&mut self, chunk: Bytes) -> usize {
        self.buffered_bytes += chunk.len();
        self.audio_buffer.push(chunk);
        self.buffered_bytes
    }

    pub fn buffered_bytes(&self) -> usize {
        self.buffered_bytes
    }

    /// Concatenate and clear the transient buffer.
    pub fn drain_audio(&mut self) -> Vec<u8> {
        let mut blob = Vec::with_capacity(self.buffered_bytes);
        for chunk in self.audio_buffer.drain(..) {
            blob.extend_from_slice(&chunk);
        }
        self.buffered_bytes = 0;
        blob
    }

    /// Returns false when the language was already targeted.
    pub fn add_target_language(&mut self, language: &str) -> bool {
        if self.target_languages.iter().any(|l| l == language) {
            return false;
        }
        self.target_languages.push(language.to_string());
        true
    }

    /// Returns false when the language was not targeted.
    pub fn remove_target_language(&mut self, language: &str) -> bool {
        let before = self.target_languages.len();
        self.target_languages.retain(|l| l != language);
        self.target_languages.len() != before
    }

    /// The last `limit` segments in chronological order.
    pub fn last_segments(&self, limit: usize) -> Vec<CaptionSegment> {
        let start = self.segments.len().saturating_sub(limit);
        self.segments[start..].to_vec()
    }
}
