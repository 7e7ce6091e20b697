// crates/core/src/caption.rs

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One finalized caption unit with timing and optional speaker attribution.
///
/// Segments are immutable once created; a session's segment sequence is
/// append-only for the lifetime of the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionSegment {
    pub id: String,
    pub session_id: String,
    pub text: String,
    pub speaker: Option<String>,
    pub confidence: f32,
    pub timestamp_ms: i64,
    pub is_final: bool,
    pub language: String,
}

impl CaptionSegment {
    pub fn new(
        session_id: impl Into<String>,
        text: impl Into<String>,
        language: impl Into<String>,
        speaker: Option<String>,
        confidence: f32,
    ) -> Self {
        let timestamp_ms = Utc::now().timestamp_millis();
        Self {
            id: segment_id(timestamp_ms),
            session_id: session_id.into(),
            text: text.into(),
            speaker,
            confidence,
            timestamp_ms,
            // No partial/streaming ASR result is modeled, so every
            // segment that reaches the store is final.
            is_final: true,
            language: language.into(),
        }
    }
}

/// Opaque segment id derived from capture time plus a random suffix.
pub fn segment_id(timestamp_ms: i64) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", timestamp_ms, &suffix[..8])
}

/// Caption overlay placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionPosition {
    Top,
    Bottom,
}

/// Presentation-only caption configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionStyle {
    #[serde(default = "CaptionStyle::default_font_size")]
    pub font_size: u32,
    #[serde(default = "CaptionStyle::default_position")]
    pub position: CaptionPosition,
    #[serde(default = "CaptionStyle::default_text_color")]
    pub text_color: String,
    #[serde(default = "CaptionStyle::default_background_color")]
    pub background_color: String,
    #[serde(default = "CaptionStyle::default_opacity")]
    pub opacity: f32,
}

impl CaptionStyle {
    fn default_font_size() -> u32 {
        16
    }

    fn default_position() -> CaptionPosition {
        CaptionPosition::Bottom
    }

    fn default_text_color() -> String {
        "#ffffff".to_string()
    }

    fn default_background_color() -> String {
        "#000000".to_string()
    }

    fn default_opacity() -> f32 {
        0.8
    }
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_size: Self::default_font_size(),
            position: Self::default_position(),
            text_color: Self::default_text_color(),
            background_color: Self::default_background_color(),
            opacity: Self::default_opacity(),
        }
    }
}
