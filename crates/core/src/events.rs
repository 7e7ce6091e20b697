// crates/core/src/events.rs

use serde::{Deserialize, Serialize};

use crate::caption::{CaptionSegment, CaptionStyle};
use crate::sentiment::{SentimentAlert, SentimentPoint};

/// Wire protocol version carried in every event envelope.
pub const PROTOCOL_VERSION: u8 = 1;

/// Server-side events pushed to a session's subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SessionEvent {
    SessionStarted {
        session_id: String,
        language: String,
    },
    SessionEnded {
        session_id: String,
        total_segments: usize,
    },
    CaptionCreated {
        segment: CaptionSegment,
    },
    StyleUpdated {
        session_id: String,
        style: CaptionStyle,
    },
    SpeakerColorSet {
        session_id: String,
        speaker: String,
        color: String,
    },
    TargetLanguageAdded {
        session_id: String,
        language: String,
    },
    TargetLanguageRemoved {
        session_id: String,
        language: String,
    },
    SentimentPoint {
        session_id: String,
        point: SentimentPoint,
    },
    AlertCreated {
        alert: SentimentAlert,
    },
}

#[derive(Serialize)]
struct EventEnvelope<'a> {
    v: u8,
    #[serde(flatten)]
    event: &'a SessionEvent,
}

impl SessionEvent {
    /// JSON envelope of shape `{"v": 1, "type": "...", ...payload}`.
    pub fn to_wire(&self) -> serde_json::Result<String> {
        serde_json::to_string(&EventEnvelope {
            v: PROTOCOL_VERSION,
            event: self,
        })
    }
}

/// Control messages received from clients over the fan-out channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    Join { session_id: String },
    Leave,
    UpdateStyle { style: CaptionStyle },
    AddLanguage { language: String },
    RemoveLanguage { language: String },
    Ping,
}
