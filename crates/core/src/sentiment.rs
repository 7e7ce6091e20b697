// crates/core/src/sentiment.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-utterance sentiment scores. `overall` is in [-1, 1], the three
/// class scores are in [0, 1] and need not sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub positive: f32,
    pub negative: f32,
    pub neutral: f32,
    pub overall: f32,
}

/// Fixed enumeration order of the emotion dimensions. Tie-breaking for
/// the dominant emotion follows this order.
pub const EMOTION_DIMENSIONS: [&str; 8] = [
    "joy",
    "sadness",
    "anger",
    "fear",
    "surprise",
    "trust",
    "anticipation",
    "disgust",
];

/// Eight-dimension emotion vector, each dimension in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EmotionVector {
    #[serde(default)]
    pub joy: f32,
    #[serde(default)]
    pub sadness: f32,
    #[serde(default)]
    pub anger: f32,
    #[serde(default)]
    pub fear: f32,
    #[serde(default)]
    pub surprise: f32,
    #[serde(default)]
    pub trust: f32,
    #[serde(default)]
    pub anticipation: f32,
    #[serde(default)]
    pub disgust: f32,
}

impl EmotionVector {
    /// Dimension values in the fixed enumeration order.
    pub fn values(&self) -> [f32; 8] {
        [
            self.joy,
            self.sadness,
            self.anger,
            self.fear,
            self.surprise,
            self.trust,
            self.anticipation,
            self.disgust,
        ]
    }

    pub fn add_assign(&mut self, other: &EmotionVector) {
        self.joy += other.joy;
        self.sadness += other.sadness;
        self.anger += other.anger;
        self.fear += other.fear;
        self.surprise += other.surprise;
        self.trust += other.trust;
        self.anticipation += other.anticipation;
        self.disgust += other.disgust;
    }

    pub fn scale(&self, factor: f32) -> EmotionVector {
        EmotionVector {
            joy: self.joy * factor,
            sadness: self.sadness * factor,
            anger: self.anger * factor,
            fear: self.fear * factor,
            surprise: self.surprise * factor,
            trust: self.trust * factor,
            anticipation: self.anticipation * factor,
            disgust: self.disgust * factor,
        }
    }

    /// The dimension with the maximum value. Ties resolve to the earlier
    /// dimension in [`EMOTION_DIMENSIONS`].
    pub fn dominant(&self) -> (&'static str, f32) {
        let values = self.values();
        let mut best = 0usize;
        for (i, value) in values.iter().enumerate().skip(1) {
            if *value > values[best] {
                best = i;
            }
        }
        (EMOTION_DIMENSIONS[best], values[best])
    }
}

/// Categorical label derived from a sentiment score, distinct from the
/// emotion vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl Tone {
    pub fn from_score(score: &SentimentScore) -> Self {
        if score.positive >= 0.4 && score.negative >= 0.4 {
            Tone::Mixed
        } else if score.overall > 0.25 {
            Tone::Positive
        } else if score.overall < -0.25 {
            Tone::Negative
        } else {
            Tone::Neutral
        }
    }
}

/// One analyzed utterance in a session's rolling sentiment series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentPoint {
    pub timestamp: DateTime<Utc>,
    pub sentiment: SentimentScore,
    pub emotions: EmotionVector,
    pub engagement: f32,
    pub speaker: Option<String>,
    pub text: String,
    pub tone: Tone,
}

/// Alert categories in the fixed rule enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    NegativeTrend,
    SuddenDrop,
    Disengagement,
    AngerDetected,
    ConcernRaised,
}

/// Ordinal severity: `Low < Medium < High < Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Speaker/text/sentiment snapshot captured at alert trigger time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    pub speaker: Option<String>,
    pub text: String,
    pub sentiment: SentimentScore,
}

/// A derived, user-facing notice that a sentiment or engagement pattern
/// crossed a defined threshold. Append-only per session; acknowledgment
/// is the only mutation and is terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentAlert {
    pub id: Uuid,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    pub related: Option<AnalysisSnapshot>,
    pub acknowledged: bool,
}

impl SentimentAlert {
    pub fn new(
        session_id: impl Into<String>,
        kind: AlertKind,
        severity: Severity,
        message: impl Into<String>,
        related: Option<AnalysisSnapshot>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: session_id.into(),
            timestamp: Utc::now(),
            kind,
            severity,
            message: message.into(),
            related,
            acknowledged: false,
        }
    }
}
