// crates/sentiment/src/lib.rs

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use livecap_core::{
    EmotionVector, LivecapError, LivecapResult, SentimentAlert, SentimentPoint, SentimentScore,
    SessionEvent, Severity, Tone,
};
use livecap_fanout::FanoutHub;
use livecap_observability::{metrics::MetricType, MetricsCollector};
use livecap_push::{PushNotification, PushSender};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

pub mod alerts;
pub mod tracker;

use alerts::AlertEvaluator;
pub use tracker::{SentimentTracker, TimeWindow};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentConfig {
    /// Rolling series cap per session and per speaker; oldest points are
    /// evicted on overflow.
    #[serde(default = "SentimentConfig::default_max_points")]
    pub max_points: usize,
    #[serde(default = "SentimentConfig::default_sudden_drop_delta")]
    pub sudden_drop_delta: f32,
    #[serde(default = "SentimentConfig::default_sudden_drop_max_gap_s")]
    pub sudden_drop_max_gap_s: i64,
    #[serde(default = "SentimentConfig::default_negative_threshold")]
    pub negative_threshold: f32,
    #[serde(default = "SentimentConfig::default_trend_window")]
    pub trend_window: usize,
    #[serde(default = "SentimentConfig::default_trend_min_points")]
    pub trend_min_points: usize,
    #[serde(default = "SentimentConfig::default_disengagement_threshold")]
    pub disengagement_threshold: f32,
    #[serde(default = "SentimentConfig::default_disengagement_window_s")]
    pub disengagement_window_s: i64,
    #[serde(default = "SentimentConfig::default_anger_threshold")]
    pub anger_threshold: f32,
}

impl SentimentConfig {
    fn default_max_points() -> usize {
        200
    }

    fn default_sudden_drop_delta() -> f32 {
        0.4
    }

    fn default_sudden_drop_max_gap_s() -> i64 {
        30
    }

    fn default_negative_threshold() -> f32 {
        -0.3
    }

    fn default_trend_window() -> usize {
        5
    }

    fn default_trend_min_points() -> usize {
        3
    }

    fn default_disengagement_threshold() -> f32 {
        0.3
    }

    fn default_disengagement_window_s() -> i64 {
        60
    }

    fn default_anger_threshold() -> f32 {
        0.7
    }

    pub fn validate(&self) -> LivecapResult<()> {
        if self.max_points == 0 {
            return Err(LivecapError::Config(
                "Sentiment max_points must be positive".to_string(),
            ));
        }
        if self.trend_window == 0 || self.trend_min_points == 0 {
            return Err(LivecapError::Config(
                "Sentiment trend parameters must be positive".to_string(),
            ));
        }
        if self.sudden_drop_delta <= 0.0 {
            return Err(LivecapError::Config(
                "Sudden-drop delta must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            max_points: Self::default_max_points(),
            sudden_drop_delta: Self::default_sudden_drop_delta(),
            sudden_drop_max_gap_s: Self::default_sudden_drop_max_gap_s(),
            negative_threshold: Self::default_negative_threshold(),
            trend_window: Self::default_trend_window(),
            trend_min_points: Self::default_trend_min_points(),
            disengagement_threshold: Self::default_disengagement_threshold(),
            disengagement_window_s: Self::default_disengagement_window_s(),
            anger_threshold: Self::default_anger_threshold(),
        }
    }
}

/// Per-utterance analysis payload as delivered by the external
/// classifier. `concern` carries the upstream keyword/tone signal; it is
/// not computed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisEvent {
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    pub sentiment: SentimentScore,
    #[serde(default)]
    pub emotions: EmotionVector,
    #[serde(default)]
    pub engagement: f32,
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tone: Option<Tone>,
    #[serde(default)]
    pub concern: bool,
}

impl AnalysisEvent {
    fn into_point(self) -> (SentimentPoint, bool) {
        let tone = self
            .tone
            .unwrap_or_else(|| Tone::from_score(&self.sentiment));
        (
            SentimentPoint {
                timestamp: self.timestamp,
                sentiment: self.sentiment,
                emotions: self.emotions,
                engagement: self.engagement,
                speaker: self.speaker,
                text: self.text,
                tone,
            },
            self.concern,
        )
    }
}

/// Windowed aggregate view over a session's series.
#[derive(Debug, Clone, Serialize)]
pub struct SentimentSummary {
    pub point_count: usize,
    pub aggregated_emotions: Option<EmotionVector>,
    pub dominant_emotion: Option<String>,
    pub average_engagement: Option<f32>,
    pub average_overall: Option<f32>,
    pub speakers: Vec<String>,
}

/// Consumes analysis events, maintains the bounded rolling series, runs
/// the alert rules, and fans results out to subscribers and the push
/// boundary.
pub struct SentimentEngine {
    config: SentimentConfig,
    sessions: RwLock<HashMap<String, SentimentTracker>>,
    hub: Arc<FanoutHub>,
    push: Arc<dyn PushSender>,
    metrics: Arc<MetricsCollector>,
}

impl SentimentEngine {
    pub fn new(
        config: SentimentConfig,
        hub: Arc<FanoutHub>,
        push: Arc<dyn PushSender>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
            hub,
            push,
            metrics,
        }
    }

    /// Ingest one analysis event and return the alerts it raised.
    pub async fn ingest(&self, session_id: &str, event: AnalysisEvent) -> Vec<SentimentAlert> {
        let (point, concern) = event.into_point();

        let alerts = {
            let mut sessions = self.sessions.write();
            let tracker = sessions
                .entry(session_id.to_string())
                .or_insert_with(|| SentimentTracker::new(self.config.max_points));
            tracker.add_point(point.clone());
            AlertEvaluator::new(&self.config).evaluate(session_id, tracker, concern)
        };

        self.metrics.increment(MetricType::SentimentPointsIngested);
        self.hub.publish(
            session_id,
            SessionEvent::SentimentPoint {
                session_id: session_id.to_string(),
                point,
            },
        );

        for alert in &alerts {
            self.metrics.increment(MetricType::AlertsRaised);
            self.hub.publish(
                session_id,
                SessionEvent::AlertCreated {
                    alert: alert.clone(),
                },
            );

            // High-impact alerts also go to the push collaborator,
            // fire-and-forget.
            if alert.severity >= Severity::High {
                let notification = PushNotification {
                    session_id: session_id.to_string(),
                    kind: "sentiment_alert".to_string(),
                    title: "Sentiment alert".to_string(),
                    body: alert.message.clone(),
                    data: serde_json::json!({
                        "alert_id": alert.id,
                        "kind": alert.kind,
                        "severity": alert.severity,
                    }),
                };
                match self.push.send(notification).await {
                    Ok(()) => self.metrics.increment(MetricType::PushNotificationsSent),
                    Err(e) => {
                        self.metrics.increment(MetricType::Errors);
                        warn!("Push send failed for alert {}: {}", alert.id, e);
                    }
                }
            }
        }

        alerts
    }

    pub fn summary(&self, session_id: &str, window: TimeWindow) -> SentimentSummary {
        let now = Utc::now();
        let sessions = self.sessions.read();
        let Some(tracker) = sessions.get(session_id) else {
            return SentimentSummary {
                point_count: 0,
                aggregated_emotions: None,
                dominant_emotion: None,
                average_engagement: None,
                average_overall: None,
                speakers: Vec::new(),
            };
        };

        SentimentSummary {
            point_count: tracker.points_in_window(window, now).len(),
            aggregated_emotions: tracker.aggregated_emotions(window, now),
            dominant_emotion: tracker
                .dominant_emotion(window, now)
                .map(|(name, _)| name.to_string()),
            average_engagement: tracker.average_engagement(window, now),
            average_overall: tracker.average_overall(window, now),
            speakers: tracker.speakers(),
        }
    }

    pub fn alerts(&self, session_id: &str) -> Vec<SentimentAlert> {
        self.sessions
            .read()
            .get(session_id)
            .map(|t| t.alerts().to_vec())
            .unwrap_or_default()
    }

    /// Terminal acknowledgment; repeating it is a successful no-op.
    pub fn acknowledge_alert(&self, session_id: &str, alert_id: Uuid) -> LivecapResult<()> {
        let mut sessions = self.sessions.write();
        let tracker = sessions
            .get_mut(session_id)
            .ok_or_else(|| LivecapError::NotFound(format!("session {}", session_id)))?;
        tracker.acknowledge(alert_id)
    }

    /// Drop a session's series and alert log.
    pub fn remove_session(&self, session_id: &str) {
        self.sessions.write().remove(session_id);
    }

    pub fn tracked_session_count(&self) -> usize {
        self.sessions.read().len()
    }
}
