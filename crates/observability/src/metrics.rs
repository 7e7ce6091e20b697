// crates/observability/src/metrics.rs

use crate::MetricsSummary;
use parking_lot::RwLock;
use prometheus::{Encoder, Gauge, Registry, TextEncoder};
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricType {
    SessionsStarted,
    SessionsEnded,
    AudioChunksBuffered,
    TranscriptionsCompleted,
    TranscriptionFailures,
    SegmentsCreated,
    SentimentPointsIngested,
    AlertsRaised,
    PushNotificationsSent,
    EventsPublished,
    Errors,
}

impl MetricType {
    fn name(&self) -> &'static str {
        match self {
            MetricType::SessionsStarted => "livecap_sessions_started",
            MetricType::SessionsEnded => "livecap_sessions_ended",
            MetricType::AudioChunksBuffered => "livecap_audio_chunks_buffered",
            MetricType::TranscriptionsCompleted => "livecap_transcriptions_completed",
            MetricType::TranscriptionFailures => "livecap_transcription_failures",
            MetricType::SegmentsCreated => "livecap_segments_created",
            MetricType::SentimentPointsIngested => "livecap_sentiment_points_ingested",
            MetricType::AlertsRaised => "livecap_alerts_raised",
            MetricType::PushNotificationsSent => "livecap_push_notifications_sent",
            MetricType::EventsPublished => "livecap_events_published",
            MetricType::Errors => "livecap_errors",
        }
    }

    fn help(&self) -> &'static str {
        match self {
            MetricType::SessionsStarted => "Caption sessions started",
            MetricType::SessionsEnded => "Caption sessions ended",
            MetricType::AudioChunksBuffered => "Audio chunks appended to session buffers",
            MetricType::TranscriptionsCompleted => "Successful transcription calls",
            MetricType::TranscriptionFailures => "Failed or timed-out transcription calls",
            MetricType::SegmentsCreated => "Caption segments appended",
            MetricType::SentimentPointsIngested => "Sentiment data points ingested",
            MetricType::AlertsRaised => "Sentiment alerts raised",
            MetricType::PushNotificationsSent => "Push notifications handed to the collaborator",
            MetricType::EventsPublished => "Events published to fan-out rooms",
            MetricType::Errors => "Component-internal errors swallowed at a boundary",
        }
    }
}

#[derive(Default)]
pub struct Metrics {
    registry: Registry,
    gauges: RwLock<HashMap<MetricType, Gauge>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_gauge<F: FnOnce(&Gauge)>(&self, metric: MetricType, f: F) {
        {
            let gauges = self.gauges.read();
            if let Some(gauge) = gauges.get(&metric) {
                f(gauge);
                return;
            }
        }

        let mut gauges = self.gauges.write();
        let gauge = gauges.entry(metric).or_insert_with(|| {
            let gauge = Gauge::new(metric.name(), metric.help())
                .unwrap_or_else(|e| panic!("invalid metric descriptor {}: {}", metric.name(), e));
            if let Err(e) = self.registry.register(Box::new(gauge.clone())) {
                warn!("Failed to register metric {}: {}", metric.name(), e);
            }
            gauge
        });
        f(gauge);
    }

    pub fn record(&self, metric: MetricType, value: f64) {
        self.with_gauge(metric, |g| g.set(value));
    }

    pub fn add(&self, metric: MetricType, value: f64) {
        self.with_gauge(metric, |g| g.add(value));
    }

    pub fn increment(&self, metric: MetricType) {
        self.add(metric, 1.0);
    }

    pub fn get(&self, metric: MetricType) -> Option<f64> {
        let gauges = self.gauges.read();
        gauges.get(&metric).map(|g| g.get())
    }

    pub fn encode_prometheus(&self) -> String {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&families, &mut buffer) {
            warn!("Failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }

    pub fn get_summary(&self) -> MetricsSummary {
        MetricsSummary {
            sessions_started: self.get(MetricType::SessionsStarted).unwrap_or_default() as u64,
            segments_created: self.get(MetricType::SegmentsCreated).unwrap_or_default() as u64,
            transcriptions_completed: self
                .get(MetricType::TranscriptionsCompleted)
                .unwrap_or_default() as u64,
            sentiment_points_ingested: self
                .get(MetricType::SentimentPointsIngested)
                .unwrap_or_default() as u64,
            alerts_raised: self.get(MetricType::AlertsRaised).unwrap_or_default() as u64,
            errors: self.get(MetricType::Errors).unwrap_or_default() as u64,
        }
    }
}
