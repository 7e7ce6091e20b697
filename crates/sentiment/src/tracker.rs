// crates/sentiment/src/tracker.rs

use chrono::{DateTime, Duration, Utc};
use livecap_core::{
    AlertKind, EmotionVector, LivecapError, LivecapResult, SentimentAlert, SentimentPoint,
};
use std::collections::{HashMap, HashSet, VecDeque};
use uuid::Uuid;

/// Query-time filter over a session's rolling series. Windows are pure
/// functions over stored timestamps; no per-window storage exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    FiveMinutes,
    FifteenMinutes,
    All,
}

impl TimeWindow {
    pub fn parse(value: &str) -> LivecapResult<Self> {
        match value {
            "5min" => Ok(TimeWindow::FiveMinutes),
            "15min" => Ok(TimeWindow::FifteenMinutes),
            "all" => Ok(TimeWindow::All),
            other => Err(LivecapError::InvalidInput(format!(
                "Unsupported time window: {} (expected 5min, 15min or all)",
                other
            ))),
        }
    }

    fn duration(&self) -> Option<Duration> {
        match self {
            TimeWindow::FiveMinutes => Some(Duration::minutes(5)),
            TimeWindow::FifteenMinutes => Some(Duration::minutes(15)),
            TimeWindow::All => None,
        }
    }
}

/// Per-session rolling sentiment series plus per-speaker sub-series and
/// the session's append-only alert log.
///
/// Speakers are keyed by their raw display string; differently rendered
/// names of the same person count as different speakers.
pub struct SentimentTracker {
    max_points: usize,
    points: VecDeque<SentimentPoint>,
    speaker_points: HashMap<String, VecDeque<SentimentPoint>>,
    alerts: Vec<SentimentAlert>,
    fired: HashSet<(AlertKind, i64)>,
    trend_run: usize,
}

impl SentimentTracker {
    pub fn new(max_points: usize) -> Self {
        Self {
            max_points,
            points: VecDeque::with_capacity(max_points.min(64)),
            speaker_points: HashMap::new(),
            alerts: Vec::new(),
            fired: HashSet::new(),
            trend_run: 0,
        }
    }

    pub fn add_point(&mut self, point: SentimentPoint) {
        if let Some(speaker) = &point.speaker {
            let series = self.speaker_points.entry(speaker.clone()).or_default();
            series.push_back(point.clone());
            while series.len() > self.max_points {
                series.pop_front();
            }
        }

        self.points.push_back(point);
        while self.points.len() > self.max_points {
            self.points.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latest(&self) -> Option<&SentimentPoint> {
        self.points.back()
    }

    pub fn previous(&self) -> Option<&SentimentPoint> {
        self.points.iter().rev().nth(1)
    }

    /// The last `n` points, oldest first.
    pub fn tail(&self, n: usize) -> Vec<&SentimentPoint> {
        let skip = self.points.len().saturating_sub(n);
        self.points.iter().skip(skip).collect()
    }

    pub fn points_in_window(
        &self,
        window: TimeWindow,
        now: DateTime<Utc>,
    ) -> Vec<&SentimentPoint> {
        match window.duration() {
            None => self.points.iter().collect(),
            Some(duration) => {
                let cutoff = now - duration;
                self.points
                    .iter()
                    .filter(|p| p.timestamp >= cutoff)
                    .collect()
            }
        }
    }

    /// Arithmetic mean of each emotion dimension over the filtered set;
    /// `None` when the set is empty, never a division by zero.
    pub fn aggregated_emotions(
        &self,
        window: TimeWindow,
        now: DateTime<Utc>,
    ) -> Option<EmotionVector> {
        let points = self.points_in_window(window, now);
        if points.is_empty() {
            return None;
        }

        let mut sum = EmotionVector::default();
        for point in &points {
            sum.add_assign(&point.emotions);
        }
        Some(sum.scale(1.0 / points.len() as f32))
    }

    pub fn dominant_emotion(
        &self,
        window: TimeWindow,
        now: DateTime<Utc>,
    ) -> Option<(&'static str, f32)> {
        self.aggregated_emotions(window, now).map(|e| e.dominant())
    }

    pub fn average_engagement(&self, window: TimeWindow, now: DateTime<Utc>) -> Option<f32> {
        let points = self.points_in_window(window, now);
        if points.is_empty() {
            return None;
        }
        Some(points.iter().map(|p| p.engagement).sum::<f32>() / points.len() as f32)
    }

    pub fn average_overall(&self, window: TimeWindow, now: DateTime<Utc>) -> Option<f32> {
        let points = self.points_in_window(window, now);
        if points.is_empty() {
            return None;
        }
        Some(points.iter().map(|p| p.sentiment.overall).sum::<f32>() / points.len() as f32)
    }

    pub fn speakers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.speaker_points.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn speaker_series(&self, speaker: &str) -> Option<&VecDeque<SentimentPoint>> {
        self.speaker_points.get(speaker)
    }

    /// A (rule, triggering-point) pair fires at most once. Returns false
    /// when the pair already fired.
    pub fn mark_fired(&mut self, kind: AlertKind, trigger_ms: i64) -> bool {
        self.fired.insert((kind, trigger_ms))
    }

    pub fn trend_run(&self) -> usize {
        self.trend_run
    }

    pub fn set_trend_run(&mut self, run: usize) {
        self.trend_run = run;
    }

    pub fn push_alert(&mut self, alert: SentimentAlert) {
        self.alerts.push(alert);
    }

    pub fn alerts(&self) -> &[SentimentAlert] {
        &self.alerts
    }

    /// Terminal and idempotent: acknowledging an acknowledged alert is a
    /// successful no-op.
    pub fn acknowledge(&mut self, alert_id: Uuid) -> LivecapResult<()> {
        let alert = self
            .alerts
            .iter_mut()
            .find(|a| a.id == alert_id)
            .ok_or_else(|| LivecapError::NotFound(format!("alert {}", alert_id)))?;
        alert.acknowledged = true;
        Ok(())
    }
}
