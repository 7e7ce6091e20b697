// crates/sentiment/src/alerts.rs

use livecap_core::{AlertKind, AnalysisSnapshot, SentimentAlert, SentimentPoint, Severity};

use crate::tracker::SentimentTracker;
use crate::SentimentConfig;

/// Threshold rules over a session's rolling series. Invoked once per
/// ingested point; each firing produces one alert with a fresh id, and a
/// (rule, triggering-point) pair never fires twice.
pub struct AlertEvaluator<'a> {
    config: &'a SentimentConfig,
}

impl<'a> AlertEvaluator<'a> {
    pub fn new(config: &'a SentimentConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(
        &self,
        session_id: &str,
        tracker: &mut SentimentTracker,
        concern_flagged: bool,
    ) -> Vec<SentimentAlert> {
        let mut alerts = Vec::new();

        self.check_sudden_drop(session_id, tracker, &mut alerts);
        self.check_negative_trend(session_id, tracker, &mut alerts);
        self.check_disengagement(session_id, tracker, &mut alerts);
        self.check_anger(session_id, tracker, &mut alerts);
        if concern_flagged {
            self.check_concern(session_id, tracker, &mut alerts);
        }

        for alert in &alerts {
            tracker.push_alert(alert.clone());
        }
        alerts
    }

    fn check_sudden_drop(
        &self,
        session_id: &str,
        tracker: &mut SentimentTracker,
        alerts: &mut Vec<SentimentAlert>,
    ) {
        let (drop, gap_s, trigger_ms, snapshot) = {
            let (Some(latest), Some(previous)) = (tracker.latest(), tracker.previous()) else {
                return;
            };
            (
                previous.sentiment.overall - latest.sentiment.overall,
                (latest.timestamp - previous.timestamp).num_seconds(),
                latest.timestamp.timestamp_millis(),
                snapshot_of(latest),
            )
        };

        if drop <= self.config.sudden_drop_delta || gap_s >= self.config.sudden_drop_max_gap_s {
            return;
        }
        if !tracker.mark_fired(AlertKind::SuddenDrop, trigger_ms) {
            return;
        }

        // Severity scales with the magnitude of the drop past the
        // configured delta.
        let severity = if drop >= self.config.sudden_drop_delta + 0.3 {
            Severity::Critical
        } else if drop >= self.config.sudden_drop_delta + 0.15 {
            Severity::High
        } else {
            Severity::Medium
        };

        alerts.push(SentimentAlert::new(
            session_id,
            AlertKind::SuddenDrop,
            severity,
            format!("Overall sentiment dropped by {:.2} within {}s", drop, gap_s),
            Some(snapshot),
        ));
    }

    fn check_negative_trend(
        &self,
        session_id: &str,
        tracker: &mut SentimentTracker,
        alerts: &mut Vec<SentimentAlert>,
    ) {
        let window = self.config.trend_window;
        if tracker.len() < window {
            tracker.set_trend_run(0);
            return;
        }

        let tail = tracker.tail(window);
        let mean =
            tail.iter().map(|p| p.sentiment.overall).sum::<f32>() / tail.len() as f32;
        let trigger_ms = tail
            .last()
            .map(|p| p.timestamp.timestamp_millis())
            .unwrap_or_default();

        if mean >= self.config.negative_threshold {
            tracker.set_trend_run(0);
            return;
        }

        let run = tracker.trend_run() + 1;
        tracker.set_trend_run(run);

        // One alert when the run reaches the minimum length, a second,
        // escalated one if the trend persists twice as long.
        let severity = if run == 2 * self.config.trend_min_points {
            Severity::High
        } else if run == self.config.trend_min_points {
            Severity::Medium
        } else {
            return;
        };

        if !tracker.mark_fired(AlertKind::NegativeTrend, trigger_ms) {
            return;
        }

        alerts.push(SentimentAlert::new(
            session_id,
            AlertKind::NegativeTrend,
            severity,
            format!(
                "Average sentiment {:.2} below {:.2} for {} consecutive points",
                mean, self.config.negative_threshold, run
            ),
            None,
        ));
    }

    fn check_disengagement(
        &self,
        session_id: &str,
        tracker: &mut SentimentTracker,
        alerts: &mut Vec<SentimentAlert>,
    ) {
        let (sustained_s, trigger_ms) = {
            let Some(latest) = tracker.latest() else {
                return;
            };
            if latest.engagement >= self.config.disengagement_threshold {
                return;
            }

            // Walk back while engagement stays below threshold.
            let mut sustained_from = latest.timestamp;
            for point in tracker.tail(tracker.len()).into_iter().rev() {
                if point.engagement >= self.config.disengagement_threshold {
                    break;
                }
                sustained_from = point.timestamp;
            }
            (
                (latest.timestamp - sustained_from).num_seconds(),
                latest.timestamp.timestamp_millis(),
            )
        };

        if sustained_s < self.config.disengagement_window_s {
            return;
        }
        if !tracker.mark_fired(AlertKind::Disengagement, trigger_ms) {
            return;
        }

        let severity = if sustained_s >= 2 * self.config.disengagement_window_s {
            Severity::Medium
        } else {
            Severity::Low
        };

        alerts.push(SentimentAlert::new(
            session_id,
            AlertKind::Disengagement,
            severity,
            format!("Engagement below {:.2} for {}s", self.config.disengagement_threshold, sustained_s),
            None,
        ));
    }

    fn check_anger(
        &self,
        session_id: &str,
        tracker: &mut SentimentTracker,
        alerts: &mut Vec<SentimentAlert>,
    ) {
        let (anger, trigger_ms, snapshot) = {
            let Some(latest) = tracker.latest() else {
                return;
            };
            (
                latest.emotions.anger,
                latest.timestamp.timestamp_millis(),
                snapshot_of(latest),
            )
        };

        if anger <= self.config.anger_threshold {
            return;
        }
        if !tracker.mark_fired(AlertKind::AngerDetected, trigger_ms) {
            return;
        }

        alerts.push(SentimentAlert::new(
            session_id,
            AlertKind::AngerDetected,
            Severity::High,
            format!("Anger level {:.2} detected", anger),
            Some(snapshot),
        ));
    }

    fn check_concern(
        &self,
        session_id: &str,
        tracker: &mut SentimentTracker,
        alerts: &mut Vec<SentimentAlert>,
    ) {
        let (escalated, trigger_ms, snapshot) = {
            let Some(latest) = tracker.latest() else {
                return;
            };
            (
                latest.emotions.anger > self.config.anger_threshold
                    || latest.sentiment.overall < self.config.negative_threshold,
                latest.timestamp.timestamp_millis(),
                snapshot_of(latest),
            )
        };

        if !tracker.mark_fired(AlertKind::ConcernRaised, trigger_ms) {
            return;
        }

        let severity = if escalated {
            Severity::Critical
        } else {
            Severity::Medium
        };

        alerts.push(SentimentAlert::new(
            session_id,
            AlertKind::ConcernRaised,
            severity,
            "Concern raised by participant".to_string(),
            Some(snapshot),
        ));
    }
}

fn snapshot_of(point: &SentimentPoint) -> AnalysisSnapshot {
    AnalysisSnapshot {
        speaker: point.speaker.clone(),
        text: point.text.clone(),
        sentiment: point.sentiment,
    }
}
