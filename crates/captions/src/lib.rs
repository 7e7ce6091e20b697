// crates/captions/src/lib.rs

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use livecap_core::{
    CaptionSegment, CaptionStyle, LivecapError, LivecapResult, SessionEvent,
};
use livecap_fanout::FanoutHub;
use livecap_observability::{metrics::MetricType, MetricsCollector};
use livecap_storage::SegmentStore;
use livecap_transcribe::Transcriber;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub mod session;

pub use session::{CaptionSession, SessionOptions};

/// Confidence attached to segments produced through the transcription
/// boundary, which propagates no per-word metadata.
const SEGMENT_CONFIDENCE: f32 = 0.9;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionConfig {
    #[serde(default = "CaptionConfig::default_language")]
    pub default_language: String,
    /// Cumulative buffered bytes that trigger a transcription call.
    /// The default corresponds to roughly three seconds of audio at the
    /// nominal capture rate.
    #[serde(default = "CaptionConfig::default_buffer_threshold_bytes")]
    pub buffer_threshold_bytes: usize,
}

impl CaptionConfig {
    fn default_language() -> String {
        "en".to_string()
    }

    fn default_buffer_threshold_bytes() -> usize {
        48_000 * 3
    }

    pub fn validate(&self) -> LivecapResult<()> {
        if self.default_language.trim().is_empty() {
            return Err(LivecapError::Config(
                "Caption default language must not be empty".to_string(),
            ));
        }
        if self.buffer_threshold_bytes == 0 {
            return Err(LivecapError::Config(
                "Caption buffer threshold must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            default_language: Self::default_language(),
            buffer_threshold_bytes: Self::default_buffer_threshold_bytes(),
        }
    }
}

/// Caption session registry plus the audio chunk buffer in front of the
/// transcription boundary. Explicitly constructed and injected so tests
/// can run isolated instances; registry state lives for the process
/// lifetime only.
pub struct CaptionService {
    config: CaptionConfig,
    sessions: RwLock<HashMap<String, CaptionSession>>,
    // One in-flight transcription per session: chunk processing for a
    // session serializes on this mutex.
    processing: RwLock<HashMap<String, Arc<Mutex<()>>>>,
    transcriber: Arc<Transcriber>,
    store: Arc<dyn SegmentStore>,
    hub: Arc<FanoutHub>,
    metrics: Arc<MetricsCollector>,
}

impl CaptionService {
    pub fn new(
        config: CaptionConfig,
        transcriber: Arc<Transcriber>,
        store: Arc<dyn SegmentStore>,
        hub: Arc<FanoutHub>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
            processing: RwLock::new(HashMap::new()),
            transcriber,
            store,
            hub,
            metrics,
        }
    }

    /// Create a session. Starting an already-live session overwrites it
    /// silently, buffered audio included.
    pub fn start_session(&self, session_id: &str, options: SessionOptions) {
        let session = CaptionSession::new(session_id, options, &self.config.default_language);
        let language = session.language.clone();

        {
            let mut sessions = self.sessions.write();
            if sessions.insert(session_id.to_string(), session).is_some() {
                info!("Session {} restarted, previous state discarded", session_id);
            }
        }
        self.processing
            .write()
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())));

        self.metrics.increment(MetricType::SessionsStarted);
        self.publish(
            session_id,
            SessionEvent::SessionStarted {
                session_id: session_id.to_string(),
                language,
            },
        );
        info!("Caption session started: {}", session_id);
    }

    /// End a session, notifying subscribers of the total segment count
    /// before the room is torn down.
    pub fn end_session(&self, session_id: &str) -> LivecapResult<usize> {
        let session = {
            let mut sessions = self.sessions.write();
            sessions.remove(session_id)
        };
        let Some(session) = session else {
            warn!("end_session for unknown session {}", session_id);
            return Err(LivecapError::NotFound(format!("session {}", session_id)));
        };
        self.processing.write().remove(session_id);

        let total_segments = session.segments.len();
        self.publish(
            session_id,
            SessionEvent::SessionEnded {
                session_id: session_id.to_string(),
                total_segments,
            },
        );
        self.hub.close_room(session_id);

        self.metrics.increment(MetricType::SessionsEnded);
        info!(
            "Caption session ended: {} ({} segments)",
            session_id, total_segments
        );
        Ok(total_segments)
    }

    /// Buffer an audio fragment; once the cumulative buffered length
    /// crosses the threshold, transcribe the concatenated blob and append
    /// the resulting segment.
    ///
    /// Chunks for unknown sessions are dropped with a warning rather than
    /// rejected: late fragments arriving after `end_session` are a normal
    /// part of the shutdown sequence.
    pub async fn process_audio_chunk(
        &self,
        session_id: &str,
        chunk: Bytes,
    ) -> LivecapResult<Option<CaptionSegment>> {
        let Some(guard) = self.processing.read().get(session_id).cloned() else {
            warn!("Audio chunk for unknown session {}, dropped", session_id);
            return Ok(None);
        };
        let _in_flight = guard.lock().await;

        let (blob, language) = {
            let mut sessions = self.sessions.write();
            let Some(session) = sessions.get_mut(session_id) else {
                warn!("Audio chunk for unknown session {}, dropped", session_id);
                return Ok(None);
            };

            let buffered = session.push_audio(chunk);
            self.metrics.increment(MetricType::AudioChunksBuffered);
            if buffered < self.config.buffer_threshold_bytes {
                return Ok(None);
            }
            (session.drain_audio(), session.language.clone())
        };

        let text = self.transcriber.transcribe(&blob, &language).await;
        if text.is_empty() {
            // Upstream failure and "no speech detected" look identical
            // here; either way the blob is dropped without a segment.
            self.metrics.increment(MetricType::TranscriptionFailures);
            debug!(
                "No transcript for {} buffered bytes on session {}",
                blob.len(),
                session_id
            );
            return Ok(None);
        }
        self.metrics.increment(MetricType::TranscriptionsCompleted);

        let segment =
            CaptionSegment::new(session_id, text, language, None, SEGMENT_CONFIDENCE);

        {
            let mut sessions = self.sessions.write();
            let Some(session) = sessions.get_mut(session_id) else {
                warn!(
                    "Session {} ended during transcription, segment dropped",
                    session_id
                );
                return Ok(None);
            };
            session.segments.push(segment.clone());
        }

        // Best-effort durable copy: the in-memory append and the fan-out
        // broadcast proceed even when the write fails.
        if let Err(e) = self.store.create_segment(&segment).await {
            self.metrics.increment(MetricType::Errors);
            warn!("Durable write failed for segment {}: {}", segment.id, e);
        }

        self.publish(
            session_id,
            SessionEvent::CaptionCreated {
                segment: segment.clone(),
            },
        );
        self.metrics.increment(MetricType::SegmentsCreated);

        Ok(Some(segment))
    }

    /// The last `limit` segments, oldest first, regardless of whether they
    /// come from the live registry or durable storage.
    pub async fn caption_history(
        &self,
        session_id: &str,
        limit: usize,
    ) -> LivecapResult<Vec<CaptionSegment>> {
        {
            let sessions = self.sessions.read();
            if let Some(session) = sessions.get(session_id) {
                return Ok(session.last_segments(limit));
            }
        }

        // Not live: durable storage serves newest-first, so reverse to
        // keep the oldest-first contract.
        let mut rows = self.store.recent_segments(session_id, limit).await?;
        rows.reverse();
        Ok(rows)
    }

    pub fn update_style(&self, session_id: &str, style: CaptionStyle) -> LivecapResult<()> {
        {
            let mut sessions = self.sessions.write();
            let session = sessions
                .get_mut(session_id)
                .ok_or_else(|| LivecapError::NotFound(format!("session {}", session_id)))?;
            session.style = style.clone();
        }

        self.publish(
            session_id,
            SessionEvent::StyleUpdated {
                session_id: session_id.to_string(),
                style,
            },
        );
        Ok(())
    }

    pub fn set_speaker_color(
        &self,
        session_id: &str,
        speaker: &str,
        color: &str,
    ) -> LivecapResult<()> {
        {
            let mut sessions = self.sessions.write();
            let session = sessions
                .get_mut(session_id)
                .ok_or_else(|| LivecapError::NotFound(format!("session {}", session_id)))?;
            session
                .speaker_colors
                .insert(speaker.to_string(), color.to_string());
        }

        self.publish(
            session_id,
            SessionEvent::SpeakerColorSet {
                session_id: session_id.to_string(),
                speaker: speaker.to_string(),
                color: color.to_string(),
            },
        );
        Ok(())
    }

    pub fn add_target_language(&self, session_id: &str, language: &str) -> LivecapResult<()> {
        let added = {
            let mut sessions = self.sessions.write();
            let session = sessions
                .get_mut(session_id)
                .ok_or_else(|| LivecapError::NotFound(format!("session {}", session_id)))?;
            session.add_target_language(language)
        };

        if added {
            self.publish(
                session_id,
                SessionEvent::TargetLanguageAdded {
                    session_id: session_id.to_string(),
                    language: language.to_string(),
                },
            );
        } else {
            debug!(
                "Language {} already targeted on session {}",
                language, session_id
            );
        }
        Ok(())
    }

    pub fn remove_target_language(&self, session_id: &str, language: &str) -> LivecapResult<()> {
        let removed = {
            let mut sessions = self.sessions.write();
            let session = sessions
                .get_mut(session_id)
                .ok_or_else(|| LivecapError::NotFound(format!("session {}", session_id)))?;
            session.remove_target_language(language)
        };

        if removed {
            self.publish(
                session_id,
                SessionEvent::TargetLanguageRemoved {
                    session_id: session_id.to_string(),
                    language: language.to_string(),
                },
            );
        } else {
            debug!(
                "Language {} was not targeted on session {}",
                language, session_id
            );
        }
        Ok(())
    }

    pub fn is_live(&self, session_id: &str) -> bool {
        self.sessions.read().contains_key(session_id)
    }

    pub fn live_session_count(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn session_language(&self, session_id: &str) -> Option<String> {
        self.sessions
            .read()
            .get(session_id)
            .map(|s| s.language.clone())
    }

    fn publish(&self, session_id: &str, event: SessionEvent) {
        if self.hub.publish(session_id, event) > 0 {
            self.metrics.increment(MetricType::EventsPublished);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use async_trait::async_trait;
    use livecap_storage::MemorySegmentStore;
    use livecap_transcribe::{TranscriberConfig, TranscriptionBackend};

    struct CountingBackend {
        calls: Arc<AtomicUsize>,
        last_audio_len: Arc<AtomicUsize>,
        text: String,
    }

    #[async_trait]
    impl TranscriptionBackend for CountingBackend {
        async fn transcribe(&self, audio: &[u8], _language: &str) -> LivecapResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.last_audio_len.store(audio.len(), Ordering::SeqCst);
            Ok(self.text.clone())
        }
    }

    struct Fixture {
        service: CaptionService,
        store: Arc<MemorySegmentStore>,
        hub: Arc<FanoutHub>,
        calls: Arc<AtomicUsize>,
        last_audio_len: Arc<AtomicUsize>,
    }

    fn fixture(threshold: usize, text: &str) -> Fixture {
        let calls = Arc::new(AtomicUsize::new(0));
        let last_audio_len = Arc::new(AtomicUsize::new(0));
        let backend = Box::new(CountingBackend {
            calls: Arc::clone(&calls),
            last_audio_len: Arc::clone(&last_audio_len),
            text: text.to_string(),
        });
        let transcriber = Arc::new(Transcriber::with_backend(
            TranscriberConfig::default(),
            backend,
        ));
        let store = Arc::new(MemorySegmentStore::new());
        let hub = Arc::new(FanoutHub::new());
        let config = CaptionConfig {
            buffer_threshold_bytes: threshold,
            ..Default::default()
        };
        let service = CaptionService::new(
            config,
            transcriber,
            store.clone() as Arc<dyn SegmentStore>,
            hub.clone(),
            Arc::new(MetricsCollector::new()),
        );
        Fixture {
            service,
            store,
            hub,
            calls,
            last_audio_len,
        }
    }

    #[tokio::test]
    async fn below_threshold_chunks_never_reach_the_backend() {
        let f = fixture(100, "hello");
        f.service.start_session("m1", SessionOptions::default());

        for _ in 0..3 {
            let result = f
                .service
                .process_audio_chunk("m1", Bytes::from(vec![0u8; 30]))
                .await
                .expect("chunk");
            assert!(result.is_none());
        }
        assert_eq!(f.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn crossing_threshold_transcribes_full_buffer_once() {
        let f = fixture(100, "good morning");
        f.service.start_session("m1", SessionOptions::default());
        let mut room = f.hub.subscribe("m1");

        f.service
            .process_audio_chunk("m1", Bytes::from(vec![0u8; 60]))
            .await
            .expect("chunk");
        let segment = f
            .service
            .process_audio_chunk("m1", Bytes::from(vec![0u8; 60]))
            .await
            .expect("chunk")
            .expect("segment");

        assert_eq!(segment.text, "good morning");
        assert!(segment.is_final);
        assert_eq!(f.calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.last_audio_len.load(Ordering::SeqCst), 120);

        // Buffer is empty again: a fresh small chunk stays below threshold.
        let result = f
            .service
            .process_audio_chunk("m1", Bytes::from(vec![0u8; 60]))
            .await
            .expect("chunk");
        assert!(result.is_none());
        assert_eq!(f.calls.load(Ordering::SeqCst), 1);

        // Durable copy and fan-out both observed the segment.
        assert_eq!(f.store.segment_count("m1"), 1);
        let event = room.try_recv().expect("caption event");
        assert!(matches!(event, SessionEvent::CaptionCreated { .. }));
    }

    #[tokio::test]
    async fn empty_transcript_drops_the_blob() {
        let f = fixture(10, "");
        f.service.start_session("m1", SessionOptions::default());

        let result = f
            .service
            .process_audio_chunk("m1", Bytes::from(vec![0u8; 20]))
            .await
            .expect("chunk");
        assert!(result.is_none());
        assert_eq!(f.calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.store.segment_count("m1"), 0);

        let history = f.service.caption_history("m1", 10).await.expect("history");
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn chunks_for_unknown_sessions_are_dropped() {
        let f = fixture(10, "hello");
        let result = f
            .service
            .process_audio_chunk("ghost", Bytes::from(vec![0u8; 20]))
            .await
            .expect("chunk");
        assert!(result.is_none());
        assert_eq!(f.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn history_is_oldest_first_live_and_durable() {
        let f = fixture(10, "line");
        f.service.start_session("m1", SessionOptions::default());

        for _ in 0..3 {
            f.service
                .process_audio_chunk("m1", Bytes::from(vec![0u8; 20]))
                .await
                .expect("chunk");
        }

        let live = f.service.caption_history("m1", 10).await.expect("history");
        assert_eq!(live.len(), 3);
        assert!(live
            .windows(2)
            .all(|w| w[0].timestamp_ms <= w[1].timestamp_ms));

        f.service.end_session("m1").expect("end");

        let durable = f.service.caption_history("m1", 10).await.expect("history");
        assert_eq!(durable.len(), 3);
        assert!(durable
            .windows(2)
            .all(|w| w[0].timestamp_ms <= w[1].timestamp_ms));
        assert_eq!(
            live.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            durable.iter().map(|s| s.id.as_str()).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn restart_discards_previous_state() {
        let f = fixture(10, "hello");
        f.service.start_session("m1", SessionOptions::default());
        f.service
            .process_audio_chunk("m1", Bytes::from(vec![0u8; 20]))
            .await
            .expect("chunk");

        f.service.start_session("m1", SessionOptions::default());
        let history = f.service.caption_history("m1", 10).await.expect("history");
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn session_mutations_use_a_unified_not_found_contract() {
        let f = fixture(10, "hello");

        assert!(matches!(
            f.service.update_style("ghost", CaptionStyle::default()),
            Err(LivecapError::NotFound(_))
        ));
        assert!(matches!(
            f.service.set_speaker_color("ghost", "Ana", "#ff0000"),
            Err(LivecapError::NotFound(_))
        ));
        assert!(matches!(
            f.service.add_target_language("ghost", "de"),
            Err(LivecapError::NotFound(_))
        ));
        assert!(matches!(
            f.service.end_session("ghost"),
            Err(LivecapError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn end_session_reports_segment_count_and_closes_room() {
        let f = fixture(10, "hello");
        f.service.start_session("m1", SessionOptions::default());
        let mut room = f.hub.subscribe("m1");

        f.service
            .process_audio_chunk("m1", Bytes::from(vec![0u8; 20]))
            .await
            .expect("chunk");
        let total = f.service.end_session("m1").expect("end");
        assert_eq!(total, 1);

        // Drain: caption-created then session-ended with the count.
        let mut saw_ended = false;
        while let Ok(event) = room.try_recv() {
            if let SessionEvent::SessionEnded { total_segments, .. } = event {
                assert_eq!(total_segments, 1);
                saw_ended = true;
            }
        }
        assert!(saw_ended);
        assert_eq!(f.hub.room_count(), 0);
    }

    #[tokio::test]
    async fn style_and_language_mutations_broadcast() {
        let f = fixture(10, "hello");
        f.service.start_session("m1", SessionOptions::default());
        let mut room = f.hub.subscribe("m1");

        f.service
            .update_style(
                "m1",
                CaptionStyle {
                    font_size: 24,
                    ..Default::default()
                },
            )
            .expect("style");
        f.service.add_target_language("m1", "de").expect("add");
        f.service.add_target_language("m1", "de").expect("add again");
        f.service.remove_target_language("m1", "de").expect("remove");
        f.service
            .set_speaker_color("m1", "Ana", "#00ff00")
            .expect("color");

        let mut kinds = Vec::new();
        while let Ok(event) = room.try_recv() {
            kinds.push(match event {
                SessionEvent::StyleUpdated { .. } => "style",
                SessionEvent::TargetLanguageAdded { .. } => "added",
                SessionEvent::TargetLanguageRemoved { .. } => "removed",
                SessionEvent::SpeakerColorSet { .. } => "color",
                _ => "other",
            });
        }
        // The duplicate add did not rebroadcast.
        assert_eq!(kinds, vec!["style", "added", "removed", "color"]);
    }
}
