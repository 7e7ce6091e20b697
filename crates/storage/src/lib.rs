// crates/storage/src/lib.rs

use async_trait::async_trait;
use livecap_core::{CaptionSegment, LivecapResult};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Durable segment storage boundary. The schema is owned by the
/// collaborator behind this trait; the service only creates copies of
/// finalized segments and reads them back for ended sessions.
#[async_trait]
pub trait SegmentStore: Send + Sync {
    async fn create_segment(&self, segment: &CaptionSegment) -> LivecapResult<()>;

    /// The most recent `limit` segments for a session, newest first.
    async fn recent_segments(
        &self,
        session_id: &str,
        limit: usize,
    ) -> LivecapResult<Vec<CaptionSegment>>;
}

/// In-process reference store, used in tests and single-node deployments.
#[derive(Default)]
pub struct MemorySegmentStore {
    segments: RwLock<HashMap<String, Vec<CaptionSegment>>>,
}

impl MemorySegmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segment_count(&self, session_id: &str) -> usize {
        self.segments
            .read()
            .get(session_id)
            .map(|s| s.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl SegmentStore for MemorySegmentStore {
    async fn create_segment(&self, segment: &CaptionSegment) -> LivecapResult<()> {
        let mut segments = self.segments.write();
        segments
            .entry(segment.session_id.clone())
            .or_default()
            .push(segment.clone());
        Ok(())
    }

    async fn recent_segments(
        &self,
        session_id: &str,
        limit: usize,
    ) -> LivecapResult<Vec<CaptionSegment>> {
        let segments = self.segments.read();
        let Some(rows) = segments.get(session_id) else {
            return Ok(Vec::new());
        };

        let mut out: Vec<CaptionSegment> = rows.iter().rev().take(limit).cloned().collect();
        out.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms));
        Ok(out)
    }
}
