// crates/fanout/src/lib.rs

use livecap_core::SessionEvent;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutConfig {
    /// Per-room broadcast capacity. Slow subscribers past this lag lose
    /// events (at-most-once delivery, no replay).
    #[serde(default = "FanoutConfig::default_room_capacity")]
    pub room_capacity: usize,
}

impl FanoutConfig {
    fn default_room_capacity() -> usize {
        256
    }
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            room_capacity: Self::default_room_capacity(),
        }
    }
}

/// Session-scoped pub/sub rooms. Holds no per-client state beyond the
/// broadcast subscription itself; a reconnecting client re-joins and
/// backfills history through the REST surface.
pub struct FanoutHub {
    config: FanoutConfig,
    rooms: RwLock<HashMap<String, broadcast::Sender<SessionEvent>>>,
}

impl Default for FanoutHub {
    fn default() -> Self {
        Self::new()
    }
}

impl FanoutHub {
    pub fn new() -> Self {
        Self::with_config(FanoutConfig::default())
    }

    pub fn with_config(config: FanoutConfig) -> Self {
        Self {
            config,
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Join a session's room, creating it if needed. Delivery starts at
    /// the moment of subscription; earlier events are not replayed.
    pub fn subscribe(&self, session_id: &str) -> broadcast::Receiver<SessionEvent> {
        {
            let rooms = self.rooms.read();
            if let Some(sender) = rooms.get(session_id) {
                return sender.subscribe();
            }
        }

        let mut rooms = self.rooms.write();
        rooms
            .entry(session_id.to_string())
            .or_insert_with(|| broadcast::channel(self.config.room_capacity).0)
            .subscribe()
    }

    /// Best-effort publish. Returns the number of subscribers the event
    /// was handed to; an absent room or an empty one drops the event.
    pub fn publish(&self, session_id: &str, event: SessionEvent) -> usize {
        let rooms = self.rooms.read();
        match rooms.get(session_id) {
            Some(sender) => sender.send(event).unwrap_or(0),
            None => {
                debug!("No fan-out room for session {}, event dropped", session_id);
                0
            }
        }
    }

    /// Tear down a session's room. Outstanding receivers observe a closed
    /// stream once they drain buffered events.
    pub fn close_room(&self, session_id: &str) {
        let mut rooms = self.rooms.write();
        if rooms.remove(session_id).is_some() {
            debug!("Closed fan-out room for session {}", session_id);
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.read().len()
    }

    pub fn subscriber_count(&self, session_id: &str) -> usize {
        self.rooms
            .read()
            .get(session_id)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(session_id: &str) -> SessionEvent {
        SessionEvent::SessionStarted {
            session_id: session_id.to_string(),
            language: "en".to_string(),
        }
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let hub = FanoutHub::new();
        let mut rx = hub.subscribe("m1");

        let delivered = hub.publish("m1", started("m1"));
        assert_eq!(delivered, 1);

        let event = rx.recv().await.expect("event");
        assert_eq!(event, started("m1"));
    }

    #[tokio::test]
    async fn publish_without_room_is_dropped() {
        let hub = FanoutHub::new();
        assert_eq!(hub.publish("nobody", started("nobody")), 0);
    }

    #[tokio::test]
    async fn late_joiners_get_no_replay() {
        let hub = FanoutHub::new();
        let _early = hub.subscribe("m1");
        hub.publish("m1", started("m1"));

        let mut late = hub.subscribe("m1");
        hub.close_room("m1");
        // The only observable outcome for the late joiner is a closed
        // stream, not the event published before it joined.
        assert!(late.try_recv().is_err());
    }

    #[tokio::test]
    async fn close_room_ends_streams() {
        let hub = FanoutHub::new();
        let mut rx = hub.subscribe("m1");
        hub.close_room("m1");
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
        assert_eq!(hub.room_count(), 0);
    }
}
