// crates/push/src/lib.rs

use async_trait::async_trait;
use livecap_core::LivecapResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

/// Notification payload handed to the delivery collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushNotification {
    pub session_id: String,
    pub kind: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub data: Value,
}

/// Push-notification delivery boundary. Sends are fire-and-forget: the
/// caller logs failures and never retries; retry/backoff, if any, lives
/// inside the collaborator.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, notification: PushNotification) -> LivecapResult<()>;
}

/// Default sender for deployments without a delivery collaborator wired
/// in. Logs the notification and succeeds.
#[derive(Default)]
pub struct LogPushSender;

impl LogPushSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PushSender for LogPushSender {
    async fn send(&self, notification: PushNotification) -> LivecapResult<()> {
        info!(
            "Push notification for session {}: [{}] {}",
            notification.session_id, notification.kind, notification.title
        );
        Ok(())
    }
}

pub mod testing {
    use super::*;
    use parking_lot::Mutex;

    /// Records every send for assertions.
    #[derive(Default)]
    pub struct RecordingPushSender {
        pub sent: Mutex<Vec<PushNotification>>,
    }

    #[async_trait]
    impl PushSender for RecordingPushSender {
        async fn send(&self, notification: PushNotification) -> LivecapResult<()> {
            self.sent.lock().push(notification);
            Ok(())
        }
    }
}
