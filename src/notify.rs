// ABOUTME: Notification sink abstraction for social events such as new followers
// ABOUTME: Delivery is fire-and-forget; failures are logged and never reach the caller

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::storage::Storage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationEvent {
    NewFollower,
}

impl NotificationEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationEvent::NewFollower => "NewFollower",
        }
    }
}

/// Receives social events addressed to a user.
///
/// Implementations must not fail the operation that produced the event, so
/// `send` has no error channel.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, event: NotificationEvent, target_user_id: Uuid, payload: serde_json::Value);
}

/// Persists events into the notifications table for the in-app inbox.
pub struct StoredNotifications {
    storage: Arc<Storage>,
}

impl StoredNotifications {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl NotificationSink for StoredNotifications {
    async fn send(&self, event: NotificationEvent, target_user_id: Uuid, payload: serde_json::Value) {
        match self
            .storage
            .insert_notification(target_user_id, event.as_str(), &payload)
            .await
        {
            Ok(_) => tracing::debug!(event = event.as_str(), %target_user_id, "notification stored"),
            Err(err) => tracing::warn!(
                event = event.as_str(),
                %target_user_id,
                "failed to store notification: {}",
                err
            ),
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Keeps every event in memory so tests can assert on what was sent.
    #[derive(Default)]
    pub struct RecordingSink {
        pub sent: Mutex<Vec<(NotificationEvent, Uuid, serde_json::Value)>>,
    }

    impl RecordingSink {
        pub fn events(&self) -> Vec<(NotificationEvent, Uuid, serde_json::Value)> {
            self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn send(&self, event: NotificationEvent, target_user_id: Uuid, payload: serde_json::Value) {
            if let Ok(mut sent) = self.sent.lock() {
                sent.push((event, target_user_id, payload));
            }
        }
    }
}
