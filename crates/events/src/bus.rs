//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] carries every delivered [`UserNotification`] to live
//! transports (WebSocket, SSE). Each transport subscribes once and filters by
//! `user_id`. Share it via `Arc<EventBus>`.

use chrono::{DateTime, Utc};
use crewboard_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::notification::{Notification, NotificationKind};

// ---------------------------------------------------------------------------
// UserNotification
// ---------------------------------------------------------------------------

/// A stored notification as pushed to live subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserNotification {
    /// Row id in `notifications`.
    pub id: DbId,
    pub user_id: DbId,
    pub kind: NotificationKind,
    pub content: String,
    pub url: String,
    pub project_id: Option<DbId>,
    pub created_at: DateTime<Utc>,
}

impl UserNotification {
    pub fn from_stored(id: DbId, notification: Notification) -> Self {
        Self {
            id,
            user_id: notification.user_id,
            kind: notification.kind,
            content: notification.content,
            url: notification.url,
            project_id: notification.project_id,
            created_at: Utc::now(),
        }
    }

    /// Whether this push is addressed to `user_id`.
    pub fn is_for(&self, user_id: DbId) -> bool {
        self.user_id == user_id
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out bus for [`UserNotification`]s.
///
/// ```rust
/// use crewboard_events::{EventBus, Notification, NotificationKind, UserNotification};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// let n = Notification::for_project(1, NotificationKind::ProjectDueSoon, 9, "due tomorrow");
/// bus.publish(UserNotification::from_stored(100, n));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<UserNotification>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers.
    ///
    /// With no subscribers the push is dropped; the stored row is the
    /// durable copy.
    pub fn publish(&self, notification: UserNotification) {
        // SendError only means there are zero receivers.
        let _ = self.sender.send(notification);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UserNotification> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
