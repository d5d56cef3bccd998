//! Durable notification sink.
//!
//! [`PersistentNotifier`] writes each notification to the `notifications`
//! table and then publishes it on the [`EventBus`] so connected clients see
//! it immediately. The row is the source of truth; the push is best-effort.

use std::sync::Arc;

use async_trait::async_trait;
use crewboard_db::models::notification::NewNotificationRow;
use crewboard_db::repositories::NotificationRepo;
use crewboard_db::DbPool;

use crate::bus::{EventBus, UserNotification};
use crate::notification::{Notification, NotificationSink, NotifyError};

pub struct PersistentNotifier {
    pool: DbPool,
    bus: Arc<EventBus>,
}

impl PersistentNotifier {
    pub fn new(pool: DbPool, bus: Arc<EventBus>) -> Self {
        Self { pool, bus }
    }
}

#[async_trait]
impl NotificationSink for PersistentNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        let id = NotificationRepo::create(
            &self.pool,
            &NewNotificationRow {
                user_id: notification.user_id,
                project_id: notification.project_id,
                kind: notification.kind.as_str(),
                content: &notification.content,
                url: &notification.url,
            },
        )
        .await?;

        tracing::debug!(
            notification_id = id,
            user_id = notification.user_id,
            kind = %notification.kind,
            "Notification stored"
        );

        self.bus.publish(UserNotification::from_stored(id, notification));
        Ok(())
    }
}
