//! In-memory sink that records everything it is given.

use std::collections::HashSet;

use async_trait::async_trait;
use crewboard_core::types::DbId;
use tokio::sync::Mutex;

use crate::notification::{Notification, NotificationKind, NotificationSink, NotifyError};

/// Collects notifications in memory. Users registered with
/// [`fail_for`](RecordingSink::fail_for) get an error instead.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<Notification>>,
    failing: Mutex<HashSet<DbId>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every delivery to `user_id` fail.
    pub async fn fail_for(&self, user_id: DbId) {
        self.failing.lock().await.insert(user_id);
    }

    /// Everything delivered so far, in order.
    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_of(&self, kind: NotificationKind) -> Vec<Notification> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|n| n.kind == kind)
            .cloned()
            .collect()
    }

    pub async fn clear(&self) {
        self.sent.lock().await.clear();
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        if self.failing.lock().await.contains(&notification.user_id) {
            return Err(NotifyError::Unavailable(format!(
                "delivery to user {} disabled",
                notification.user_id
            )));
        }
        self.sent.lock().await.push(notification);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn records_in_order_and_filters_by_kind() {
        let sink = RecordingSink::new();
        sink.notify(Notification::for_project(1, NotificationKind::ProjectDueSoon, 3, "a"))
            .await
            .unwrap();
        sink.notify(Notification::for_project(2, NotificationKind::ProjectFinished, 3, "b"))
            .await
            .unwrap();

        let sent = sink.sent().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].user_id, 1);
        assert_eq!(sink.sent_of(NotificationKind::ProjectFinished).await.len(), 1);
    }

    #[tokio::test]
    async fn failing_user_is_not_recorded() {
        let sink = RecordingSink::new();
        sink.fail_for(2).await;
        let result = sink
            .notify(Notification::for_project(2, NotificationKind::ProjectDueSoon, 3, "x"))
            .await;
        assert_matches!(result, Err(NotifyError::Unavailable(_)));
        assert!(sink.sent().await.is_empty());
    }
}
