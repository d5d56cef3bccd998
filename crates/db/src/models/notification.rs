//! Notification insert model.

use crewboard_core::types::DbId;

/// Values for a new `notifications` row.
#[derive(Debug, Clone)]
pub struct NewNotificationRow<'a> {
    pub user_id: DbId,
    pub project_id: Option<DbId>,
    pub kind: &'a str,
    pub content: &'a str,
    pub url: &'a str,
}
