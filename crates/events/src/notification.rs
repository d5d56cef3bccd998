//! Notification values and the sink contract.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use crewboard_core::error::CoreError;
use crewboard_core::types::DbId;
use serde::{Deserialize, Serialize};

/// The four notifications produced by the lifecycle sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    ProjectDueSoon,
    ProjectFinished,
    ProjectHardDeleteSoon,
    ProjectPermanentlyDeleted,
}

impl NotificationKind {
    pub const ALL: &'static [NotificationKind] = &[
        NotificationKind::ProjectDueSoon,
        NotificationKind::ProjectFinished,
        NotificationKind::ProjectHardDeleteSoon,
        NotificationKind::ProjectPermanentlyDeleted,
    ];

    /// Value stored in `notifications.kind`.
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::ProjectDueSoon => "PROJECT_DUE_SOON",
            NotificationKind::ProjectFinished => "PROJECT_FINISHED",
            NotificationKind::ProjectHardDeleteSoon => "PROJECT_HARD_DELETE_SOON",
            NotificationKind::ProjectPermanentlyDeleted => "PROJECT_PERMANENTLY_DELETED",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| CoreError::InvalidArgument(format!("Invalid NotificationKind '{s}'")))
    }
}

/// Deep link to a project page.
pub fn project_url(project_id: DbId) -> String {
    format!("/projects/{project_id}")
}

/// One notification addressed to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: DbId,
    pub kind: NotificationKind,
    pub content: String,
    pub url: String,
    pub project_id: Option<DbId>,
}

impl Notification {
    /// A notification about `project_id`, linking to its page.
    pub fn for_project(
        user_id: DbId,
        kind: NotificationKind,
        project_id: DbId,
        content: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            kind,
            content: content.into(),
            url: project_url(project_id),
            project_id: Some(project_id),
        }
    }
}

/// Failure to deliver a single notification.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Failed to store notification: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Notification sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for user notifications.
///
/// Delivery is per notification; a failure for one user must not stop the
/// caller from notifying the rest.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<(), NotifyError>;
}
