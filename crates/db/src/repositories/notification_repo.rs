//! Repository for the `notifications` table.

use crewboard_core::types::DbId;
use sqlx::PgPool;

use crate::models::notification::NewNotificationRow;

/// Provides writes for user notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Create a notification for a user, returning the generated ID.
    pub async fn create(pool: &PgPool, input: &NewNotificationRow<'_>) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO notifications (user_id, project_id, kind, content, url) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id",
        )
        .bind(input.user_id)
        .bind(input.project_id)
        .bind(input.kind)
        .bind(input.content)
        .bind(input.url)
        .fetch_one(pool)
        .await
    }
}
