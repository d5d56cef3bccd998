//! Repository for the `issue_assignees` edge table.

use crewboard_core::types::{DbId, Timestamp};
use sqlx::PgConnection;

pub struct AssigneeRepo;

impl AssigneeRepo {
    /// Insert one edge per user in a single statement.
    pub async fn insert_many(
        conn: &mut PgConnection,
        issue_id: DbId,
        project_id: DbId,
        user_ids: &[DbId],
        now: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        if user_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "INSERT INTO issue_assignees (issue_id, project_id, user_id, assigned_at)
             SELECT $1, $2, u, $4 FROM UNNEST($3::BIGINT[]) AS u",
        )
        .bind(issue_id)
        .bind(project_id)
        .bind(user_ids)
        .bind(now)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(
        conn: &mut PgConnection,
        issue_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM issue_assignees WHERE issue_id = $1 AND user_id = $2")
            .bind(issue_id)
            .bind(user_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_user_ids(
        conn: &mut PgConnection,
        issue_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT user_id FROM issue_assignees WHERE issue_id = $1 ORDER BY assigned_at, user_id",
        )
        .bind(issue_id)
        .fetch_all(conn)
        .await
    }

    pub async fn count(conn: &mut PgConnection, issue_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM issue_assignees WHERE issue_id = $1")
            .bind(issue_id)
            .fetch_one(conn)
            .await
    }

    pub async fn exists(
        conn: &mut PgConnection,
        issue_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM issue_assignees WHERE issue_id = $1 AND user_id = $2)",
        )
        .bind(issue_id)
        .bind(user_id)
        .fetch_one(conn)
        .await
    }
}
