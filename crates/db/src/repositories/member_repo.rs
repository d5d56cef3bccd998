//! Repository for the `project_members` table.
//!
//! Rows are soft-deleted via `deleted_at` and kept so a later re-invite can
//! revive them.

use crewboard_core::status::{MemberRole, MemberStatus};
use crewboard_core::types::{DbId, Timestamp};
use sqlx::PgConnection;

use crate::models::member::ProjectMemberRow;

const COLUMNS: &str = "project_id, user_id, role, status, invited_at, joined_at, deleted_at";

pub struct MemberRepo;

impl MemberRepo {
    /// Find the row for `(project_id, user_id)`, including soft-deleted rows.
    pub async fn find(
        conn: &mut PgConnection,
        project_id: DbId,
        user_id: DbId,
    ) -> Result<Option<ProjectMemberRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM project_members WHERE project_id = $1 AND user_id = $2");
        sqlx::query_as::<_, ProjectMemberRow>(&query)
            .bind(project_id)
            .bind(user_id)
            .fetch_optional(conn)
            .await
    }

    /// List live rows (ACTIVE and INVITED), owner first.
    pub async fn list_live(
        conn: &mut PgConnection,
        project_id: DbId,
    ) -> Result<Vec<ProjectMemberRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM project_members
             WHERE project_id = $1 AND deleted_at IS NULL
             ORDER BY CASE role WHEN 'OWNER' THEN 0 WHEN 'ADMIN' THEN 1 ELSE 2 END, invited_at"
        );
        sqlx::query_as::<_, ProjectMemberRow>(&query)
            .bind(project_id)
            .fetch_all(conn)
            .await
    }

    /// Insert a new membership row. ACTIVE rows get `joined_at = now`.
    pub async fn insert(
        conn: &mut PgConnection,
        project_id: DbId,
        user_id: DbId,
        role: MemberRole,
        status: MemberStatus,
        now: Timestamp,
    ) -> Result<ProjectMemberRow, sqlx::Error> {
        let joined_at = (status == MemberStatus::Active).then_some(now);
        let query = format!(
            "INSERT INTO project_members (project_id, user_id, role, status, invited_at, joined_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProjectMemberRow>(&query)
            .bind(project_id)
            .bind(user_id)
            .bind(role.as_str())
            .bind(status.as_str())
            .bind(now)
            .bind(joined_at)
            .fetch_one(conn)
            .await
    }

    /// Revive a soft-deleted row as a fresh MEMBER invitation.
    pub async fn revive(
        conn: &mut PgConnection,
        project_id: DbId,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<ProjectMemberRow, sqlx::Error> {
        let query = format!(
            "UPDATE project_members SET
                role = 'MEMBER',
                status = 'INVITED',
                invited_at = $3,
                joined_at = NULL,
                deleted_at = NULL
             WHERE project_id = $1 AND user_id = $2 AND deleted_at IS NOT NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProjectMemberRow>(&query)
            .bind(project_id)
            .bind(user_id)
            .bind(now)
            .fetch_one(conn)
            .await
    }

    pub async fn update_role(
        conn: &mut PgConnection,
        project_id: DbId,
        user_id: DbId,
        role: MemberRole,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE project_members SET role = $3
             WHERE project_id = $1 AND user_id = $2 AND deleted_at IS NULL",
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role.as_str())
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Accept an invitation: INVITED → ACTIVE.
    pub async fn activate(
        conn: &mut PgConnection,
        project_id: DbId,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE project_members SET status = 'ACTIVE', joined_at = $3
             WHERE project_id = $1 AND user_id = $2 AND status = 'INVITED' AND deleted_at IS NULL",
        )
        .bind(project_id)
        .bind(user_id)
        .bind(now)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn soft_delete(
        conn: &mut PgConnection,
        project_id: DbId,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE project_members SET deleted_at = $3
             WHERE project_id = $1 AND user_id = $2 AND deleted_at IS NULL",
        )
        .bind(project_id)
        .bind(user_id)
        .bind(now)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count how many of `user_ids` are ACTIVE, non-deleted members.
    pub async fn count_active(
        conn: &mut PgConnection,
        project_id: DbId,
        user_ids: &[DbId],
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM project_members
             WHERE project_id = $1 AND user_id = ANY($2)
               AND status = 'ACTIVE' AND deleted_at IS NULL",
        )
        .bind(project_id)
        .bind(user_ids)
        .fetch_one(conn)
        .await
    }

    /// User ids of every ACTIVE, non-deleted member.
    pub async fn active_user_ids(
        conn: &mut PgConnection,
        project_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT user_id FROM project_members
             WHERE project_id = $1 AND status = 'ACTIVE' AND deleted_at IS NULL
             ORDER BY user_id",
        )
        .bind(project_id)
        .fetch_all(conn)
        .await
    }
}
