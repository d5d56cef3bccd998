//! Repository for the `issues` table.

use crewboard_core::models::{IssuePatch, NewIssue};
use crewboard_core::status::IssueStatus;
use crewboard_core::types::{DbId, Timestamp};
use sqlx::PgConnection;

use crate::models::issue::IssueRow;

const COLUMNS: &str = "id, project_id, title, description, status, priority, due_date, \
                       created_by, created_at, updated_at, finished_at, archived_at";

pub struct IssueRepo;

impl IssueRepo {
    pub async fn create(
        conn: &mut PgConnection,
        input: &NewIssue,
        now: Timestamp,
    ) -> Result<IssueRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO issues
                (project_id, title, description, status, priority, due_date, created_by, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, IssueRow>(&query)
            .bind(input.project_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.status.as_str())
            .bind(input.priority)
            .bind(input.due_date)
            .bind(input.created_by)
            .bind(now)
            .fetch_one(conn)
            .await
    }

    /// Find an issue by ID, including archived rows.
    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<IssueRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM issues WHERE id = $1");
        sqlx::query_as::<_, IssueRow>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Find an issue and take a row lock until the transaction ends, so
    /// concurrent assignee changes on the same issue serialize.
    pub async fn find_by_id_for_update(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<IssueRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM issues WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, IssueRow>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Non-archived issues of a project, newest first.
    pub async fn list_for_project(
        conn: &mut PgConnection,
        project_id: DbId,
    ) -> Result<Vec<IssueRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM issues
             WHERE project_id = $1 AND archived_at IS NULL
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, IssueRow>(&query)
            .bind(project_id)
            .fetch_all(conn)
            .await
    }

    /// Apply a resolved patch. `finished_at` is only touched when the patch
    /// says so.
    pub async fn update(
        conn: &mut PgConnection,
        id: DbId,
        patch: &IssuePatch,
        now: Timestamp,
    ) -> Result<IssueRow, sqlx::Error> {
        let query = format!(
            "UPDATE issues SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                priority = COALESCE($5, priority),
                due_date = COALESCE($6, due_date),
                finished_at = CASE WHEN $7 THEN $8 ELSE finished_at END,
                updated_at = $9
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, IssueRow>(&query)
            .bind(id)
            .bind(&patch.title)
            .bind(&patch.description)
            .bind(patch.status.map(IssueStatus::as_str))
            .bind(patch.priority)
            .bind(patch.due_date)
            .bind(patch.finished_at.is_some())
            .bind(patch.finished_at.flatten())
            .bind(now)
            .fetch_one(conn)
            .await
    }

    pub async fn set_status(
        conn: &mut PgConnection,
        id: DbId,
        status: IssueStatus,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE issues SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .bind(now)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Archive an issue. Returns `false` if it was already archived.
    pub async fn archive(
        conn: &mut PgConnection,
        id: DbId,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE issues SET archived_at = $2, updated_at = $2
             WHERE id = $1 AND archived_at IS NULL",
        )
        .bind(id)
        .bind(now)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
