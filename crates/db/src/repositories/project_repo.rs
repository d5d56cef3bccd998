//! Repository for the `projects` table.

use crewboard_core::models::{CreateProject, UpdateProject};
use crewboard_core::status::ProjectStatus;
use crewboard_core::types::{Date, DbId, Timestamp};
use sqlx::PgConnection;

use crate::models::project::ProjectRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, name, description, status, start_date, end_date, deleted_at, created_at, updated_at";

/// Provides project reads, writes and the lifecycle sweep predicates.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a new ACTIVE project, returning the created row.
    pub async fn create(
        conn: &mut PgConnection,
        input: &CreateProject,
        now: Timestamp,
    ) -> Result<ProjectRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects (name, description, status, start_date, end_date, created_at, updated_at)
             VALUES ($1, $2, 'ACTIVE', $3, $4, $5, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProjectRow>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(now)
            .fetch_one(conn)
            .await
    }

    /// Find a project by ID, including soft-deleted rows.
    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<ProjectRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1");
        sqlx::query_as::<_, ProjectRow>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Update a project. Only non-`None` fields in `input` are applied.
    pub async fn update(
        conn: &mut PgConnection,
        id: DbId,
        input: &UpdateProject,
        now: Timestamp,
    ) -> Result<ProjectRow, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                start_date = COALESCE($4, start_date),
                end_date = COALESCE($5, end_date),
                updated_at = $6
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProjectRow>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(now)
            .fetch_one(conn)
            .await
    }

    /// Set the lifecycle status. Returns `true` if a row was updated.
    pub async fn set_status(
        conn: &mut PgConnection,
        id: DbId,
        status: ProjectStatus,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE projects SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .bind(now)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set (soft delete) or clear (restore) the hard-delete deadline.
    pub async fn set_deleted_at(
        conn: &mut PgConnection,
        id: DbId,
        deleted_at: Option<Timestamp>,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE projects SET deleted_at = $2, updated_at = $3 WHERE id = $1")
                .bind(id)
                .bind(deleted_at)
                .bind(now)
                .execute(conn)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Lifecycle sweep predicates ───────────────────────────────────────

    /// ACTIVE projects due exactly on `date`.
    pub async fn list_active_due_on(
        conn: &mut PgConnection,
        date: Date,
    ) -> Result<Vec<ProjectRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects
             WHERE status = 'ACTIVE' AND end_date = $1
             ORDER BY id"
        );
        sqlx::query_as::<_, ProjectRow>(&query)
            .bind(date)
            .fetch_all(conn)
            .await
    }

    /// ACTIVE projects whose due date is strictly before `today`.
    pub async fn list_active_overdue(
        conn: &mut PgConnection,
        today: Date,
    ) -> Result<Vec<ProjectRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects
             WHERE status = 'ACTIVE' AND end_date < $1
             ORDER BY id"
        );
        sqlx::query_as::<_, ProjectRow>(&query)
            .bind(today)
            .fetch_all(conn)
            .await
    }

    /// Flip every listed project that is still ACTIVE to DONE in one
    /// statement. Returns the ids of the rows actually changed; a project
    /// completed concurrently since it was listed is not among them.
    pub async fn complete_many(
        conn: &mut PgConnection,
        ids: &[DbId],
        now: Timestamp,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_scalar(
            "UPDATE projects SET status = 'DONE', updated_at = $2
             WHERE id = ANY($1) AND status = 'ACTIVE'
             RETURNING id",
        )
        .bind(ids)
        .bind(now)
        .fetch_all(conn)
        .await
    }

    /// Projects whose hard-delete deadline falls in `[start, end)`.
    pub async fn list_hard_deleting_between(
        conn: &mut PgConnection,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<ProjectRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects
             WHERE deleted_at >= $1 AND deleted_at < $2
             ORDER BY id"
        );
        sqlx::query_as::<_, ProjectRow>(&query)
            .bind(start)
            .bind(end)
            .fetch_all(conn)
            .await
    }
}
