//! Issue row model.

use crewboard_core::models::Issue;
use crewboard_core::types::{Date, DbId, Timestamp};
use sqlx::FromRow;

use super::decode;

/// A row from the `issues` table.
#[derive(Debug, Clone, FromRow)]
pub struct IssueRow {
    pub id: DbId,
    pub project_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: i16,
    pub due_date: Option<Date>,
    pub created_by: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub finished_at: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
}

impl IssueRow {
    pub fn into_domain(self) -> Result<Issue, sqlx::Error> {
        Ok(Issue {
            id: self.id,
            project_id: self.project_id,
            title: self.title,
            description: self.description,
            status: decode(&self.status)?,
            priority: self.priority,
            due_date: self.due_date,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
            finished_at: self.finished_at,
            archived_at: self.archived_at,
        })
    }
}
