//! Project row model.

use crewboard_core::models::Project;
use crewboard_core::types::{Date, DbId, Timestamp};
use sqlx::FromRow;

use super::decode;

/// A row from the `projects` table.
#[derive(Debug, Clone, FromRow)]
pub struct ProjectRow {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub start_date: Date,
    pub end_date: Date,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ProjectRow {
    pub fn into_domain(self) -> Result<Project, sqlx::Error> {
        Ok(Project {
            id: self.id,
            name: self.name,
            description: self.description,
            status: decode(&self.status)?,
            start_date: self.start_date,
            end_date: self.end_date,
            deleted_at: self.deleted_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
