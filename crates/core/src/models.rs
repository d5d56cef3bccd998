//! Entity snapshots and input DTOs shared by every layer.
//!
//! Snapshots are plain values loaded by the storage gateway; the rule
//! modules ([`access`](crate::access), [`membership`](crate::membership),
//! [`issue`](crate::issue)) decide over them without touching storage.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::status::{IssueStatus, MemberRole, MemberStatus, ProjectStatus};
use crate::types::{Date, DbId, Timestamp};

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

/// A project and its lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub start_date: Date,
    /// Due date.
    pub end_date: Date,
    /// Hard-delete deadline. Non-null means the project is soft-deleted.
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Project {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_done(&self) -> bool {
        self.status == ProjectStatus::Done
    }
}

/// DTO for creating a project.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProject {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    pub description: Option<String>,
    pub start_date: Date,
    pub end_date: Date,
}

/// DTO for updating a project. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProject {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
}

// ---------------------------------------------------------------------------
// ProjectMember
// ---------------------------------------------------------------------------

/// A `(project, user)` membership row, including soft-deleted ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMember {
    pub project_id: DbId,
    pub user_id: DbId,
    pub role: MemberRole,
    pub status: MemberStatus,
    pub invited_at: Timestamp,
    pub joined_at: Option<Timestamp>,
    /// Non-null means removed, left, declined or cancelled.
    pub deleted_at: Option<Timestamp>,
}

impl ProjectMember {
    /// A row that has not been soft-deleted.
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Live and accepted: the only state in which a member may act.
    pub fn is_resolvable(&self) -> bool {
        self.is_live() && self.status == MemberStatus::Active
    }

    pub fn is_owner(&self) -> bool {
        self.role == MemberRole::Owner
    }
}

/// A user account as seen by this core. Owned by the account system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: DbId,
    pub deleted_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Issue
// ---------------------------------------------------------------------------

/// An issue row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: DbId,
    pub project_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub status: IssueStatus,
    pub priority: i16,
    pub due_date: Option<Date>,
    pub created_by: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub finished_at: Option<Timestamp>,
    /// Non-null means archived (logically deleted).
    pub archived_at: Option<Timestamp>,
}

impl Issue {
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

/// An issue together with its current assignees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueDetail {
    pub issue: Issue,
    pub assignee_ids: Vec<DbId>,
}

/// DTO for creating an issue.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateIssue {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,
    pub description: Option<String>,
    #[validate(range(min = 0, max = 5, message = "priority must be between 0 and 5"))]
    pub priority: i16,
    pub due_date: Option<Date>,
    #[serde(default)]
    pub assignee_ids: Vec<DbId>,
}

/// DTO for updating an issue. Only `Some` fields are applied.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateIssue {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<IssueStatus>,
    #[validate(range(min = 0, max = 5, message = "priority must be between 0 and 5"))]
    pub priority: Option<i16>,
    pub due_date: Option<Date>,
}

/// The fully-resolved row written by the gateway on issue insert.
#[derive(Debug, Clone)]
pub struct NewIssue {
    pub project_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub status: IssueStatus,
    pub priority: i16,
    pub due_date: Option<Date>,
    pub created_by: DbId,
}

/// The fully-resolved patch written by the gateway on issue update.
///
/// `finished_at` is tri-state: `None` leaves it, `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct IssuePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<IssueStatus>,
    pub priority: Option<i16>,
    pub due_date: Option<Date>,
    pub finished_at: Option<Option<Timestamp>>,
}

/// Run `validator` rules on a DTO and surface failures as
/// [`CoreError::InvalidArgument`](crate::error::CoreError::InvalidArgument).
pub fn validate_input<T: Validate>(input: &T) -> Result<(), crate::error::CoreError> {
    input
        .validate()
        .map_err(|errs| crate::error::CoreError::InvalidArgument(errs.to_string()))
}
