//! Storage gateway contract.
//!
//! A [`Store`] hands out transactions; every read and write a use case needs
//! goes through one [`StoreTx`], so guard-then-write sequences are atomic.
//! Dropping a transaction without calling [`StoreTx::commit`] rolls it back.
//!
//! `Option` returns mean "no such row"; `Err` is always an infrastructure
//! failure and is never reinterpreted as a domain error.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::models::{
    CreateProject, Issue, IssuePatch, NewIssue, Project, ProjectMember, UpdateProject, UserAccount,
};
use crate::status::{IssueStatus, MemberRole, MemberStatus, ProjectStatus};
use crate::types::{Date, DbId, Timestamp};

pub type StoreResult<T> = Result<T, StorageError>;

/// Factory for gateway transactions.
#[async_trait]
pub trait Store: Send + Sync {
    type Tx: StoreTx;

    /// Open a new transaction.
    async fn begin(&self) -> StoreResult<Self::Tx>;
}

/// One open gateway transaction.
#[async_trait]
pub trait StoreTx: Send {
    // ========================================================================
    // Accounts
    // ========================================================================

    async fn load_user(&mut self, user_id: DbId) -> StoreResult<Option<UserAccount>>;

    // ========================================================================
    // Projects
    // ========================================================================

    /// Load a project, including soft-deleted ones.
    async fn load_project(&mut self, project_id: DbId) -> StoreResult<Option<Project>>;

    /// Insert an ACTIVE project.
    async fn insert_project(&mut self, input: &CreateProject, now: Timestamp) -> StoreResult<Project>;

    /// Apply the `Some` fields of `input`.
    async fn update_project(
        &mut self,
        project_id: DbId,
        input: &UpdateProject,
        now: Timestamp,
    ) -> StoreResult<Project>;

    async fn set_project_status(
        &mut self,
        project_id: DbId,
        status: ProjectStatus,
        now: Timestamp,
    ) -> StoreResult<()>;

    /// Set or clear the hard-delete deadline.
    async fn set_project_deleted_at(
        &mut self,
        project_id: DbId,
        deleted_at: Option<Timestamp>,
        now: Timestamp,
    ) -> StoreResult<()>;

    // ========================================================================
    // Members
    // ========================================================================

    /// Load the membership row for the pair, including soft-deleted ones.
    async fn load_member(
        &mut self,
        project_id: DbId,
        user_id: DbId,
    ) -> StoreResult<Option<ProjectMember>>;

    /// Live (not soft-deleted) rows, ACTIVE and INVITED.
    async fn list_members(&mut self, project_id: DbId) -> StoreResult<Vec<ProjectMember>>;

    async fn insert_member(
        &mut self,
        project_id: DbId,
        user_id: DbId,
        role: MemberRole,
        status: MemberStatus,
        now: Timestamp,
    ) -> StoreResult<ProjectMember>;

    /// Flip a soft-deleted row back to INVITED/MEMBER.
    async fn revive_member(
        &mut self,
        project_id: DbId,
        user_id: DbId,
        now: Timestamp,
    ) -> StoreResult<ProjectMember>;

    async fn update_member_role(
        &mut self,
        project_id: DbId,
        user_id: DbId,
        role: MemberRole,
    ) -> StoreResult<()>;

    /// INVITED → ACTIVE with `joined_at = now`.
    async fn activate_member(
        &mut self,
        project_id: DbId,
        user_id: DbId,
        now: Timestamp,
    ) -> StoreResult<()>;

    async fn soft_delete_member(
        &mut self,
        project_id: DbId,
        user_id: DbId,
        now: Timestamp,
    ) -> StoreResult<()>;

    /// Count how many of `user_ids` are ACTIVE, non-deleted members.
    async fn count_active_members(&mut self, project_id: DbId, user_ids: &[DbId])
        -> StoreResult<i64>;

    /// User ids of every ACTIVE, non-deleted member.
    async fn active_member_ids(&mut self, project_id: DbId) -> StoreResult<Vec<DbId>>;

    // ========================================================================
    // Issues
    // ========================================================================

    async fn load_issue(&mut self, issue_id: DbId) -> StoreResult<Option<Issue>>;

    /// Load an issue and lock it until the transaction ends.
    async fn lock_issue(&mut self, issue_id: DbId) -> StoreResult<Option<Issue>>;

    /// Non-archived issues of a project, newest first.
    async fn list_issues(&mut self, project_id: DbId) -> StoreResult<Vec<Issue>>;

    async fn insert_issue(&mut self, input: &NewIssue, now: Timestamp) -> StoreResult<Issue>;

    async fn update_issue(
        &mut self,
        issue_id: DbId,
        patch: &IssuePatch,
        now: Timestamp,
    ) -> StoreResult<Issue>;

    async fn set_issue_status(
        &mut self,
        issue_id: DbId,
        status: IssueStatus,
        now: Timestamp,
    ) -> StoreResult<()>;

    /// Returns `false` if the issue was already archived.
    async fn archive_issue(&mut self, issue_id: DbId, now: Timestamp) -> StoreResult<bool>;

    // ========================================================================
    // Assignees
    // ========================================================================

    /// Batch-insert assignee edges.
    async fn insert_assignees(
        &mut self,
        issue_id: DbId,
        project_id: DbId,
        user_ids: &[DbId],
        now: Timestamp,
    ) -> StoreResult<u64>;

    /// Returns `false` if the edge did not exist.
    async fn delete_assignee(&mut self, issue_id: DbId, user_id: DbId) -> StoreResult<bool>;

    async fn list_assignees(&mut self, issue_id: DbId) -> StoreResult<Vec<DbId>>;

    async fn count_assignees(&mut self, issue_id: DbId) -> StoreResult<i64>;

    async fn is_assigned(&mut self, issue_id: DbId, user_id: DbId) -> StoreResult<bool>;

    // ========================================================================
    // Lifecycle sweep predicates
    // ========================================================================

    /// ACTIVE projects whose due date is `date`.
    async fn projects_due_on(&mut self, date: Date) -> StoreResult<Vec<Project>>;

    /// ACTIVE projects whose due date is before `today`.
    async fn overdue_active_projects(&mut self, today: Date) -> StoreResult<Vec<Project>>;

    /// Flip the given projects to DONE in one write, skipping rows that are no
    /// longer ACTIVE. Returns the ids of the rows changed.
    async fn complete_projects(
        &mut self,
        project_ids: &[DbId],
        now: Timestamp,
    ) -> StoreResult<Vec<DbId>>;

    /// Projects whose hard-delete deadline falls in `[start, end)`.
    async fn projects_hard_deleting_on(
        &mut self,
        start: Timestamp,
        end: Timestamp,
    ) -> StoreResult<Vec<Project>>;

    // ========================================================================
    // Transaction control
    // ========================================================================

    async fn commit(self) -> StoreResult<()>;
}
