//! [`Store`] implementation over a PostgreSQL pool.
//!
//! [`PgTx`] owns one `sqlx::Transaction`; every gateway call runs on that
//! connection and is only made durable by [`StoreTx::commit`]. Dropping an
//! uncommitted `PgTx` rolls back, which is what `sqlx` does on drop.

use async_trait::async_trait;
use crewboard_core::error::StorageError;
use crewboard_core::models::{
    CreateProject, Issue, IssuePatch, NewIssue, Project, ProjectMember, UpdateProject, UserAccount,
};
use crewboard_core::status::{IssueStatus, MemberRole, MemberStatus, ProjectStatus};
use crewboard_core::store::{Store, StoreResult, StoreTx};
use crewboard_core::types::{Date, DbId, Timestamp};
use sqlx::{Postgres, Transaction};

use crate::models::issue::IssueRow;
use crate::models::member::ProjectMemberRow;
use crate::models::project::ProjectRow;
use crate::repositories::{AssigneeRepo, IssueRepo, MemberRepo, ProjectRepo, UserRepo};
use crate::DbPool;

/// Gateway handle shared by services and the scheduler.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> StoreResult<PgTx> {
        let tx = self.pool.begin().await.map_err(StorageError::new)?;
        Ok(PgTx { tx })
    }
}

/// One open PostgreSQL transaction.
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

fn projects(rows: Vec<ProjectRow>) -> StoreResult<Vec<Project>> {
    rows.into_iter()
        .map(|r| r.into_domain().map_err(StorageError::new))
        .collect()
}

fn issue(row: IssueRow) -> StoreResult<Issue> {
    row.into_domain().map_err(StorageError::new)
}

fn member(row: ProjectMemberRow) -> StoreResult<ProjectMember> {
    row.into_domain().map_err(StorageError::new)
}

#[async_trait]
impl StoreTx for PgTx {
    async fn load_user(&mut self, user_id: DbId) -> StoreResult<Option<UserAccount>> {
        let row = UserRepo::find_by_id(&mut *self.tx, user_id)
            .await
            .map_err(StorageError::new)?;
        Ok(row.map(UserAccount::from))
    }

    async fn load_project(&mut self, project_id: DbId) -> StoreResult<Option<Project>> {
        ProjectRepo::find_by_id(&mut *self.tx, project_id)
            .await
            .map_err(StorageError::new)?
            .map(|r| r.into_domain().map_err(StorageError::new))
            .transpose()
    }

    async fn insert_project(&mut self, input: &CreateProject, now: Timestamp) -> StoreResult<Project> {
        ProjectRepo::create(&mut *self.tx, input, now)
            .await
            .and_then(ProjectRow::into_domain)
            .map_err(StorageError::new)
    }

    async fn update_project(
        &mut self,
        project_id: DbId,
        input: &UpdateProject,
        now: Timestamp,
    ) -> StoreResult<Project> {
        ProjectRepo::update(&mut *self.tx, project_id, input, now)
            .await
            .and_then(ProjectRow::into_domain)
            .map_err(StorageError::new)
    }

    async fn set_project_status(
        &mut self,
        project_id: DbId,
        status: ProjectStatus,
        now: Timestamp,
    ) -> StoreResult<()> {
        ProjectRepo::set_status(&mut *self.tx, project_id, status, now)
            .await
            .map_err(StorageError::new)?;
        Ok(())
    }

    async fn set_project_deleted_at(
        &mut self,
        project_id: DbId,
        deleted_at: Option<Timestamp>,
        now: Timestamp,
    ) -> StoreResult<()> {
        ProjectRepo::set_deleted_at(&mut *self.tx, project_id, deleted_at, now)
            .await
            .map_err(StorageError::new)?;
        Ok(())
    }

    async fn load_member(
        &mut self,
        project_id: DbId,
        user_id: DbId,
    ) -> StoreResult<Option<ProjectMember>> {
        MemberRepo::find(&mut *self.tx, project_id, user_id)
            .await
            .map_err(StorageError::new)?
            .map(member)
            .transpose()
    }

    async fn list_members(&mut self, project_id: DbId) -> StoreResult<Vec<ProjectMember>> {
        MemberRepo::list_live(&mut *self.tx, project_id)
            .await
            .map_err(StorageError::new)?
            .into_iter()
            .map(member)
            .collect()
    }

    async fn insert_member(
        &mut self,
        project_id: DbId,
        user_id: DbId,
        role: MemberRole,
        status: MemberStatus,
        now: Timestamp,
    ) -> StoreResult<ProjectMember> {
        let row = MemberRepo::insert(&mut *self.tx, project_id, user_id, role, status, now)
            .await
            .map_err(StorageError::new)?;
        member(row)
    }

    async fn revive_member(
        &mut self,
        project_id: DbId,
        user_id: DbId,
        now: Timestamp,
    ) -> StoreResult<ProjectMember> {
        let row = MemberRepo::revive(&mut *self.tx, project_id, user_id, now)
            .await
            .map_err(StorageError::new)?;
        member(row)
    }

    async fn update_member_role(
        &mut self,
        project_id: DbId,
        user_id: DbId,
        role: MemberRole,
    ) -> StoreResult<()> {
        MemberRepo::update_role(&mut *self.tx, project_id, user_id, role)
            .await
            .map_err(StorageError::new)?;
        Ok(())
    }

    async fn activate_member(
        &mut self,
        project_id: DbId,
        user_id: DbId,
        now: Timestamp,
    ) -> StoreResult<()> {
        MemberRepo::activate(&mut *self.tx, project_id, user_id, now)
            .await
            .map_err(StorageError::new)?;
        Ok(())
    }

    async fn soft_delete_member(
        &mut self,
        project_id: DbId,
        user_id: DbId,
        now: Timestamp,
    ) -> StoreResult<()> {
        MemberRepo::soft_delete(&mut *self.tx, project_id, user_id, now)
            .await
            .map_err(StorageError::new)?;
        Ok(())
    }

    async fn count_active_members(
        &mut self,
        project_id: DbId,
        user_ids: &[DbId],
    ) -> StoreResult<i64> {
        MemberRepo::count_active(&mut *self.tx, project_id, user_ids)
            .await
            .map_err(StorageError::new)
    }

    async fn active_member_ids(&mut self, project_id: DbId) -> StoreResult<Vec<DbId>> {
        MemberRepo::active_user_ids(&mut *self.tx, project_id)
            .await
            .map_err(StorageError::new)
    }

    async fn load_issue(&mut self, issue_id: DbId) -> StoreResult<Option<Issue>> {
        IssueRepo::find_by_id(&mut *self.tx, issue_id)
            .await
            .map_err(StorageError::new)?
            .map(issue)
            .transpose()
    }

    async fn lock_issue(&mut self, issue_id: DbId) -> StoreResult<Option<Issue>> {
        IssueRepo::find_by_id_for_update(&mut *self.tx, issue_id)
            .await
            .map_err(StorageError::new)?
            .map(issue)
            .transpose()
    }

    async fn list_issues(&mut self, project_id: DbId) -> StoreResult<Vec<Issue>> {
        IssueRepo::list_for_project(&mut *self.tx, project_id)
            .await
            .map_err(StorageError::new)?
            .into_iter()
            .map(issue)
            .collect()
    }

    async fn insert_issue(&mut self, input: &NewIssue, now: Timestamp) -> StoreResult<Issue> {
        let row = IssueRepo::create(&mut *self.tx, input, now)
            .await
            .map_err(StorageError::new)?;
        issue(row)
    }

    async fn update_issue(
        &mut self,
        issue_id: DbId,
        patch: &IssuePatch,
        now: Timestamp,
    ) -> StoreResult<Issue> {
        let row = IssueRepo::update(&mut *self.tx, issue_id, patch, now)
            .await
            .map_err(StorageError::new)?;
        issue(row)
    }

    async fn set_issue_status(
        &mut self,
        issue_id: DbId,
        status: IssueStatus,
        now: Timestamp,
    ) -> StoreResult<()> {
        IssueRepo::set_status(&mut *self.tx, issue_id, status, now)
            .await
            .map_err(StorageError::new)?;
        Ok(())
    }

    async fn archive_issue(&mut self, issue_id: DbId, now: Timestamp) -> StoreResult<bool> {
        IssueRepo::archive(&mut *self.tx, issue_id, now)
            .await
            .map_err(StorageError::new)
    }

    async fn insert_assignees(
        &mut self,
        issue_id: DbId,
        project_id: DbId,
        user_ids: &[DbId],
        now: Timestamp,
    ) -> StoreResult<u64> {
        AssigneeRepo::insert_many(&mut *self.tx, issue_id, project_id, user_ids, now)
            .await
            .map_err(StorageError::new)
    }

    async fn delete_assignee(&mut self, issue_id: DbId, user_id: DbId) -> StoreResult<bool> {
        AssigneeRepo::delete(&mut *self.tx, issue_id, user_id)
            .await
            .map_err(StorageError::new)
    }

    async fn list_assignees(&mut self, issue_id: DbId) -> StoreResult<Vec<DbId>> {
        AssigneeRepo::list_user_ids(&mut *self.tx, issue_id)
            .await
            .map_err(StorageError::new)
    }

    async fn count_assignees(&mut self, issue_id: DbId) -> StoreResult<i64> {
        AssigneeRepo::count(&mut *self.tx, issue_id)
            .await
            .map_err(StorageError::new)
    }

    async fn is_assigned(&mut self, issue_id: DbId, user_id: DbId) -> StoreResult<bool> {
        AssigneeRepo::exists(&mut *self.tx, issue_id, user_id)
            .await
            .map_err(StorageError::new)
    }

    async fn projects_due_on(&mut self, date: Date) -> StoreResult<Vec<Project>> {
        let rows = ProjectRepo::list_active_due_on(&mut *self.tx, date)
            .await
            .map_err(StorageError::new)?;
        projects(rows)
    }

    async fn overdue_active_projects(&mut self, today: Date) -> StoreResult<Vec<Project>> {
        let rows = ProjectRepo::list_active_overdue(&mut *self.tx, today)
            .await
            .map_err(StorageError::new)?;
        projects(rows)
    }

    async fn complete_projects(
        &mut self,
        project_ids: &[DbId],
        now: Timestamp,
    ) -> StoreResult<Vec<DbId>> {
        let completed = ProjectRepo::complete_many(&mut *self.tx, project_ids, now)
            .await
            .map_err(StorageError::new)?;
        if completed.len() != project_ids.len() {
            tracing::debug!(
                requested = project_ids.len(),
                updated = completed.len(),
                "Some projects were no longer ACTIVE when completing"
            );
        }
        Ok(completed)
    }

    async fn projects_hard_deleting_on(
        &mut self,
        start: Timestamp,
        end: Timestamp,
    ) -> StoreResult<Vec<Project>> {
        let rows = ProjectRepo::list_hard_deleting_between(&mut *self.tx, start, end)
            .await
            .map_err(StorageError::new)?;
        projects(rows)
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await.map_err(StorageError::new)
    }
}
