//! Project lifecycle use cases: creation, manual completion, soft delete
//! with a grace period, and restore.

use chrono::Utc;
use crewboard_core::access::Operation;
use crewboard_core::error::{CoreError, ServiceResult};
use crewboard_core::lifecycle;
use crewboard_core::models::{validate_input, CreateProject, Project, UpdateProject};
use crewboard_core::status::{MemberRole, MemberStatus, ProjectStatus};
use crewboard_core::store::{Store, StoreTx};
use crewboard_core::types::{Date, DbId, Timestamp};

use crate::support::{authorize, ensure_owner, require_project};

pub struct ProjectService<S> {
    store: S,
}

impl<S: Store> ProjectService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create a project owned by `owner_id`. The project and its OWNER row
    /// are written together.
    pub async fn create_project(&self, owner_id: DbId, input: CreateProject) -> ServiceResult<Project> {
        validate_input(&input)?;
        check_dates(input.start_date, input.end_date)?;

        let mut tx = self.store.begin().await?;
        match tx.load_user(owner_id).await? {
            Some(user) if user.deleted_at.is_none() => {}
            _ => {
                return Err(CoreError::NotFound {
                    entity: "User",
                    id: owner_id,
                }
                .into())
            }
        }

        let now = Utc::now();
        let project = tx.insert_project(&input, now).await?;
        tx.insert_member(
            project.id,
            owner_id,
            MemberRole::Owner,
            MemberStatus::Active,
            now,
        )
        .await?;
        tx.commit().await?;

        tracing::info!(project_id = project.id, owner_id, name = %project.name, "Project created");
        Ok(project)
    }

    /// Update name, description or dates. OWNER or ADMIN of a writable
    /// project only.
    pub async fn update_project(
        &self,
        project_id: DbId,
        user_id: DbId,
        input: UpdateProject,
    ) -> ServiceResult<Project> {
        validate_input(&input)?;

        let mut tx = self.store.begin().await?;
        let project = require_project(&mut tx, project_id).await?;
        let member = authorize(&mut tx, &project, user_id, Operation::Write).await?;
        if !member.role.is_manager() {
            return Err(CoreError::forbidden("only the owner or an admin may edit the project").into());
        }
        check_dates(
            input.start_date.unwrap_or(project.start_date),
            input.end_date.unwrap_or(project.end_date),
        )?;

        let updated = tx.update_project(project_id, &input, Utc::now()).await?;
        tx.commit().await?;

        tracing::info!(project_id, user_id, "Project updated");
        Ok(updated)
    }

    /// Mark the project DONE ahead of its due date.
    pub async fn complete_project(&self, project_id: DbId, user_id: DbId) -> ServiceResult<()> {
        self.set_status(project_id, user_id, ProjectStatus::Done).await
    }

    /// Move a DONE project back to ACTIVE.
    pub async fn reopen_project(&self, project_id: DbId, user_id: DbId) -> ServiceResult<()> {
        self.set_status(project_id, user_id, ProjectStatus::Active).await
    }

    async fn set_status(
        &self,
        project_id: DbId,
        user_id: DbId,
        status: ProjectStatus,
    ) -> ServiceResult<()> {
        let mut tx = self.store.begin().await?;
        let project = require_project(&mut tx, project_id).await?;
        // Report is the category that tolerates DONE but not deletion
        let member = authorize(&mut tx, &project, user_id, Operation::Report).await?;
        ensure_owner(&project, &member)?;
        if project.status == status {
            return Err(CoreError::Conflict(format!("project is already {status}")).into());
        }

        tx.set_project_status(project_id, status, Utc::now()).await?;
        tx.commit().await?;

        tracing::info!(project_id, user_id, %status, "Project status changed");
        Ok(())
    }

    /// Soft-delete the project. It is permanently removed once the grace
    /// period ends unless restored first. Returns the hard-delete deadline.
    pub async fn delete_project(
        &self,
        project_id: DbId,
        user_id: DbId,
    ) -> ServiceResult<Timestamp> {
        let mut tx = self.store.begin().await?;
        let project = require_project(&mut tx, project_id).await?;
        let member = authorize(&mut tx, &project, user_id, Operation::Report).await?;
        ensure_owner(&project, &member)?;

        let now = Utc::now();
        let deadline = lifecycle::hard_delete_deadline(now);
        tx.set_project_deleted_at(project_id, Some(deadline), now)
            .await?;
        tx.commit().await?;

        tracing::info!(project_id, user_id, %deadline, "Project scheduled for deletion");
        Ok(deadline)
    }

    /// Undo a delete while the grace period is still running.
    pub async fn restore_project(&self, project_id: DbId, user_id: DbId) -> ServiceResult<Project> {
        let mut tx = self.store.begin().await?;
        let project = require_project(&mut tx, project_id).await?;
        // only the owner can still read a deleted project
        let member = authorize(&mut tx, &project, user_id, Operation::Read).await?;
        ensure_owner(&project, &member)?;

        let now = Utc::now();
        lifecycle::ensure_restorable(&project, now)?;
        tx.set_project_deleted_at(project_id, None, now).await?;
        let restored = require_project(&mut tx, project_id).await?;
        tx.commit().await?;

        tracing::info!(project_id, user_id, "Project restored");
        Ok(restored)
    }
}

fn check_dates(start: Date, end: Date) -> Result<(), CoreError> {
    if start > end {
        Err(CoreError::invalid("start_date must not be after end_date"))
    } else {
        Ok(())
    }
}
