//! Issue lifecycle use cases.
//!
//! Assignee mutations lock the issue row, write the edge, then hand the new
//! assignee count to [`issue::reconcile_status`] so the
//! `UNASSIGNED ⇔ no assignees` invariant is restored before commit.

use chrono::Utc;
use crewboard_core::access::Operation;
use crewboard_core::error::{CoreError, ServiceResult};
use crewboard_core::issue;
use crewboard_core::models::{
    validate_input, CreateIssue, Issue, IssueDetail, IssuePatch, NewIssue, UpdateIssue,
};
use crewboard_core::store::{Store, StoreTx};
use crewboard_core::types::{DbId, Timestamp};

use crate::support::{authorize, require_project};

pub struct IssueService<S> {
    store: S,
}

impl<S: Store> IssueService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    // -----------------------------------------------------------------------
    // create_issue
    // -----------------------------------------------------------------------

    /// Create an issue, optionally with initial assignees. The issue and its
    /// assignee edges are written in one transaction.
    pub async fn create_issue(
        &self,
        project_id: DbId,
        user_id: DbId,
        input: CreateIssue,
    ) -> ServiceResult<IssueDetail> {
        validate_input(&input)?;
        ensure_title(&input.title)?;
        issue::validate_priority(input.priority)?;

        let mut tx = self.store.begin().await?;
        let project = require_project(&mut tx, project_id).await?;
        authorize(&mut tx, &project, user_id, Operation::Write).await?;

        let assignee_ids = issue::dedup_assignees(&input.assignee_ids);
        if !assignee_ids.is_empty() {
            let active = tx.count_active_members(project_id, &assignee_ids).await?;
            if active != assignee_ids.len() as i64 {
                return Err(CoreError::invalid(
                    "every assignee must be an active member of the project",
                )
                .into());
            }
        }

        let now = Utc::now();
        let new_issue = NewIssue {
            project_id,
            title: input.title.trim().to_string(),
            description: input.description,
            status: issue::initial_status(assignee_ids.len()),
            priority: input.priority,
            due_date: input.due_date,
            created_by: user_id,
        };
        let created = tx.insert_issue(&new_issue, now).await?;
        tx.insert_assignees(created.id, project_id, &assignee_ids, now)
            .await?;
        tx.commit().await?;

        tracing::info!(
            project_id,
            issue_id = created.id,
            user_id,
            assignees = assignee_ids.len(),
            status = %created.status,
            "Issue created"
        );
        Ok(IssueDetail {
            issue: created,
            assignee_ids,
        })
    }

    // -----------------------------------------------------------------------
    // archive_issue
    // -----------------------------------------------------------------------

    /// Archive an issue. A second call fails with `Forbidden`.
    pub async fn archive_issue(
        &self,
        project_id: DbId,
        issue_id: DbId,
        user_id: DbId,
    ) -> ServiceResult<()> {
        let mut tx = self.store.begin().await?;
        let project = require_project(&mut tx, project_id).await?;
        let member = authorize(&mut tx, &project, user_id, Operation::Write).await?;

        let current = tx.lock_issue(issue_id).await?;
        let current = issue::ensure_in_project(current, issue_id, project_id)?;
        if current.is_archived() {
            return Err(CoreError::forbidden("issue is already archived").into());
        }
        issue::ensure_editor(&member, &current)?;

        if !tx.archive_issue(issue_id, Utc::now()).await? {
            return Err(CoreError::forbidden("issue is already archived").into());
        }
        tx.commit().await?;

        tracing::info!(project_id, issue_id, user_id, "Issue archived");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // add_assignee / remove_assignee
    // -----------------------------------------------------------------------

    /// Assign `target_user_id`. An UNASSIGNED issue moves to IN_PROGRESS.
    pub async fn add_assignee(
        &self,
        project_id: DbId,
        issue_id: DbId,
        requester_id: DbId,
        target_user_id: DbId,
    ) -> ServiceResult<IssueDetail> {
        let mut tx = self.store.begin().await?;
        let current = self
            .load_for_assignment(&mut tx, project_id, issue_id, requester_id)
            .await?;

        let active = tx
            .count_active_members(project_id, &[target_user_id])
            .await?;
        if active != 1 {
            return Err(CoreError::InvalidArgument(format!(
                "user {target_user_id} is not an active member of the project"
            ))
            .into());
        }
        if tx.is_assigned(issue_id, target_user_id).await? {
            return Err(CoreError::Conflict(format!(
                "user {target_user_id} is already assigned to this issue"
            ))
            .into());
        }

        let now = Utc::now();
        tx.insert_assignees(issue_id, project_id, &[target_user_id], now)
            .await?;
        let detail = reconcile(&mut tx, current, now).await?;
        tx.commit().await?;

        tracing::info!(
            project_id,
            issue_id,
            requester_id,
            target_user_id,
            status = %detail.issue.status,
            "Assignee added"
        );
        Ok(detail)
    }

    /// Unassign `target_user_id`. Removing the last assignee moves the issue
    /// back to UNASSIGNED.
    pub async fn remove_assignee(
        &self,
        project_id: DbId,
        issue_id: DbId,
        requester_id: DbId,
        target_user_id: DbId,
    ) -> ServiceResult<IssueDetail> {
        let mut tx = self.store.begin().await?;
        let current = self
            .load_for_assignment(&mut tx, project_id, issue_id, requester_id)
            .await?;

        if !tx.delete_assignee(issue_id, target_user_id).await? {
            return Err(CoreError::NotFound {
                entity: "IssueAssignee",
                id: target_user_id,
            }
            .into());
        }

        let now = Utc::now();
        let detail = reconcile(&mut tx, current, now).await?;
        tx.commit().await?;

        tracing::info!(
            project_id,
            issue_id,
            requester_id,
            target_user_id,
            status = %detail.issue.status,
            "Assignee removed"
        );
        Ok(detail)
    }

    /// Shared guard chain for assignee mutations; locks the issue row.
    async fn load_for_assignment(
        &self,
        tx: &mut S::Tx,
        project_id: DbId,
        issue_id: DbId,
        requester_id: DbId,
    ) -> ServiceResult<Issue> {
        let project = require_project(tx, project_id).await?;
        let member = authorize(tx, &project, requester_id, Operation::Write).await?;
        let locked = tx.lock_issue(issue_id).await?;
        let current = issue::ensure_mutable(locked, issue_id, project_id)?;
        issue::ensure_assignable(&current)?;
        issue::ensure_editor(&member, &current)?;
        Ok(current)
    }

    // -----------------------------------------------------------------------
    // update_issue
    // -----------------------------------------------------------------------

    /// Partially update an issue. Only `Some` fields are written; a status
    /// change must agree with the current assignee count.
    pub async fn update_issue(
        &self,
        project_id: DbId,
        issue_id: DbId,
        user_id: DbId,
        input: UpdateIssue,
    ) -> ServiceResult<Issue> {
        validate_input(&input)?;
        if let Some(title) = &input.title {
            ensure_title(title)?;
        }
        if let Some(priority) = input.priority {
            issue::validate_priority(priority)?;
        }

        let mut tx = self.store.begin().await?;
        let project = require_project(&mut tx, project_id).await?;
        let member = authorize(&mut tx, &project, user_id, Operation::Write).await?;
        let locked = tx.lock_issue(issue_id).await?;
        let current = issue::ensure_mutable(locked, issue_id, project_id)?;
        issue::ensure_editor(&member, &current)?;

        let now = Utc::now();
        let mut patch = IssuePatch {
            title: input.title.map(|t| t.trim().to_string()),
            description: input.description,
            priority: input.priority,
            due_date: input.due_date,
            ..IssuePatch::default()
        };
        if let Some(requested) = input.status.filter(|s| *s != current.status) {
            let count = tx.count_assignees(issue_id).await?;
            issue::check_status_request(requested, count)?;
            patch.status = Some(requested);
            patch.finished_at = issue::finished_at_transition(current.status, requested, now);
        }

        let updated = tx.update_issue(issue_id, &patch, now).await?;
        tx.commit().await?;

        tracing::info!(project_id, issue_id, user_id, status = %updated.status, "Issue updated");
        Ok(updated)
    }

    // -----------------------------------------------------------------------
    // reads
    // -----------------------------------------------------------------------

    /// One issue with its assignees. Archived issues fail with `Deleted`.
    pub async fn get_issue_detail(
        &self,
        project_id: DbId,
        issue_id: DbId,
        user_id: DbId,
    ) -> ServiceResult<IssueDetail> {
        let mut tx = self.store.begin().await?;
        let project = require_project(&mut tx, project_id).await?;
        authorize(&mut tx, &project, user_id, Operation::Read).await?;
        let loaded = tx.load_issue(issue_id).await?;
        let found = issue::ensure_mutable(loaded, issue_id, project_id)?;
        let assignee_ids = tx.list_assignees(issue_id).await?;
        Ok(IssueDetail {
            issue: found,
            assignee_ids,
        })
    }

    /// Non-archived issues of a project, newest first.
    pub async fn list_issues(&self, project_id: DbId, user_id: DbId) -> ServiceResult<Vec<Issue>> {
        let mut tx = self.store.begin().await?;
        let project = require_project(&mut tx, project_id).await?;
        authorize(&mut tx, &project, user_id, Operation::Read).await?;
        let issues = tx.list_issues(project_id).await?;
        tracing::debug!(project_id, count = issues.len(), "Listed issues");
        Ok(issues)
    }
}

fn ensure_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        Err(CoreError::invalid("title must not be blank"))
    } else {
        Ok(())
    }
}

/// Re-derive the status from the assignee count and return the fresh detail.
async fn reconcile<T: StoreTx>(tx: &mut T, mut current: Issue, now: Timestamp) -> ServiceResult<IssueDetail> {
    let assignee_ids = tx.list_assignees(current.id).await?;
    if let Some(next) = issue::reconcile_status(current.status, assignee_ids.len() as i64) {
        tx.set_issue_status(current.id, next, now).await?;
        current.status = next;
        current.updated_at = now;
    }
    Ok(IssueDetail {
        issue: current,
        assignee_ids,
    })
}
