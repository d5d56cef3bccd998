//! In-process [`Store`] backend.
//!
//! State lives behind one `tokio::sync::Mutex`. A transaction holds the lock
//! for its whole lifetime and works on a private copy; `commit` writes the
//! copy back and dropping the transaction discards it. Transactions are
//! therefore fully serialized, which is stricter than PostgreSQL and enough
//! for tests and local runs.
//!
//! Constraint checks mirror the SQL schema where the services depend on them
//! (membership primary key, single owner, assignee uniqueness and the
//! assignee → membership foreign key).

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use crewboard_core::error::StorageError;
use crewboard_core::models::{
    CreateProject, Issue, IssuePatch, NewIssue, Project, ProjectMember, UpdateProject, UserAccount,
};
use crewboard_core::status::{IssueStatus, MemberRole, MemberStatus, ProjectStatus};
use crewboard_core::store::{Store, StoreResult, StoreTx};
use crewboard_core::types::{Date, DbId, Timestamp};
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone)]
struct AssigneeEdge {
    assigned_at: Timestamp,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: BTreeMap<DbId, UserAccount>,
    projects: BTreeMap<DbId, Project>,
    members: BTreeMap<(DbId, DbId), ProjectMember>,
    issues: BTreeMap<DbId, Issue>,
    assignees: BTreeMap<(DbId, DbId), AssigneeEdge>,
    next_project_id: DbId,
    next_issue_id: DbId,
}

/// Shared handle to the in-memory state. Clones see the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    failing: Arc<std::sync::Mutex<HashSet<&'static str>>>,
    completed_elsewhere: Arc<std::sync::Mutex<HashSet<DbId>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to the named gateway method fail with a storage
    /// error, e.g. `"overdue_active_projects"`.
    pub fn fail_operation(&self, name: &'static str) {
        if let Ok(mut set) = self.failing.lock() {
            set.insert(name);
        }
    }

    /// Have another writer complete `project_id` between a transaction's
    /// reads and its next `complete_projects` call. Transactions here are
    /// serialized, so this is the only way to reach that interleaving.
    pub fn complete_concurrently(&self, project_id: DbId) {
        if let Ok(mut set) = self.completed_elsewhere.lock() {
            set.insert(project_id);
        }
    }

    // ── Seeding ─────────────────────────────────────────────────────────

    pub async fn add_user(&self, id: DbId) {
        self.state
            .lock()
            .await
            .users
            .insert(id, UserAccount { id, deleted_at: None });
    }

    pub async fn delete_user(&self, id: DbId, at: Timestamp) {
        if let Some(user) = self.state.lock().await.users.get_mut(&id) {
            user.deleted_at = Some(at);
        }
    }

    /// Insert or overwrite a project row as-is.
    pub async fn put_project(&self, project: Project) {
        let mut state = self.state.lock().await;
        state.next_project_id = state.next_project_id.max(project.id);
        state.projects.insert(project.id, project);
    }

    /// Insert or overwrite a membership row as-is.
    pub async fn put_member(&self, member: ProjectMember) {
        self.state
            .lock()
            .await
            .members
            .insert((member.project_id, member.user_id), member);
    }

    // ── Inspection ──────────────────────────────────────────────────────

    pub async fn project(&self, id: DbId) -> Option<Project> {
        self.state.lock().await.projects.get(&id).cloned()
    }

    pub async fn member(&self, project_id: DbId, user_id: DbId) -> Option<ProjectMember> {
        self.state
            .lock()
            .await
            .members
            .get(&(project_id, user_id))
            .cloned()
    }

    pub async fn issue(&self, id: DbId) -> Option<Issue> {
        self.state.lock().await.issues.get(&id).cloned()
    }

    pub async fn issues(&self) -> Vec<Issue> {
        self.state.lock().await.issues.values().cloned().collect()
    }

    pub async fn assignees(&self, issue_id: DbId) -> Vec<DbId> {
        self.state.lock().await.assignee_ids(issue_id)
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> StoreResult<MemoryTx> {
        check(&self.failing, "begin")?;
        let guard = Arc::clone(&self.state).lock_owned().await;
        let work = guard.clone();
        Ok(MemoryTx {
            guard,
            work,
            failing: Arc::clone(&self.failing),
            completed_elsewhere: Arc::clone(&self.completed_elsewhere),
        })
    }
}

/// One open in-memory transaction.
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
    failing: Arc<std::sync::Mutex<HashSet<&'static str>>>,
    completed_elsewhere: Arc<std::sync::Mutex<HashSet<DbId>>>,
}

fn check(failing: &std::sync::Mutex<HashSet<&'static str>>, op: &'static str) -> StoreResult<()> {
    let injected = failing.lock().map(|set| set.contains(op)).unwrap_or(false);
    if injected {
        Err(StorageError::new(format!("injected failure in {op}")))
    } else {
        Ok(())
    }
}

fn missing(entity: &str, id: impl std::fmt::Debug) -> StorageError {
    StorageError::new(format!("no {entity} row for {id:?}"))
}

fn role_rank(role: MemberRole) -> u8 {
    match role {
        MemberRole::Owner => 0,
        MemberRole::Admin => 1,
        MemberRole::Member => 2,
    }
}

impl MemoryState {
    fn assignee_ids(&self, issue_id: DbId) -> Vec<DbId> {
        let mut edges: Vec<(Timestamp, DbId)> = self
            .assignees
            .iter()
            .filter(|((i, _), _)| *i == issue_id)
            .map(|((_, u), edge)| (edge.assigned_at, *u))
            .collect();
        edges.sort();
        edges.into_iter().map(|(_, u)| u).collect()
    }

    fn project_mut(&mut self, id: DbId) -> StoreResult<&mut Project> {
        self.projects.get_mut(&id).ok_or_else(|| missing("project", id))
    }

    fn issue_mut(&mut self, id: DbId) -> StoreResult<&mut Issue> {
        self.issues.get_mut(&id).ok_or_else(|| missing("issue", id))
    }

    fn live_member_mut(&mut self, project_id: DbId, user_id: DbId) -> Option<&mut ProjectMember> {
        self.members
            .get_mut(&(project_id, user_id))
            .filter(|m| m.deleted_at.is_none())
    }

    fn projects_where(&self, pred: impl Fn(&Project) -> bool) -> Vec<Project> {
        self.projects.values().filter(|p| pred(p)).cloned().collect()
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn load_user(&mut self, user_id: DbId) -> StoreResult<Option<UserAccount>> {
        check(&self.failing, "load_user")?;
        Ok(self.work.users.get(&user_id).cloned())
    }

    async fn load_project(&mut self, project_id: DbId) -> StoreResult<Option<Project>> {
        check(&self.failing, "load_project")?;
        Ok(self.work.projects.get(&project_id).cloned())
    }

    async fn insert_project(&mut self, input: &CreateProject, now: Timestamp) -> StoreResult<Project> {
        check(&self.failing, "insert_project")?;
        self.work.next_project_id += 1;
        let project = Project {
            id: self.work.next_project_id,
            name: input.name.clone(),
            description: input.description.clone(),
            status: ProjectStatus::Active,
            start_date: input.start_date,
            end_date: input.end_date,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        self.work.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn update_project(
        &mut self,
        project_id: DbId,
        input: &UpdateProject,
        now: Timestamp,
    ) -> StoreResult<Project> {
        check(&self.failing, "update_project")?;
        let project = self.work.project_mut(project_id)?;
        if let Some(name) = &input.name {
            project.name = name.clone();
        }
        if let Some(description) = &input.description {
            project.description = Some(description.clone());
        }
        if let Some(start) = input.start_date {
            project.start_date = start;
        }
        if let Some(end) = input.end_date {
            project.end_date = end;
        }
        project.updated_at = now;
        Ok(project.clone())
    }

    async fn set_project_status(
        &mut self,
        project_id: DbId,
        status: ProjectStatus,
        now: Timestamp,
    ) -> StoreResult<()> {
        check(&self.failing, "set_project_status")?;
        let project = self.work.project_mut(project_id)?;
        project.status = status;
        project.updated_at = now;
        Ok(())
    }

    async fn set_project_deleted_at(
        &mut self,
        project_id: DbId,
        deleted_at: Option<Timestamp>,
        now: Timestamp,
    ) -> StoreResult<()> {
        check(&self.failing, "set_project_deleted_at")?;
        let project = self.work.project_mut(project_id)?;
        project.deleted_at = deleted_at;
        project.updated_at = now;
        Ok(())
    }

    async fn load_member(
        &mut self,
        project_id: DbId,
        user_id: DbId,
    ) -> StoreResult<Option<ProjectMember>> {
        check(&self.failing, "load_member")?;
        Ok(self.work.members.get(&(project_id, user_id)).cloned())
    }

    async fn list_members(&mut self, project_id: DbId) -> StoreResult<Vec<ProjectMember>> {
        check(&self.failing, "list_members")?;
        let mut rows: Vec<ProjectMember> = self
            .work
            .members
            .values()
            .filter(|m| m.project_id == project_id && m.deleted_at.is_none())
            .cloned()
            .collect();
        rows.sort_by_key(|m| (role_rank(m.role), m.invited_at));
        Ok(rows)
    }

    async fn insert_member(
        &mut self,
        project_id: DbId,
        user_id: DbId,
        role: MemberRole,
        status: MemberStatus,
        now: Timestamp,
    ) -> StoreResult<ProjectMember> {
        check(&self.failing, "insert_member")?;
        if self.work.members.contains_key(&(project_id, user_id)) {
            return Err(StorageError::new(format!(
                "duplicate key project_members ({project_id}, {user_id})"
            )));
        }
        if role == MemberRole::Owner
            && self
                .work
                .members
                .values()
                .any(|m| m.project_id == project_id && m.role == MemberRole::Owner)
        {
            return Err(StorageError::new(format!(
                "project {project_id} already has an owner"
            )));
        }
        let member = ProjectMember {
            project_id,
            user_id,
            role,
            status,
            invited_at: now,
            joined_at: (status == MemberStatus::Active).then_some(now),
            deleted_at: None,
        };
        self.work
            .members
            .insert((project_id, user_id), member.clone());
        Ok(member)
    }

    async fn revive_member(
        &mut self,
        project_id: DbId,
        user_id: DbId,
        now: Timestamp,
    ) -> StoreResult<ProjectMember> {
        check(&self.failing, "revive_member")?;
        let member = self
            .work
            .members
            .get_mut(&(project_id, user_id))
            .filter(|m| m.deleted_at.is_some())
            .ok_or_else(|| missing("removed project_members", (project_id, user_id)))?;
        member.role = MemberRole::Member;
        member.status = MemberStatus::Invited;
        member.invited_at = now;
        member.joined_at = None;
        member.deleted_at = None;
        Ok(member.clone())
    }

    async fn update_member_role(
        &mut self,
        project_id: DbId,
        user_id: DbId,
        role: MemberRole,
    ) -> StoreResult<()> {
        check(&self.failing, "update_member_role")?;
        if let Some(member) = self.work.live_member_mut(project_id, user_id) {
            member.role = role;
        }
        Ok(())
    }

    async fn activate_member(
        &mut self,
        project_id: DbId,
        user_id: DbId,
        now: Timestamp,
    ) -> StoreResult<()> {
        check(&self.failing, "activate_member")?;
        if let Some(member) = self
            .work
            .live_member_mut(project_id, user_id)
            .filter(|m| m.status == MemberStatus::Invited)
        {
            member.status = MemberStatus::Active;
            member.joined_at = Some(now);
        }
        Ok(())
    }

    async fn soft_delete_member(
        &mut self,
        project_id: DbId,
        user_id: DbId,
        now: Timestamp,
    ) -> StoreResult<()> {
        check(&self.failing, "soft_delete_member")?;
        if let Some(member) = self.work.live_member_mut(project_id, user_id) {
            member.deleted_at = Some(now);
        }
        Ok(())
    }

    async fn count_active_members(
        &mut self,
        project_id: DbId,
        user_ids: &[DbId],
    ) -> StoreResult<i64> {
        check(&self.failing, "count_active_members")?;
        let count = self
            .work
            .members
            .values()
            .filter(|m| {
                m.project_id == project_id && m.is_resolvable() && user_ids.contains(&m.user_id)
            })
            .count();
        Ok(count as i64)
    }

    async fn active_member_ids(&mut self, project_id: DbId) -> StoreResult<Vec<DbId>> {
        check(&self.failing, "active_member_ids")?;
        // BTreeMap keys are ordered by (project_id, user_id)
        Ok(self
            .work
            .members
            .values()
            .filter(|m| m.project_id == project_id && m.is_resolvable())
            .map(|m| m.user_id)
            .collect())
    }

    async fn load_issue(&mut self, issue_id: DbId) -> StoreResult<Option<Issue>> {
        check(&self.failing, "load_issue")?;
        Ok(self.work.issues.get(&issue_id).cloned())
    }

    async fn lock_issue(&mut self, issue_id: DbId) -> StoreResult<Option<Issue>> {
        check(&self.failing, "lock_issue")?;
        // the transaction already holds the store lock
        Ok(self.work.issues.get(&issue_id).cloned())
    }

    async fn list_issues(&mut self, project_id: DbId) -> StoreResult<Vec<Issue>> {
        check(&self.failing, "list_issues")?;
        let mut issues: Vec<Issue> = self
            .work
            .issues
            .values()
            .filter(|i| i.project_id == project_id && i.archived_at.is_none())
            .cloned()
            .collect();
        issues.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(issues)
    }

    async fn insert_issue(&mut self, input: &NewIssue, now: Timestamp) -> StoreResult<Issue> {
        check(&self.failing, "insert_issue")?;
        self.work.next_issue_id += 1;
        let issue = Issue {
            id: self.work.next_issue_id,
            project_id: input.project_id,
            title: input.title.clone(),
            description: input.description.clone(),
            status: input.status,
            priority: input.priority,
            due_date: input.due_date,
            created_by: input.created_by,
            created_at: now,
            updated_at: now,
            finished_at: None,
            archived_at: None,
        };
        self.work.issues.insert(issue.id, issue.clone());
        Ok(issue)
    }

    async fn update_issue(
        &mut self,
        issue_id: DbId,
        patch: &IssuePatch,
        now: Timestamp,
    ) -> StoreResult<Issue> {
        check(&self.failing, "update_issue")?;
        let issue = self.work.issue_mut(issue_id)?;
        if let Some(title) = &patch.title {
            issue.title = title.clone();
        }
        if let Some(description) = &patch.description {
            issue.description = Some(description.clone());
        }
        if let Some(status) = patch.status {
            issue.status = status;
        }
        if let Some(priority) = patch.priority {
            issue.priority = priority;
        }
        if let Some(due) = patch.due_date {
            issue.due_date = Some(due);
        }
        if let Some(finished_at) = patch.finished_at {
            issue.finished_at = finished_at;
        }
        issue.updated_at = now;
        Ok(issue.clone())
    }

    async fn set_issue_status(
        &mut self,
        issue_id: DbId,
        status: IssueStatus,
        now: Timestamp,
    ) -> StoreResult<()> {
        check(&self.failing, "set_issue_status")?;
        let issue = self.work.issue_mut(issue_id)?;
        issue.status = status;
        issue.updated_at = now;
        Ok(())
    }

    async fn archive_issue(&mut self, issue_id: DbId, now: Timestamp) -> StoreResult<bool> {
        check(&self.failing, "archive_issue")?;
        match self.work.issues.get_mut(&issue_id) {
            Some(issue) if issue.archived_at.is_none() => {
                issue.archived_at = Some(now);
                issue.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_assignees(
        &mut self,
        issue_id: DbId,
        project_id: DbId,
        user_ids: &[DbId],
        now: Timestamp,
    ) -> StoreResult<u64> {
        check(&self.failing, "insert_assignees")?;
        for user_id in user_ids {
            if !self.work.members.contains_key(&(project_id, *user_id)) {
                return Err(StorageError::new(format!(
                    "foreign key violation: no project_members row ({project_id}, {user_id})"
                )));
            }
            if self.work.assignees.contains_key(&(issue_id, *user_id)) {
                return Err(StorageError::new(format!(
                    "duplicate key issue_assignees ({issue_id}, {user_id})"
                )));
            }
            self.work.assignees.insert(
                (issue_id, *user_id),
                AssigneeEdge { assigned_at: now },
            );
        }
        Ok(user_ids.len() as u64)
    }

    async fn delete_assignee(&mut self, issue_id: DbId, user_id: DbId) -> StoreResult<bool> {
        check(&self.failing, "delete_assignee")?;
        Ok(self.work.assignees.remove(&(issue_id, user_id)).is_some())
    }

    async fn list_assignees(&mut self, issue_id: DbId) -> StoreResult<Vec<DbId>> {
        check(&self.failing, "list_assignees")?;
        Ok(self.work.assignee_ids(issue_id))
    }

    async fn count_assignees(&mut self, issue_id: DbId) -> StoreResult<i64> {
        check(&self.failing, "count_assignees")?;
        Ok(self.work.assignee_ids(issue_id).len() as i64)
    }

    async fn is_assigned(&mut self, issue_id: DbId, user_id: DbId) -> StoreResult<bool> {
        check(&self.failing, "is_assigned")?;
        Ok(self.work.assignees.contains_key(&(issue_id, user_id)))
    }

    async fn projects_due_on(&mut self, date: Date) -> StoreResult<Vec<Project>> {
        check(&self.failing, "projects_due_on")?;
        Ok(self
            .work
            .projects_where(|p| p.status == ProjectStatus::Active && p.end_date == date))
    }

    async fn overdue_active_projects(&mut self, today: Date) -> StoreResult<Vec<Project>> {
        check(&self.failing, "overdue_active_projects")?;
        Ok(self
            .work
            .projects_where(|p| p.status == ProjectStatus::Active && p.end_date < today))
    }

    async fn complete_projects(
        &mut self,
        project_ids: &[DbId],
        now: Timestamp,
    ) -> StoreResult<Vec<DbId>> {
        check(&self.failing, "complete_projects")?;
        let elsewhere: Vec<DbId> = self
            .completed_elsewhere
            .lock()
            .map(|mut set| set.drain().collect())
            .unwrap_or_default();
        for id in elsewhere {
            if let Some(project) = self.work.projects.get_mut(&id) {
                project.status = ProjectStatus::Done;
            }
        }

        let mut completed = Vec::new();
        for id in project_ids {
            if let Some(project) = self
                .work
                .projects
                .get_mut(id)
                .filter(|p| p.status == ProjectStatus::Active)
            {
                project.status = ProjectStatus::Done;
                project.updated_at = now;
                completed.push(*id);
            }
        }
        Ok(completed)
    }

    async fn projects_hard_deleting_on(
        &mut self,
        start: Timestamp,
        end: Timestamp,
    ) -> StoreResult<Vec<Project>> {
        check(&self.failing, "projects_hard_deleting_on")?;
        Ok(self
            .work
            .projects_where(|p| matches!(p.deleted_at, Some(d) if d >= start && d < end)))
    }

    async fn commit(mut self) -> StoreResult<()> {
        check(&self.failing, "commit")?;
        *self.guard = self.work;
        Ok(())
    }
}
