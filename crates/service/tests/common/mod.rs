#![allow(dead_code)]

use chrono::{Duration, Utc};
use crewboard_core::models::{CreateIssue, CreateProject, ProjectMember};
use crewboard_core::status::{MemberRole, MemberStatus};
use crewboard_core::types::DbId;
use crewboard_service::{
    AccessService, IssueService, MembershipService, MemoryStore, ProjectService,
};

pub const OWNER: DbId = 1;

/// Users 1..=8 exist; user 1 owns one fresh ACTIVE project.
pub struct Fixture {
    pub store: MemoryStore,
    pub project_id: DbId,
    pub projects: ProjectService<MemoryStore>,
    pub members: MembershipService<MemoryStore>,
    pub issues: IssueService<MemoryStore>,
    pub access: AccessService<MemoryStore>,
}

pub async fn fixture() -> Fixture {
    let store = MemoryStore::new();
    for id in 1..=8 {
        store.add_user(id).await;
    }

    let projects = ProjectService::new(store.clone());
    let today = Utc::now().date_naive();
    let project = projects
        .create_project(
            OWNER,
            CreateProject {
                name: "Crewboard".to_string(),
                description: Some("fixture project".to_string()),
                start_date: today - Duration::days(30),
                end_date: today + Duration::days(30),
            },
        )
        .await
        .expect("fixture project should be created");

    Fixture {
        project_id: project.id,
        projects,
        members: MembershipService::new(store.clone()),
        issues: IssueService::new(store.clone()),
        access: AccessService::new(store.clone()),
        store,
    }
}

impl Fixture {
    /// Seed a live row directly, bypassing the invite flow.
    pub async fn seed_member(&self, user_id: DbId, role: MemberRole, status: MemberStatus) {
        let now = Utc::now();
        self.store
            .put_member(ProjectMember {
                project_id: self.project_id,
                user_id,
                role,
                status,
                invited_at: now,
                joined_at: (status == MemberStatus::Active).then_some(now),
                deleted_at: None,
            })
            .await;
    }

    pub async fn active(&self, user_id: DbId, role: MemberRole) {
        self.seed_member(user_id, role, MemberStatus::Active).await;
    }

    pub async fn member_row(&self, user_id: DbId) -> ProjectMember {
        self.store
            .member(self.project_id, user_id)
            .await
            .expect("member row should exist")
    }
}

pub fn issue_input(title: &str, assignee_ids: Vec<DbId>) -> CreateIssue {
    CreateIssue {
        title: title.to_string(),
        description: None,
        priority: 2,
        due_date: None,
        assignee_ids,
    }
}
