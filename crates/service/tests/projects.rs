//! Project lifecycle and standalone access checks.

mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use common::{fixture, OWNER};
use crewboard_core::access::{Decision, Denial, Operation};
use crewboard_core::error::{CoreError, ErrorKind, ServiceError};
use crewboard_core::lifecycle::GRACE_PERIOD_DAYS;
use crewboard_core::models::{CreateProject, UpdateProject};
use crewboard_core::status::{MemberRole, MemberStatus, ProjectStatus};

fn domain(err: ServiceError) -> CoreError {
    match err {
        ServiceError::Domain(e) => e,
        other => panic!("expected a domain error, got {other}"),
    }
}

#[tokio::test]
async fn create_project_makes_creator_active_owner() {
    let f = fixture().await;
    let project = f.store.project(f.project_id).await.unwrap();
    assert_eq!(project.status, ProjectStatus::Active);
    assert!(project.deleted_at.is_none());

    let owner = f.member_row(OWNER).await;
    assert_eq!(owner.role, MemberRole::Owner);
    assert_eq!(owner.status, MemberStatus::Active);
}

#[tokio::test]
async fn create_project_validates_dates_and_owner() {
    let f = fixture().await;
    let today = Utc::now().date_naive();
    let input = CreateProject {
        name: "Backwards".into(),
        description: None,
        start_date: today,
        end_date: today - Duration::days(1),
    };
    let err = domain(f.projects.create_project(OWNER, input.clone()).await.unwrap_err());
    assert_matches!(err, CoreError::InvalidArgument(_));

    let fixed = CreateProject {
        end_date: today,
        ..input
    };
    let err = domain(f.projects.create_project(77, fixed).await.unwrap_err());
    assert_matches!(err, CoreError::NotFound { entity: "User", id: 77 });
}

#[tokio::test]
async fn update_project_requires_manager() {
    let f = fixture().await;
    f.active(2, MemberRole::Admin).await;
    f.active(3, MemberRole::Member).await;

    let renamed = f
        .projects
        .update_project(
            f.project_id,
            2,
            UpdateProject {
                name: Some("Renamed".into()),
                ..UpdateProject::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Renamed");

    let err = domain(
        f.projects
            .update_project(f.project_id, 3, UpdateProject::default())
            .await
            .unwrap_err(),
    );
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn complete_and_reopen() {
    let f = fixture().await;
    f.active(2, MemberRole::Admin).await;

    let err = domain(f.projects.complete_project(f.project_id, 2).await.unwrap_err());
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    f.projects.complete_project(f.project_id, OWNER).await.unwrap();
    assert_eq!(
        f.store.project(f.project_id).await.unwrap().status,
        ProjectStatus::Done
    );
    let again = domain(f.projects.complete_project(f.project_id, OWNER).await.unwrap_err());
    assert_matches!(again, CoreError::Conflict(_));

    f.projects.reopen_project(f.project_id, OWNER).await.unwrap();
    assert_eq!(
        f.store.project(f.project_id).await.unwrap().status,
        ProjectStatus::Active
    );
}

#[tokio::test]
async fn delete_sets_deadline_and_restore_clears_it() {
    let f = fixture().await;
    f.active(2, MemberRole::Member).await;

    let before = Utc::now();
    let deadline = f.projects.delete_project(f.project_id, OWNER).await.unwrap();
    assert!(deadline >= before + Duration::days(GRACE_PERIOD_DAYS));

    // members lose read access, the owner keeps it
    let err = domain(
        f.members
            .list_members(f.project_id, 2)
            .await
            .unwrap_err(),
    );
    assert_matches!(err, CoreError::Deleted { entity: "Project", .. });
    f.members.list_members(f.project_id, OWNER).await.unwrap();

    let again = domain(f.projects.delete_project(f.project_id, OWNER).await.unwrap_err());
    assert_eq!(again.kind(), ErrorKind::NotFound);

    let restored = f.projects.restore_project(f.project_id, OWNER).await.unwrap();
    assert!(restored.deleted_at.is_none());
}

#[tokio::test]
async fn restore_after_grace_period_is_forbidden() {
    let f = fixture().await;
    let mut project = f.store.project(f.project_id).await.unwrap();
    project.deleted_at = Some(Utc::now() - Duration::hours(1));
    f.store.put_project(project).await;

    let err = domain(f.projects.restore_project(f.project_id, OWNER).await.unwrap_err());
    assert_matches!(err, CoreError::Forbidden(_));

    let live = domain(
        f.projects
            .restore_project(f.project_id, 2)
            .await
            .unwrap_err(),
    );
    assert_eq!(live.kind(), ErrorKind::Forbidden);
}

// ---------------------------------------------------------------------------
// AccessService
// ---------------------------------------------------------------------------

#[tokio::test]
async fn access_checks_follow_policy() {
    let f = fixture().await;
    f.active(2, MemberRole::Member).await;
    f.seed_member(3, MemberRole::Member, MemberStatus::Invited).await;

    f.access
        .check(f.project_id, 2, Operation::FileUpload)
        .await
        .unwrap();
    assert_eq!(
        f.access
            .decide(f.project_id, 3, Operation::Read)
            .await
            .unwrap(),
        Decision::Denied(Denial::NotMember)
    );

    f.projects.complete_project(f.project_id, OWNER).await.unwrap();
    f.access
        .check(f.project_id, 2, Operation::Report)
        .await
        .unwrap();
    assert_eq!(
        f.access
            .decide(f.project_id, 2, Operation::FileUpload)
            .await
            .unwrap(),
        Decision::Denied(Denial::ProjectCompleted)
    );

    let missing = domain(
        f.access
            .check(f.project_id + 1, 2, Operation::Read)
            .await
            .unwrap_err(),
    );
    assert_matches!(missing, CoreError::NotFound { entity: "Project", .. });
}
