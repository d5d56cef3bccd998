//! Issue lifecycle against the in-memory store.
//!
//! Every test that mutates assignees also checks the invariant
//! `status == UNASSIGNED` iff the issue has no assignees.

mod common;

use assert_matches::assert_matches;
use common::{fixture, issue_input, Fixture, OWNER};
use crewboard_core::error::{CoreError, ErrorKind, ServiceError};
use crewboard_core::models::UpdateIssue;
use crewboard_core::status::{IssueStatus, MemberRole, MemberStatus};
use crewboard_core::types::DbId;

fn domain(err: ServiceError) -> CoreError {
    match err {
        ServiceError::Domain(e) => e,
        other => panic!("expected a domain error, got {other}"),
    }
}

async fn assert_invariant(f: &Fixture) {
    for issue in f.store.issues().await {
        let count = f.store.assignees(issue.id).await.len();
        assert_eq!(
            issue.status == IssueStatus::Unassigned,
            count == 0,
            "issue {} is {} with {count} assignees",
            issue.id,
            issue.status
        );
    }
}

async fn with_members() -> Fixture {
    let f = fixture().await;
    f.active(2, MemberRole::Member).await;
    f.active(3, MemberRole::Member).await;
    f.active(4, MemberRole::Admin).await;
    f
}

async fn create(f: &Fixture, creator: DbId, assignees: Vec<DbId>) -> DbId {
    f.issues
        .create_issue(f.project_id, creator, issue_input("Fix login", assignees))
        .await
        .unwrap()
        .issue
        .id
}

// ---------------------------------------------------------------------------
// create_issue
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_without_assignees_is_unassigned() {
    let f = with_members().await;
    let detail = f
        .issues
        .create_issue(f.project_id, 2, issue_input("Write docs", vec![]))
        .await
        .unwrap();
    assert_eq!(detail.issue.status, IssueStatus::Unassigned);
    assert!(detail.assignee_ids.is_empty());
    assert_eq!(detail.issue.created_by, 2);
    assert_invariant(&f).await;
}

#[tokio::test]
async fn create_with_assignees_is_in_progress_and_deduplicated() {
    let f = with_members().await;
    let detail = f
        .issues
        .create_issue(f.project_id, 2, issue_input("Ship it", vec![3, 2, 3]))
        .await
        .unwrap();
    assert_eq!(detail.issue.status, IssueStatus::InProgress);
    assert_eq!(detail.assignee_ids, vec![3, 2]);
    assert_eq!(f.store.assignees(detail.issue.id).await.len(), 2);
    assert_invariant(&f).await;
}

#[tokio::test]
async fn create_with_invalid_assignee_writes_nothing() {
    let f = with_members().await;
    f.seed_member(5, MemberRole::Member, MemberStatus::Invited).await;

    for bad in [vec![2, 5], vec![2, 42]] {
        let err = domain(
            f.issues
                .create_issue(f.project_id, 2, issue_input("Partial", bad))
                .await
                .unwrap_err(),
        );
        assert_matches!(err, CoreError::InvalidArgument(_));
    }
    assert!(f.store.issues().await.is_empty());
}

#[tokio::test]
async fn create_validates_input() {
    let f = with_members().await;

    let mut high = issue_input("Too urgent", vec![]);
    high.priority = 6;
    let err = domain(f.issues.create_issue(f.project_id, 2, high).await.unwrap_err());
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let blank = domain(
        f.issues
            .create_issue(f.project_id, 2, issue_input("   ", vec![]))
            .await
            .unwrap_err(),
    );
    assert_matches!(blank, CoreError::InvalidArgument(_));

    let outsider = domain(
        f.issues
            .create_issue(f.project_id, 7, issue_input("Hi", vec![]))
            .await
            .unwrap_err(),
    );
    assert_eq!(outsider.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn assignee_insert_failure_rolls_back_the_issue() {
    let f = with_members().await;
    f.store.fail_operation("insert_assignees");

    let err = f
        .issues
        .create_issue(f.project_id, 2, issue_input("Atomic", vec![3]))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Storage(_));
    assert!(f.store.issues().await.is_empty());
}

// ---------------------------------------------------------------------------
// assignees
// ---------------------------------------------------------------------------

#[tokio::test]
async fn adding_first_assignee_starts_progress() {
    let f = with_members().await;
    let issue_id = create(&f, 2, vec![]).await;

    let detail = f
        .issues
        .add_assignee(f.project_id, issue_id, 2, 3)
        .await
        .unwrap();
    assert_eq!(detail.issue.status, IssueStatus::InProgress);
    assert_eq!(detail.assignee_ids, vec![3]);
    assert_eq!(
        f.store.issue(issue_id).await.unwrap().status,
        IssueStatus::InProgress
    );
    assert_invariant(&f).await;
}

#[tokio::test]
async fn removing_last_assignee_unassigns() {
    let f = with_members().await;
    let issue_id = create(&f, 2, vec![2, 3]).await;

    let detail = f
        .issues
        .remove_assignee(f.project_id, issue_id, 2, 3)
        .await
        .unwrap();
    assert_eq!(detail.issue.status, IssueStatus::InProgress);
    assert_invariant(&f).await;

    let detail = f
        .issues
        .remove_assignee(f.project_id, issue_id, 2, 2)
        .await
        .unwrap();
    assert_eq!(detail.issue.status, IssueStatus::Unassigned);
    assert!(detail.assignee_ids.is_empty());
    assert_invariant(&f).await;
}

#[tokio::test]
async fn assignee_rules() {
    let f = with_members().await;
    f.seed_member(5, MemberRole::Member, MemberStatus::Invited).await;
    let issue_id = create(&f, 2, vec![3]).await;

    let dup = domain(
        f.issues
            .add_assignee(f.project_id, issue_id, 2, 3)
            .await
            .unwrap_err(),
    );
    assert_matches!(dup, CoreError::Conflict(_));

    let invited = domain(
        f.issues
            .add_assignee(f.project_id, issue_id, 2, 5)
            .await
            .unwrap_err(),
    );
    assert_matches!(invited, CoreError::InvalidArgument(_));

    let not_assigned = domain(
        f.issues
            .remove_assignee(f.project_id, issue_id, 2, 4)
            .await
            .unwrap_err(),
    );
    assert_matches!(not_assigned, CoreError::NotFound { entity: "IssueAssignee", .. });

    // an admin is neither owner nor creator
    let admin = domain(
        f.issues
            .add_assignee(f.project_id, issue_id, 4, 2)
            .await
            .unwrap_err(),
    );
    assert_eq!(admin.kind(), ErrorKind::Forbidden);

    f.issues
        .add_assignee(f.project_id, issue_id, OWNER, 2)
        .await
        .unwrap();
    assert_invariant(&f).await;
}

#[tokio::test]
async fn done_issue_freezes_assignees() {
    let f = with_members().await;
    let issue_id = create(&f, 2, vec![3]).await;
    f.issues
        .update_issue(
            f.project_id,
            issue_id,
            2,
            UpdateIssue {
                status: Some(IssueStatus::Done),
                ..UpdateIssue::default()
            },
        )
        .await
        .unwrap();

    let err = domain(
        f.issues
            .remove_assignee(f.project_id, issue_id, 2, 3)
            .await
            .unwrap_err(),
    );
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_invariant(&f).await;
}

// ---------------------------------------------------------------------------
// update_issue
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_updates_respect_assignees() {
    let f = with_members().await;
    let empty = create(&f, 2, vec![]).await;
    let busy = create(&f, 2, vec![3]).await;

    let to_progress = domain(
        f.issues
            .update_issue(
                f.project_id,
                empty,
                2,
                UpdateIssue {
                    status: Some(IssueStatus::InProgress),
                    ..UpdateIssue::default()
                },
            )
            .await
            .unwrap_err(),
    );
    assert_matches!(to_progress, CoreError::InvalidArgument(_));

    let to_unassigned = domain(
        f.issues
            .update_issue(
                f.project_id,
                busy,
                2,
                UpdateIssue {
                    status: Some(IssueStatus::Unassigned),
                    ..UpdateIssue::default()
                },
            )
            .await
            .unwrap_err(),
    );
    assert_matches!(to_unassigned, CoreError::InvalidArgument(_));
    assert_invariant(&f).await;
}

#[tokio::test]
async fn finished_at_follows_done() {
    let f = with_members().await;
    let issue_id = create(&f, 2, vec![3]).await;

    let done = f
        .issues
        .update_issue(
            f.project_id,
            issue_id,
            2,
            UpdateIssue {
                status: Some(IssueStatus::Done),
                ..UpdateIssue::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(done.status, IssueStatus::Done);
    assert!(done.finished_at.is_some());

    let reopened = f
        .issues
        .update_issue(
            f.project_id,
            issue_id,
            OWNER,
            UpdateIssue {
                status: Some(IssueStatus::InProgress),
                ..UpdateIssue::default()
            },
        )
        .await
        .unwrap();
    assert!(reopened.finished_at.is_none());
}

#[tokio::test]
async fn partial_update_keeps_other_fields() {
    let f = with_members().await;
    let issue_id = create(&f, 2, vec![]).await;

    let updated = f
        .issues
        .update_issue(
            f.project_id,
            issue_id,
            2,
            UpdateIssue {
                priority: Some(5),
                ..UpdateIssue::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.priority, 5);
    assert_eq!(updated.title, "Fix login");
    assert_eq!(updated.status, IssueStatus::Unassigned);

    let stranger = domain(
        f.issues
            .update_issue(f.project_id, issue_id, 3, UpdateIssue::default())
            .await
            .unwrap_err(),
    );
    assert_eq!(stranger.kind(), ErrorKind::Forbidden);
}

// ---------------------------------------------------------------------------
// archive and reads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn archiving_twice_is_forbidden() {
    let f = with_members().await;
    let issue_id = create(&f, 2, vec![]).await;

    f.issues
        .archive_issue(f.project_id, issue_id, 2)
        .await
        .unwrap();
    let err = domain(
        f.issues
            .archive_issue(f.project_id, issue_id, 2)
            .await
            .unwrap_err(),
    );
    assert_matches!(err, CoreError::Forbidden(ref msg) if msg.contains("already archived"));
}

#[tokio::test]
async fn archived_issue_reads_as_deleted_and_rejects_mutation() {
    let f = with_members().await;
    let kept = create(&f, 2, vec![]).await;
    let gone = create(&f, 2, vec![]).await;
    f.issues.archive_issue(f.project_id, gone, OWNER).await.unwrap();

    let read = domain(
        f.issues
            .get_issue_detail(f.project_id, gone, 3)
            .await
            .unwrap_err(),
    );
    assert_matches!(read, CoreError::Deleted { entity: "Issue", .. });
    assert_eq!(read.kind(), ErrorKind::NotFound);

    let add = domain(
        f.issues
            .add_assignee(f.project_id, gone, 2, 3)
            .await
            .unwrap_err(),
    );
    assert_matches!(add, CoreError::Deleted { .. });

    let listed = f.issues.list_issues(f.project_id, 3).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, kept);
}

#[tokio::test]
async fn issue_from_another_project_is_rejected() {
    let f = with_members().await;
    let issue_id = create(&f, 2, vec![]).await;

    let err = domain(
        f.issues
            .get_issue_detail(f.project_id + 100, issue_id, 2)
            .await
            .unwrap_err(),
    );
    assert_matches!(err, CoreError::NotFound { entity: "Project", .. });
}

#[tokio::test]
async fn completed_project_is_read_only() {
    let f = with_members().await;
    let issue_id = create(&f, 2, vec![]).await;
    f.projects.complete_project(f.project_id, OWNER).await.unwrap();

    let err = domain(
        f.issues
            .add_assignee(f.project_id, issue_id, 2, 3)
            .await
            .unwrap_err(),
    );
    assert_matches!(err, CoreError::Forbidden(_));

    let detail = f
        .issues
        .get_issue_detail(f.project_id, issue_id, 3)
        .await
        .unwrap();
    assert_eq!(detail.issue.id, issue_id);
}
