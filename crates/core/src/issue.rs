//! Issue lifecycle rules.
//!
//! The invariant `status = UNASSIGNED ⇔ assignee count = 0` is maintained by
//! [`initial_status`] at creation, [`reconcile_status`] after every assignee
//! mutation, and [`check_status_request`] on manual status updates.

use crate::error::CoreError;
use crate::models::{Issue, ProjectMember};
use crate::status::{IssueStatus, MemberRole};
use crate::types::{DbId, Timestamp};

pub const MIN_PRIORITY: i16 = 0;
pub const MAX_PRIORITY: i16 = 5;

/// Validate that `priority` lies in `[0, 5]`.
pub fn validate_priority(priority: i16) -> Result<(), CoreError> {
    if (MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
        Ok(())
    } else {
        Err(CoreError::InvalidArgument(format!(
            "priority must be between {MIN_PRIORITY} and {MAX_PRIORITY}, got {priority}"
        )))
    }
}

/// Status of a freshly created issue.
pub fn initial_status(assignee_count: usize) -> IssueStatus {
    if assignee_count == 0 {
        IssueStatus::Unassigned
    } else {
        IssueStatus::InProgress
    }
}

/// Recompute the status after an assignee was added or removed.
///
/// Returns the new status when it must change, `None` when the current one
/// is still consistent with `assignee_count`.
pub fn reconcile_status(current: IssueStatus, assignee_count: i64) -> Option<IssueStatus> {
    match (current, assignee_count) {
        (IssueStatus::Unassigned, n) if n > 0 => Some(IssueStatus::InProgress),
        (IssueStatus::Unassigned, _) => None,
        (_, 0) => Some(IssueStatus::Unassigned),
        _ => None,
    }
}

/// Check that a manually requested status is compatible with the assignee
/// count.
pub fn check_status_request(requested: IssueStatus, assignee_count: i64) -> Result<(), CoreError> {
    match requested {
        IssueStatus::Unassigned if assignee_count > 0 => Err(CoreError::invalid(
            "cannot mark an issue UNASSIGNED while it has assignees",
        )),
        IssueStatus::InProgress | IssueStatus::Done if assignee_count == 0 => {
            Err(CoreError::InvalidArgument(format!(
                "cannot mark an issue {requested} without assignees"
            )))
        }
        _ => Ok(()),
    }
}

/// How `finished_at` should change when moving to `next`.
///
/// `None` leaves it untouched; `Some(None)` clears it.
pub fn finished_at_transition(
    current: IssueStatus,
    next: IssueStatus,
    now: Timestamp,
) -> Option<Option<Timestamp>> {
    match (current == IssueStatus::Done, next == IssueStatus::Done) {
        (false, true) => Some(Some(now)),
        (true, false) => Some(None),
        _ => None,
    }
}

/// Load-side check: the issue exists, belongs to `project_id`, and is not
/// archived.
pub fn ensure_mutable(
    issue: Option<Issue>,
    issue_id: DbId,
    project_id: DbId,
) -> Result<Issue, CoreError> {
    let issue = ensure_in_project(issue, issue_id, project_id)?;
    if issue.is_archived() {
        return Err(CoreError::Deleted {
            entity: "Issue",
            id: issue_id,
        });
    }
    Ok(issue)
}

/// The issue exists and belongs to `project_id`; archived issues pass.
pub fn ensure_in_project(
    issue: Option<Issue>,
    issue_id: DbId,
    project_id: DbId,
) -> Result<Issue, CoreError> {
    let issue = issue.ok_or(CoreError::NotFound {
        entity: "Issue",
        id: issue_id,
    })?;
    if issue.project_id != project_id {
        return Err(CoreError::forbidden("issue does not belong to this project"));
    }
    Ok(issue)
}

/// Only the project OWNER or the issue's creator may modify an issue.
pub fn ensure_editor(member: &ProjectMember, issue: &Issue) -> Result<(), CoreError> {
    if member.role == MemberRole::Owner || member.user_id == issue.created_by {
        Ok(())
    } else {
        Err(CoreError::forbidden(
            "only the project owner or the issue creator may modify this issue",
        ))
    }
}

/// Assignee mutations are frozen once an issue is DONE.
pub fn ensure_assignable(issue: &Issue) -> Result<(), CoreError> {
    if issue.status == IssueStatus::Done {
        Err(CoreError::forbidden("assignees of a completed issue cannot change"))
    } else {
        Ok(())
    }
}

/// Deduplicate requested assignee ids, keeping first-seen order.
pub fn dedup_assignees(ids: &[DbId]) -> Vec<DbId> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;

    use super::*;
    use crate::access::tests::member;
    use crate::status::MemberStatus;

    fn issue(status: IssueStatus) -> Issue {
        let now = Utc::now();
        Issue {
            id: 10,
            project_id: 1,
            title: "Fix login".into(),
            description: None,
            status,
            priority: 2,
            due_date: None,
            created_by: 3,
            created_at: now,
            updated_at: now,
            finished_at: None,
            archived_at: None,
        }
    }

    #[test]
    fn priority_bounds() {
        assert!(validate_priority(0).is_ok());
        assert!(validate_priority(5).is_ok());
        assert_matches!(validate_priority(6), Err(CoreError::InvalidArgument(_)));
        assert_matches!(validate_priority(-1), Err(CoreError::InvalidArgument(_)));
    }

    #[test]
    fn initial_status_follows_assignees() {
        assert_eq!(initial_status(0), IssueStatus::Unassigned);
        assert_eq!(initial_status(2), IssueStatus::InProgress);
    }

    #[test]
    fn reconcile_flips_only_at_the_boundaries() {
        assert_eq!(
            reconcile_status(IssueStatus::Unassigned, 1),
            Some(IssueStatus::InProgress)
        );
        assert_eq!(reconcile_status(IssueStatus::InProgress, 2), None);
        assert_eq!(
            reconcile_status(IssueStatus::InProgress, 0),
            Some(IssueStatus::Unassigned)
        );
        assert_eq!(reconcile_status(IssueStatus::Unassigned, 0), None);
    }

    #[test]
    fn reconciled_status_satisfies_the_invariant() {
        for current in IssueStatus::ALL {
            for count in 0..3 {
                let status = reconcile_status(*current, count).unwrap_or(*current);
                assert_eq!(
                    status == IssueStatus::Unassigned,
                    count == 0,
                    "{current:?} with {count} assignees"
                );
            }
        }
    }

    #[test]
    fn status_requests_checked_against_assignees() {
        assert!(check_status_request(IssueStatus::Unassigned, 0).is_ok());
        assert!(check_status_request(IssueStatus::Unassigned, 1).is_err());
        assert!(check_status_request(IssueStatus::InProgress, 0).is_err());
        assert!(check_status_request(IssueStatus::InProgress, 1).is_ok());
        assert!(check_status_request(IssueStatus::Done, 0).is_err());
        assert!(check_status_request(IssueStatus::Done, 3).is_ok());
    }

    #[test]
    fn finished_at_follows_done() {
        let now = Utc::now();
        assert_eq!(
            finished_at_transition(IssueStatus::InProgress, IssueStatus::Done, now),
            Some(Some(now))
        );
        assert_eq!(
            finished_at_transition(IssueStatus::Done, IssueStatus::InProgress, now),
            Some(None)
        );
        assert_eq!(
            finished_at_transition(IssueStatus::InProgress, IssueStatus::InProgress, now),
            None
        );
    }

    #[test]
    fn mutable_issue_checks() {
        assert_matches!(
            ensure_mutable(None, 10, 1),
            Err(CoreError::NotFound { entity: "Issue", id: 10 })
        );
        assert_matches!(
            ensure_mutable(Some(issue(IssueStatus::Unassigned)), 10, 2),
            Err(CoreError::Forbidden(_))
        );
        let mut archived = issue(IssueStatus::Unassigned);
        archived.archived_at = Some(Utc::now());
        assert_matches!(
            ensure_mutable(Some(archived.clone()), 10, 1),
            Err(CoreError::Deleted { .. })
        );
        assert!(ensure_in_project(Some(archived), 10, 1).is_ok());
    }

    #[test]
    fn editors_are_owner_and_creator() {
        let i = issue(IssueStatus::Unassigned);
        let owner = member(1, MemberRole::Owner, MemberStatus::Active);
        let creator = member(3, MemberRole::Member, MemberStatus::Active);
        let admin = member(4, MemberRole::Admin, MemberStatus::Active);
        assert!(ensure_editor(&owner, &i).is_ok());
        assert!(ensure_editor(&creator, &i).is_ok());
        assert!(ensure_editor(&admin, &i).is_err());
    }

    #[test]
    fn done_issue_rejects_assignee_changes() {
        assert!(ensure_assignable(&issue(IssueStatus::Done)).is_err());
        assert!(ensure_assignable(&issue(IssueStatus::InProgress)).is_ok());
    }

    #[test]
    fn dedup_keeps_order() {
        assert_eq!(dedup_assignees(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
    }
}
