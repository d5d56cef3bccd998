//! Project membership transition guards.
//!
//! Pure functions over loaded [`ProjectMember`] rows. The service layer loads
//! the rows inside a transaction, calls the matching guard, and only writes
//! when the guard returns `Ok`.

use crate::error::CoreError;
use crate::models::{ProjectMember, UserAccount};
use crate::status::{MemberRole, MemberStatus};
use crate::types::DbId;

/// What an accepted invite writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvitePlan {
    /// No row exists for the pair yet.
    Insert,
    /// A soft-deleted row exists and is flipped back to INVITED/MEMBER.
    Revive,
}

/// The three ways a member row can be removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalAction {
    /// A manager removes an active member.
    Expel,
    /// A member removes themself.
    Leave,
    /// A manager withdraws a pending invitation.
    CancelInvite,
}

impl std::str::FromStr for RemovalAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "expel" => Ok(RemovalAction::Expel),
            "leave" => Ok(RemovalAction::Leave),
            "cancel" | "cancelInvite" => Ok(RemovalAction::CancelInvite),
            other => Err(CoreError::InvalidArgument(format!(
                "Invalid removal action '{other}'. Must be one of: expel, leave, cancel"
            ))),
        }
    }
}

/// Decide how to invite `invitee_id`, given the invitee's account and any
/// existing membership row. The inviter's OWNER role is checked by the access
/// policy before this is called.
pub fn plan_invite(
    inviter_id: DbId,
    invitee_id: DbId,
    invitee: Option<&UserAccount>,
    existing: Option<&ProjectMember>,
) -> Result<InvitePlan, CoreError> {
    if inviter_id == invitee_id {
        return Err(CoreError::forbidden("cannot invite yourself"));
    }

    match invitee {
        Some(account) if account.deleted_at.is_none() => {}
        _ => {
            return Err(CoreError::NotFound {
                entity: "User",
                id: invitee_id,
            })
        }
    }

    match existing {
        None => Ok(InvitePlan::Insert),
        Some(row) if row.is_live() => Err(CoreError::Conflict(
            "user is already participating in or invited to this project".into(),
        )),
        Some(_) => Ok(InvitePlan::Revive),
    }
}

/// Parse and validate a role requested through a role change.
///
/// OWNER is never assignable.
pub fn parse_assignable_role(raw: &str) -> Result<MemberRole, CoreError> {
    match raw.parse::<MemberRole>()? {
        MemberRole::Owner => Err(CoreError::invalid("the OWNER role cannot be assigned")),
        role => Ok(role),
    }
}

/// Guard a role change from `requester` on `target`.
///
/// Only the OWNER may touch ADMIN roles; an ADMIN may re-role MEMBERs.
pub fn check_role_change(
    requester_id: DbId,
    requester: Option<&ProjectMember>,
    target_id: DbId,
    target: Option<&ProjectMember>,
    new_role: MemberRole,
) -> Result<(), CoreError> {
    if requester_id == target_id {
        return Err(CoreError::forbidden("cannot change your own role"));
    }
    let requester = resolved_requester(requester)?;
    let target = live_target(target, target_id)?;

    if target.status != MemberStatus::Active {
        return Err(CoreError::forbidden(
            "target member has not accepted the invitation",
        ));
    }
    if target.is_owner() {
        return Err(CoreError::forbidden("the owner's role cannot be changed"));
    }
    if !requester.role.is_manager() {
        return Err(CoreError::forbidden(
            "only the owner or an admin may change roles",
        ));
    }
    if requester.role == MemberRole::Admin && target.role == MemberRole::Admin {
        return Err(CoreError::forbidden(
            "an admin cannot change another admin's role",
        ));
    }
    if target.role == new_role {
        return Err(CoreError::InvalidArgument(format!(
            "member already has role {new_role}"
        )));
    }
    Ok(())
}

/// Guard a member removal. All three actions end in a soft delete.
pub fn check_removal(
    requester_id: DbId,
    requester: Option<&ProjectMember>,
    target_id: DbId,
    target: Option<&ProjectMember>,
    action: RemovalAction,
) -> Result<(), CoreError> {
    let target = live_target(target, target_id)?;

    match action {
        RemovalAction::Expel => {
            let requester = resolved_requester(requester)?;
            if !requester.role.is_manager() {
                return Err(CoreError::forbidden(
                    "only the owner or an admin may expel members",
                ));
            }
            if target.is_owner() {
                return Err(CoreError::forbidden("the owner cannot be expelled"));
            }
            if requester.role == MemberRole::Admin && target.role != MemberRole::Member {
                return Err(CoreError::forbidden(
                    "an admin may only expel regular members",
                ));
            }
            if target.status != MemberStatus::Active {
                return Err(CoreError::forbidden(
                    "only active members can be expelled; cancel the invitation instead",
                ));
            }
        }
        RemovalAction::Leave => {
            if requester_id != target_id {
                return Err(CoreError::forbidden("members can only leave for themselves"));
            }
            if target.is_owner() {
                return Err(CoreError::forbidden("the owner cannot leave the project"));
            }
            if target.status != MemberStatus::Active {
                return Err(CoreError::forbidden(
                    "a pending invitation must be declined, not left",
                ));
            }
        }
        RemovalAction::CancelInvite => {
            let requester = resolved_requester(requester)?;
            if !requester.role.is_manager() {
                return Err(CoreError::forbidden(
                    "only the owner or an admin may cancel invitations",
                ));
            }
            if target.status != MemberStatus::Invited {
                return Err(CoreError::forbidden("member has no pending invitation"));
            }
        }
    }
    Ok(())
}

/// Guard accept/decline: the row must be a live, pending invitation.
pub fn check_pending_invitation(
    row: Option<&ProjectMember>,
    project_id: DbId,
) -> Result<(), CoreError> {
    match row {
        Some(r) if r.is_live() && r.status == MemberStatus::Invited => Ok(()),
        Some(r) if r.is_live() => Err(CoreError::Conflict(
            "invitation has already been accepted".into(),
        )),
        _ => Err(CoreError::NotFound {
            entity: "Invitation",
            id: project_id,
        }),
    }
}

fn resolved_requester(requester: Option<&ProjectMember>) -> Result<&ProjectMember, CoreError> {
    requester
        .filter(|m| m.is_resolvable())
        .ok_or_else(|| CoreError::forbidden("not a project member"))
}

fn live_target(target: Option<&ProjectMember>, target_id: DbId) -> Result<&ProjectMember, CoreError> {
    target.filter(|m| m.is_live()).ok_or(CoreError::NotFound {
        entity: "ProjectMember",
        id: target_id,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;

    use super::*;
    use crate::access::tests::member;

    fn account(id: DbId) -> UserAccount {
        UserAccount {
            id,
            deleted_at: None,
        }
    }

    fn removed(mut m: ProjectMember) -> ProjectMember {
        m.deleted_at = Some(Utc::now());
        m
    }

    // -- invite --------------------------------------------------------------

    #[test]
    fn invite_branches_are_exhaustive() {
        let existing_live = member(2, MemberRole::Member, MemberStatus::Invited);
        let existing_removed = removed(member(2, MemberRole::Admin, MemberStatus::Active));

        assert_eq!(
            plan_invite(1, 2, Some(&account(2)), None).unwrap(),
            InvitePlan::Insert
        );
        assert_matches!(
            plan_invite(1, 2, Some(&account(2)), Some(&existing_live)),
            Err(CoreError::Conflict(_))
        );
        assert_eq!(
            plan_invite(1, 2, Some(&account(2)), Some(&existing_removed)).unwrap(),
            InvitePlan::Revive
        );
    }

    #[test]
    fn invite_rejects_self_and_missing_accounts() {
        assert_matches!(
            plan_invite(1, 1, Some(&account(1)), None),
            Err(CoreError::Forbidden(_))
        );
        assert_matches!(
            plan_invite(1, 9, None, None),
            Err(CoreError::NotFound { entity: "User", id: 9 })
        );
        let mut gone = account(9);
        gone.deleted_at = Some(Utc::now());
        assert_matches!(
            plan_invite(1, 9, Some(&gone), None),
            Err(CoreError::NotFound { .. })
        );
    }

    // -- role change ---------------------------------------------------------

    #[test]
    fn owner_role_is_not_assignable() {
        assert_matches!(
            parse_assignable_role("OWNER"),
            Err(CoreError::InvalidArgument(_))
        );
        assert_matches!(
            parse_assignable_role("superuser"),
            Err(CoreError::InvalidArgument(_))
        );
        assert_eq!(parse_assignable_role("ADMIN").unwrap(), MemberRole::Admin);
    }

    #[test]
    fn member_cannot_change_owner_role() {
        let owner = member(1, MemberRole::Owner, MemberStatus::Active);
        let u2 = member(2, MemberRole::Member, MemberStatus::Active);
        let err = check_role_change(2, Some(&u2), 1, Some(&owner), MemberRole::Member).unwrap_err();
        assert_matches!(err, CoreError::Forbidden(msg) if msg.contains("owner's role"));
    }

    #[test]
    fn admin_cannot_touch_another_admin() {
        let a1 = member(2, MemberRole::Admin, MemberStatus::Active);
        let a2 = member(3, MemberRole::Admin, MemberStatus::Active);
        assert_matches!(
            check_role_change(2, Some(&a1), 3, Some(&a2), MemberRole::Member),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn owner_changes_admin_and_member_freely() {
        let owner = member(1, MemberRole::Owner, MemberStatus::Active);
        let admin = member(2, MemberRole::Admin, MemberStatus::Active);
        let regular = member(3, MemberRole::Member, MemberStatus::Active);
        assert!(check_role_change(1, Some(&owner), 2, Some(&admin), MemberRole::Member).is_ok());
        assert!(check_role_change(1, Some(&owner), 3, Some(&regular), MemberRole::Admin).is_ok());
    }

    #[test]
    fn admin_may_promote_a_member() {
        let admin = member(2, MemberRole::Admin, MemberStatus::Active);
        let regular = member(3, MemberRole::Member, MemberStatus::Active);
        assert!(check_role_change(2, Some(&admin), 3, Some(&regular), MemberRole::Admin).is_ok());
    }

    #[test]
    fn regular_member_cannot_change_roles() {
        let regular = member(2, MemberRole::Member, MemberStatus::Active);
        let other = member(3, MemberRole::Member, MemberStatus::Active);
        assert_matches!(
            check_role_change(2, Some(&regular), 3, Some(&other), MemberRole::Admin),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn role_change_rejects_self_noop_and_invited_target() {
        let owner = member(1, MemberRole::Owner, MemberStatus::Active);
        let regular = member(3, MemberRole::Member, MemberStatus::Active);
        let invited = member(4, MemberRole::Member, MemberStatus::Invited);

        assert_matches!(
            check_role_change(1, Some(&owner), 1, Some(&owner), MemberRole::Admin),
            Err(CoreError::Forbidden(_))
        );
        assert_matches!(
            check_role_change(1, Some(&owner), 3, Some(&regular), MemberRole::Member),
            Err(CoreError::InvalidArgument(_))
        );
        assert_matches!(
            check_role_change(1, Some(&owner), 4, Some(&invited), MemberRole::Admin),
            Err(CoreError::Forbidden(_))
        );
        assert_matches!(
            check_role_change(1, Some(&owner), 5, None, MemberRole::Admin),
            Err(CoreError::NotFound { entity: "ProjectMember", id: 5 })
        );
    }

    // -- removal -------------------------------------------------------------

    #[test]
    fn expel_rules() {
        let owner = member(1, MemberRole::Owner, MemberStatus::Active);
        let admin = member(2, MemberRole::Admin, MemberStatus::Active);
        let other_admin = member(5, MemberRole::Admin, MemberStatus::Active);
        let regular = member(3, MemberRole::Member, MemberStatus::Active);
        let invited = member(4, MemberRole::Member, MemberStatus::Invited);
        let expel = RemovalAction::Expel;

        assert!(check_removal(1, Some(&owner), 2, Some(&admin), expel).is_ok());
        assert!(check_removal(2, Some(&admin), 3, Some(&regular), expel).is_ok());
        assert!(check_removal(2, Some(&admin), 5, Some(&other_admin), expel).is_err());
        assert!(check_removal(2, Some(&admin), 1, Some(&owner), expel).is_err());
        assert!(check_removal(3, Some(&regular), 4, Some(&invited), expel).is_err());
        assert!(check_removal(1, Some(&owner), 4, Some(&invited), expel).is_err());
    }

    #[test]
    fn leave_rules() {
        let owner = member(1, MemberRole::Owner, MemberStatus::Active);
        let regular = member(3, MemberRole::Member, MemberStatus::Active);
        let leave = RemovalAction::Leave;

        assert!(check_removal(3, Some(&regular), 3, Some(&regular), leave).is_ok());
        assert!(check_removal(1, Some(&owner), 3, Some(&regular), leave).is_err());
        assert!(check_removal(1, Some(&owner), 1, Some(&owner), leave).is_err());
    }

    #[test]
    fn cancel_invite_rules() {
        let admin = member(2, MemberRole::Admin, MemberStatus::Active);
        let regular = member(3, MemberRole::Member, MemberStatus::Active);
        let invited = member(4, MemberRole::Member, MemberStatus::Invited);
        let cancel = RemovalAction::CancelInvite;

        assert!(check_removal(2, Some(&admin), 4, Some(&invited), cancel).is_ok());
        assert!(check_removal(2, Some(&admin), 3, Some(&regular), cancel).is_err());
        assert!(check_removal(3, Some(&regular), 4, Some(&invited), cancel).is_err());
    }

    #[test]
    fn removal_of_removed_row_is_not_found() {
        let owner = member(1, MemberRole::Owner, MemberStatus::Active);
        let gone = removed(member(3, MemberRole::Member, MemberStatus::Active));
        assert_matches!(
            check_removal(1, Some(&owner), 3, Some(&gone), RemovalAction::Expel),
            Err(CoreError::NotFound { .. })
        );
    }

    #[test]
    fn removal_action_parses() {
        assert_eq!("leave".parse::<RemovalAction>().unwrap(), RemovalAction::Leave);
        assert_eq!(
            "cancel".parse::<RemovalAction>().unwrap(),
            RemovalAction::CancelInvite
        );
        assert!("kick".parse::<RemovalAction>().is_err());
    }

    // -- invitation response -------------------------------------------------

    #[test]
    fn pending_invitation_required() {
        let invited = member(4, MemberRole::Member, MemberStatus::Invited);
        let active = member(3, MemberRole::Member, MemberStatus::Active);
        assert!(check_pending_invitation(Some(&invited), 1).is_ok());
        assert_matches!(
            check_pending_invitation(Some(&active), 1),
            Err(CoreError::Conflict(_))
        );
        assert_matches!(
            check_pending_invitation(Some(&removed(invited)), 1),
            Err(CoreError::NotFound { .. })
        );
        assert_matches!(
            check_pending_invitation(None, 1),
            Err(CoreError::NotFound { .. })
        );
    }
}
