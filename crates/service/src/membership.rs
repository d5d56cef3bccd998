//! Project membership use cases.

use chrono::Utc;
use crewboard_core::access::{self, Operation};
use crewboard_core::error::{CoreError, ServiceResult};
use crewboard_core::membership::{self, InvitePlan, RemovalAction};
use crewboard_core::models::ProjectMember;
use crewboard_core::status::{MemberRole, MemberStatus};
use crewboard_core::store::{Store, StoreTx};
use crewboard_core::types::DbId;

use crate::support::{authorize, ensure_not_deleted, require_project};

pub struct MembershipService<S> {
    store: S,
}

impl<S: Store> MembershipService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    // -----------------------------------------------------------------------
    // invite
    // -----------------------------------------------------------------------

    /// Invite `invitee_id` as a MEMBER. Only the OWNER of a writable project
    /// may invite. A previously removed user gets their old row revived.
    pub async fn invite(
        &self,
        project_id: DbId,
        inviter_id: DbId,
        invitee_id: DbId,
    ) -> ServiceResult<ProjectMember> {
        let mut tx = self.store.begin().await?;
        let project = require_project(&mut tx, project_id).await?;
        authorize(&mut tx, &project, inviter_id, Operation::ManageMembers).await?;

        let invitee = tx.load_user(invitee_id).await?;
        let existing = tx.load_member(project_id, invitee_id).await?;
        let plan = membership::plan_invite(inviter_id, invitee_id, invitee.as_ref(), existing.as_ref())?;

        let now = Utc::now();
        let row = match plan {
            InvitePlan::Insert => {
                tx.insert_member(
                    project_id,
                    invitee_id,
                    MemberRole::Member,
                    MemberStatus::Invited,
                    now,
                )
                .await?
            }
            InvitePlan::Revive => tx.revive_member(project_id, invitee_id, now).await?,
        };
        tx.commit().await?;

        tracing::info!(project_id, inviter_id, invitee_id, ?plan, "Member invited");
        Ok(row)
    }

    // -----------------------------------------------------------------------
    // change_role
    // -----------------------------------------------------------------------

    /// Change `target_id`'s role to `new_role` (`"ADMIN"` or `"MEMBER"`).
    pub async fn change_role(
        &self,
        project_id: DbId,
        requester_id: DbId,
        target_id: DbId,
        new_role: &str,
    ) -> ServiceResult<ProjectMember> {
        let new_role = membership::parse_assignable_role(new_role)?;

        let mut tx = self.store.begin().await?;
        let project = require_project(&mut tx, project_id).await?;
        let requester = tx.load_member(project_id, requester_id).await?;
        let target = tx.load_member(project_id, target_id).await?;

        membership::check_role_change(
            requester_id,
            requester.as_ref(),
            target_id,
            target.as_ref(),
            new_role,
        )?;
        access::ensure_writable(&project)?;

        tx.update_member_role(project_id, target_id, new_role).await?;
        let updated = reload(&mut tx, project_id, target_id).await?;
        tx.commit().await?;

        tracing::info!(project_id, requester_id, target_id, role = %new_role, "Member role changed");
        Ok(updated)
    }

    // -----------------------------------------------------------------------
    // remove_member
    // -----------------------------------------------------------------------

    /// Expel a member, leave a project, or cancel a pending invitation. All
    /// three soft-delete the target row.
    pub async fn remove_member(
        &self,
        project_id: DbId,
        requester_id: DbId,
        target_id: DbId,
        action: RemovalAction,
    ) -> ServiceResult<()> {
        let mut tx = self.store.begin().await?;
        let project = require_project(&mut tx, project_id).await?;
        let requester = tx.load_member(project_id, requester_id).await?;
        let target = tx.load_member(project_id, target_id).await?;

        membership::check_removal(
            requester_id,
            requester.as_ref(),
            target_id,
            target.as_ref(),
            action,
        )?;
        match action {
            RemovalAction::Leave => ensure_not_deleted(&project)?,
            RemovalAction::Expel | RemovalAction::CancelInvite => {
                access::ensure_writable(&project)?
            }
        }

        tx.soft_delete_member(project_id, target_id, Utc::now()).await?;
        tx.commit().await?;

        tracing::info!(project_id, requester_id, target_id, ?action, "Member removed");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // accept / decline
    // -----------------------------------------------------------------------

    /// Accept a pending invitation for `user_id`.
    pub async fn accept_invitation(
        &self,
        project_id: DbId,
        user_id: DbId,
    ) -> ServiceResult<ProjectMember> {
        let mut tx = self.store.begin().await?;
        let project = require_project(&mut tx, project_id).await?;
        let row = tx.load_member(project_id, user_id).await?;
        membership::check_pending_invitation(row.as_ref(), project_id)?;
        ensure_not_deleted(&project)?;

        tx.activate_member(project_id, user_id, Utc::now()).await?;
        let member = reload(&mut tx, project_id, user_id).await?;
        tx.commit().await?;

        tracing::info!(project_id, user_id, "Invitation accepted");
        Ok(member)
    }

    /// Decline a pending invitation. The row is soft-deleted so a later
    /// invite revives it.
    pub async fn decline_invitation(&self, project_id: DbId, user_id: DbId) -> ServiceResult<()> {
        let mut tx = self.store.begin().await?;
        require_project(&mut tx, project_id).await?;
        let row = tx.load_member(project_id, user_id).await?;
        membership::check_pending_invitation(row.as_ref(), project_id)?;

        tx.soft_delete_member(project_id, user_id, Utc::now()).await?;
        tx.commit().await?;

        tracing::info!(project_id, user_id, "Invitation declined");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // list_members
    // -----------------------------------------------------------------------

    /// Live members (ACTIVE and INVITED), owner first.
    pub async fn list_members(
        &self,
        project_id: DbId,
        requester_id: DbId,
    ) -> ServiceResult<Vec<ProjectMember>> {
        let mut tx = self.store.begin().await?;
        let project = require_project(&mut tx, project_id).await?;
        authorize(&mut tx, &project, requester_id, Operation::Read).await?;
        let members = tx.list_members(project_id).await?;
        tracing::debug!(project_id, count = members.len(), "Listed members");
        Ok(members)
    }
}

/// Read back a row written earlier in the same transaction.
async fn reload<T: StoreTx>(tx: &mut T, project_id: DbId, user_id: DbId) -> ServiceResult<ProjectMember> {
    tx.load_member(project_id, user_id).await?.ok_or_else(|| {
        CoreError::NotFound {
            entity: "ProjectMember",
            id: user_id,
        }
        .into()
    })
}
