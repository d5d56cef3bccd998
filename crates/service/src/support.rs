//! Loading helpers shared by the services.

use crewboard_core::access::{self, Denial, Operation};
use crewboard_core::error::{CoreError, ServiceResult};
use crewboard_core::models::{Project, ProjectMember};
use crewboard_core::store::StoreTx;
use crewboard_core::types::DbId;

/// Load a project, including soft-deleted ones, or fail with `NotFound`.
pub(crate) async fn require_project<T: StoreTx>(
    tx: &mut T,
    project_id: DbId,
) -> ServiceResult<Project> {
    tx.load_project(project_id).await?.ok_or_else(|| {
        CoreError::NotFound {
            entity: "Project",
            id: project_id,
        }
        .into()
    })
}

/// Load the acting user's row and run the access policy for `op`.
pub(crate) async fn authorize<T: StoreTx>(
    tx: &mut T,
    project: &Project,
    user_id: DbId,
    op: Operation,
) -> ServiceResult<ProjectMember> {
    let member = tx.load_member(project.id, user_id).await?;
    let resolved = access::authorize(project, member.as_ref(), op)?;
    Ok(resolved.clone())
}

/// The resolved member must be the project OWNER.
pub(crate) fn ensure_owner(project: &Project, member: &ProjectMember) -> Result<(), CoreError> {
    if member.is_owner() {
        Ok(())
    } else {
        Err(Denial::OwnerRequired.into_error(project))
    }
}

/// The project must not be in its delete grace window.
pub(crate) fn ensure_not_deleted(project: &Project) -> Result<(), CoreError> {
    if project.is_deleted() {
        Err(Denial::ProjectDeleted.into_error(project))
    } else {
        Ok(())
    }
}
