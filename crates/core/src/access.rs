//! Project access policy.
//!
//! A single decision function over `{operation} × {project state, member
//! state}`. Every service operation routes its authorization through
//! [`evaluate`] so the rules live in one audited place.

use crate::error::CoreError;
use crate::models::{Project, ProjectMember};
use crate::status::MemberRole;

/// Category of operation being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Reading project content (issues, members).
    Read,
    /// Creating or updating project content.
    Write,
    /// Reading generated reports.
    Report,
    /// Inviting, re-roling or removing members.
    ManageMembers,
    FileUpload,
    FileDownload,
}

/// Why access was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// No row, still INVITED, or removed.
    NotMember,
    /// The project is in its delete grace window.
    ProjectDeleted,
    /// The project is DONE and no longer accepts changes.
    ProjectCompleted,
    /// The operation needs the OWNER role.
    OwnerRequired,
}

impl Denial {
    pub fn message(self) -> &'static str {
        match self {
            Denial::NotMember => "not a project member",
            Denial::ProjectDeleted => "project has been deleted",
            Denial::ProjectCompleted => "project is completed and cannot be modified",
            Denial::OwnerRequired => "only the project owner may perform this action",
        }
    }

    /// Convert into the typed error surfaced to callers.
    pub fn into_error(self, project: &Project) -> CoreError {
        match self {
            Denial::ProjectDeleted => CoreError::Deleted {
                entity: "Project",
                id: project.id,
            },
            other => CoreError::Forbidden(other.message().to_string()),
        }
    }
}

/// Outcome of a policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(Denial),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allowed)
    }

    pub fn into_result(self, project: &Project) -> Result<(), CoreError> {
        match self {
            Decision::Allowed => Ok(()),
            Decision::Denied(denial) => Err(denial.into_error(project)),
        }
    }
}

/// Decide whether `member` may perform `op` on `project`.
///
/// `member` is the raw row for the acting user, if any; INVITED or removed
/// rows are treated the same as a missing one.
pub fn evaluate(project: &Project, member: Option<&ProjectMember>, op: Operation) -> Decision {
    let Some(member) = member.filter(|m| m.is_resolvable()) else {
        return Decision::Denied(Denial::NotMember);
    };

    let deleted = project.is_deleted();
    let done = project.is_done();

    let denial = match op {
        Operation::Read if deleted && member.role != MemberRole::Owner => {
            Some(Denial::ProjectDeleted)
        }
        Operation::Read => None,
        Operation::Write | Operation::FileUpload => writable(deleted, done),
        Operation::Report | Operation::FileDownload => deleted.then_some(Denial::ProjectDeleted),
        Operation::ManageMembers if member.role != MemberRole::Owner => {
            Some(Denial::OwnerRequired)
        }
        Operation::ManageMembers => writable(deleted, done),
    };

    match denial {
        Some(d) => Decision::Denied(d),
        None => Decision::Allowed,
    }
}

/// Check `op` and return the resolved member on success.
pub fn authorize<'m>(
    project: &Project,
    member: Option<&'m ProjectMember>,
    op: Operation,
) -> Result<&'m ProjectMember, CoreError> {
    evaluate(project, member, op).into_result(project)?;
    // evaluate only allows resolvable members
    member.ok_or_else(|| Denial::NotMember.into_error(project))
}

/// Project-state half of the policy, shared by operations whose role rule
/// lives elsewhere (role changes, expel, cancel-invite).
pub fn ensure_writable(project: &Project) -> Result<(), CoreError> {
    match writable(project.is_deleted(), project.is_done()) {
        Some(denial) => Err(denial.into_error(project)),
        None => Ok(()),
    }
}

fn writable(deleted: bool, done: bool) -> Option<Denial> {
    if deleted {
        Some(Denial::ProjectDeleted)
    } else if done {
        Some(Denial::ProjectCompleted)
    } else {
        None
    }
}
