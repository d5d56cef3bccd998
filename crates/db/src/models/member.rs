//! Project member row model.

use crewboard_core::models::ProjectMember;
use crewboard_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use super::decode;

/// A row from the `project_members` table.
#[derive(Debug, Clone, FromRow)]
pub struct ProjectMemberRow {
    pub project_id: DbId,
    pub user_id: DbId,
    pub role: String,
    pub status: String,
    pub invited_at: Timestamp,
    pub joined_at: Option<Timestamp>,
    pub deleted_at: Option<Timestamp>,
}

impl ProjectMemberRow {
    pub fn into_domain(self) -> Result<ProjectMember, sqlx::Error> {
        Ok(ProjectMember {
            project_id: self.project_id,
            user_id: self.user_id,
            role: decode(&self.role)?,
            status: decode(&self.status)?,
            invited_at: self.invited_at,
            joined_at: self.joined_at,
            deleted_at: self.deleted_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use crewboard_core::status::{MemberRole, MemberStatus};

    use super::*;

    #[test]
    fn converts_role_and_status() {
        let row = ProjectMemberRow {
            project_id: 1,
            user_id: 2,
            role: "ADMIN".into(),
            status: "INVITED".into(),
            invited_at: Utc::now(),
            joined_at: None,
            deleted_at: None,
        };
        let member = row.into_domain().unwrap();
        assert_eq!(member.role, MemberRole::Admin);
        assert_eq!(member.status, MemberStatus::Invited);
        assert!(!member.is_resolvable());
    }

    #[test]
    fn rejects_unknown_role() {
        let row = ProjectMemberRow {
            project_id: 1,
            user_id: 2,
            role: "GUEST".into(),
            status: "ACTIVE".into(),
            invited_at: Utc::now(),
            joined_at: None,
            deleted_at: None,
        };
        assert!(row.into_domain().is_err());
    }
}
