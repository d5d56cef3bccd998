//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods. Methods
//! that take part in a use-case transaction accept `&mut PgConnection`
//! (pass `&mut *tx`); standalone writes accept `&PgPool`.

pub mod assignee_repo;
pub mod issue_repo;
pub mod member_repo;
pub mod notification_repo;
pub mod project_repo;
pub mod user_repo;

pub use assignee_repo::AssigneeRepo;
pub use issue_repo::IssueRepo;
pub use member_repo::MemberRepo;
pub use notification_repo::NotificationRepo;
pub use project_repo::ProjectRepo;
pub use user_repo::UserRepo;
