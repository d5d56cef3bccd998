//! Account row model (read-only view of `users`).

use crewboard_core::models::UserAccount;
use crewboard_core::types::{DbId, Timestamp};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: DbId,
    pub deleted_at: Option<Timestamp>,
}

impl From<UserRow> for UserAccount {
    fn from(row: UserRow) -> Self {
        UserAccount {
            id: row.id,
            deleted_at: row.deleted_at,
        }
    }
}
