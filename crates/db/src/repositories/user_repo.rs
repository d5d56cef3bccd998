//! Read-only access to the `users` table.

use crewboard_core::types::DbId;
use sqlx::PgConnection;

use crate::models::user::UserRow;

pub struct UserRepo;

impl UserRepo {
    /// Find an account by ID, including deleted accounts.
    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<UserRow>, sqlx::Error> {
        sqlx::query_as::<_, UserRow>("SELECT id, deleted_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await
    }
}
