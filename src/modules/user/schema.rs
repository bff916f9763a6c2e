use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Read-only projection of the profile store's `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}
