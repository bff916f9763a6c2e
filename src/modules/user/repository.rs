use uuid::Uuid;

use crate::{api::error, modules::user::schema::UserEntity};

/// The slice of the profile store the social graph depends on.
#[async_trait::async_trait]
pub trait UserRepository {
    async fn exists(&self, id: &Uuid) -> Result<bool, error::SystemError>;

    /// Profiles for `ids`; unknown or deleted ids are left out.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserEntity>, error::SystemError>;
}
