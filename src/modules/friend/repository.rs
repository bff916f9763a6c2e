use uuid::Uuid;

use crate::api::error;
use crate::modules::friend::model::{AppendStatus, RelationshipKey};
use crate::modules::friend::schema::{FriendshipEntity, FriendshipStatusEntity, StatusCodeEntity};

#[async_trait::async_trait]
pub trait FriendshipRepository {
    async fn find_by_key(
        &self,
        key: &RelationshipKey,
    ) -> Result<Option<FriendshipEntity>, error::SystemError>;

    /// Full audit trail, oldest first.
    async fn find_history(
        &self,
        friendship_id: &Uuid,
    ) -> Result<Vec<FriendshipStatusEntity>, error::SystemError>;

    /// The only mutation of a relationship. Creates the record when
    /// `expected_seq` is 0, otherwise appends conditionally on the record still
    /// being at `expected_seq`.
    async fn append_status(
        &self,
        append: &AppendStatus,
    ) -> Result<FriendshipStatusEntity, error::SystemError>;

    async fn find_status_codes(&self) -> Result<Vec<StatusCodeEntity>, error::SystemError>;

    /// Account deletion: removes every relationship of `user_id` with its
    /// history and group label, and the groups the user owns. Returns the
    /// number of relationships removed.
    async fn delete_by_user(&self, user_id: &Uuid) -> Result<u64, error::SystemError>;
}
