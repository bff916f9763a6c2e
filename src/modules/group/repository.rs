use uuid::Uuid;

use crate::api::error;
use crate::modules::group::model::AssignGroup;
use crate::modules::group::schema::{GroupAssignmentEntity, GroupEntity};

#[async_trait::async_trait]
pub trait GroupRepository {
    async fn create_group(
        &self,
        owner_id: &Uuid,
        name: &str,
    ) -> Result<GroupEntity, error::SystemError>;

    async fn find_group(&self, group_id: &Uuid) -> Result<Option<GroupEntity>, error::SystemError>;

    async fn find_groups_by_owner(
        &self,
        owner_id: &Uuid,
    ) -> Result<Vec<GroupEntity>, error::SystemError>;

    /// Deletes the group together with every label pointing at it.
    async fn delete_group(&self, group_id: &Uuid) -> Result<bool, error::SystemError>;

    /// Labels the friendship, replacing any previous label. Fails with
    /// `ConcurrentModification` unless the friendship is still ACCEPTED at
    /// `expected_seq`.
    async fn assign_group(
        &self,
        assign: &AssignGroup,
    ) -> Result<GroupAssignmentEntity, error::SystemError>;

    async fn clear_group(&self, friendship_id: &Uuid) -> Result<bool, error::SystemError>;

    async fn find_assignment(
        &self,
        friendship_id: &Uuid,
    ) -> Result<Option<GroupAssignmentEntity>, error::SystemError>;
}
