use log::{info, warn};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    api::error::{self, SocialError},
    modules::{
        friend::{
            model::RelationshipKey, repository::FriendshipRepository,
            schema::FriendshipStatusCode, service::EngineConfig,
        },
        group::{
            model::AssignGroup,
            repository::GroupRepository,
            schema::{GroupAssignmentEntity, GroupEntity},
        },
    },
};

#[derive(Clone)]
pub struct GroupService<G, R>
where
    G: GroupRepository + Send + Sync,
    R: FriendshipRepository + Send + Sync,
{
    group_repo: Arc<G>,
    friend_repo: Arc<R>,
    config: EngineConfig,
}

impl<G, R> GroupService<G, R>
where
    G: GroupRepository + Send + Sync,
    R: FriendshipRepository + Send + Sync,
{
    pub fn with_dependencies(group_repo: Arc<G>, friend_repo: Arc<R>, config: EngineConfig) -> Self {
        GroupService { group_repo, friend_repo, config }
    }

    pub async fn create_group(
        &self,
        owner_id: Uuid,
        name: &str,
    ) -> Result<GroupEntity, error::SystemError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(error::SystemError::bad_request("Group name cannot be empty"));
        }

        let group = self.group_repo.create_group(&owner_id, name).await?;
        info!("User {} created group {}", owner_id, group.id);
        Ok(group)
    }

    pub async fn list_groups(&self, owner_id: Uuid) -> Result<Vec<GroupEntity>, error::SystemError> {
        self.group_repo.find_groups_by_owner(&owner_id).await
    }

    pub async fn delete_group(&self, owner_id: Uuid, group_id: Uuid) -> Result<(), error::SystemError> {
        self.owned_group(owner_id, group_id).await?;
        self.group_repo.delete_group(&group_id).await?;
        Ok(())
    }

    /// Puts the friendship identified by `key` into `group_id`, replacing any
    /// label it already carries. The owner must be one side of an ACCEPTED
    /// relationship and own the group.
    pub async fn assign_to_group(
        &self,
        owner_id: Uuid,
        key: RelationshipKey,
        group_id: Uuid,
    ) -> Result<GroupAssignmentEntity, error::SystemError> {
        let group = self
            .group_repo
            .find_group(&group_id)
            .await?
            .ok_or(SocialError::GroupNotFound)?;

        if !key.involves(&owner_id) || group.owner_id != owner_id {
            return Err(SocialError::UserNotInGroup.into());
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            let record = self
                .friend_repo
                .find_by_key(&key)
                .await?
                .filter(|r| r.latest_status == FriendshipStatusCode::Accepted)
                .ok_or(SocialError::UserNotInGroup)?;

            let assign = AssignGroup {
                friendship_id: record.id,
                group_id,
                owner_id,
                expected_seq: record.latest_seq,
            };

            match self.group_repo.assign_group(&assign).await {
                Ok(assignment) => return Ok(assignment),
                Err(err) if err.is_retryable() && attempt <= self.config.append_retries => {
                    warn!("assign_to_group: friendship {} moved, retrying", record.id);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Removes the label of the friendship, if any.
    pub async fn clear_group(&self, key: RelationshipKey) -> Result<(), error::SystemError> {
        if let Some(record) = self.friend_repo.find_by_key(&key).await? {
            self.group_repo.clear_group(&record.id).await?;
        }
        Ok(())
    }

    pub async fn group_of(
        &self,
        key: RelationshipKey,
    ) -> Result<Option<GroupAssignmentEntity>, error::SystemError> {
        match self.friend_repo.find_by_key(&key).await? {
            Some(record) => self.group_repo.find_assignment(&record.id).await,
            None => Ok(None),
        }
    }

    async fn owned_group(&self, owner_id: Uuid, group_id: Uuid) -> Result<GroupEntity, error::SystemError> {
        self.group_repo
            .find_group(&group_id)
            .await?
            .filter(|g| g.owner_id == owner_id)
            .ok_or_else(|| SocialError::GroupNotFound.into())
    }
}
