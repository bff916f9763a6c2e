use std::{
    collections::{HashMap, HashSet},
    sync::{PoisonError, RwLock as StdRwLock},
    time::Duration,
};

use tokio::sync::{RwLock, RwLockWriteGuard};
use uuid::Uuid;

use crate::{
    api::error::{self, DbErrorMeta, SocialError},
    modules::{
        friend::{
            model::{AppendStatus, RelationshipKey},
            repository::FriendshipRepository,
            schema::{
                FriendshipEntity, FriendshipStatusCode, FriendshipStatusEntity, StatusCodeEntity,
            },
        },
        graph::repository::SocialGraphRepository,
        group::{
            model::AssignGroup,
            repository::GroupRepository,
            schema::{GroupAssignmentEntity, GroupEntity},
        },
        user::{repository::UserRepository, schema::UserEntity},
    },
};

#[derive(Default)]
struct GraphState {
    friendships: HashMap<Uuid, FriendshipEntity>,
    by_pair: HashMap<(Uuid, Uuid), Uuid>,
    history: HashMap<Uuid, Vec<FriendshipStatusEntity>>,
    groups: HashMap<Uuid, GroupEntity>,
    /// keyed by friendship id
    assignments: HashMap<Uuid, GroupAssignmentEntity>,
}

impl GraphState {
    /// Other-party ids of the relationships of `user_id` matching `keep`,
    /// sorted and paged.
    fn page_of<F>(&self, user_id: &Uuid, offset: i64, limit: i64, keep: F) -> Vec<Uuid>
    where
        F: Fn(&FriendshipEntity) -> bool,
    {
        let ids = self
            .friendships
            .values()
            .filter(|f| keep(f))
            .filter_map(|f| f.other(user_id))
            .collect();
        page(ids, offset, limit)
    }
}

fn page(mut ids: Vec<Uuid>, offset: i64, limit: i64) -> Vec<Uuid> {
    ids.sort();
    ids.into_iter()
        .skip(usize::try_from(offset).unwrap_or(0))
        .take(usize::try_from(limit).unwrap_or(0))
        .collect()
}

/// In-process implementation of every repository the social graph needs.
///
/// Writers take the state lock with a bounded wait and report
/// `ConcurrentModification` when it expires. Appends are conditional on the
/// expected seq exactly like the Postgres store.
pub struct MemoryStore {
    state: RwLock<GraphState>,
    users: StdRwLock<HashMap<Uuid, UserEntity>>,
    lock_timeout: Duration,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore {
            state: RwLock::new(GraphState::default()),
            users: StdRwLock::new(HashMap::new()),
            lock_timeout: Duration::from_secs(2),
        }
    }
}

impl MemoryStore {
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Registers a user with a generated profile and returns its id.
    pub fn add_user(&self, id: Uuid) -> Uuid {
        let short = id.simple().to_string();
        let user = UserEntity {
            id,
            username: format!("user_{}", &short[..8]),
            display_name: format!("User {}", &short[..8]),
            avatar_url: None,
        };
        self.add_profile(user);
        id
    }

    pub fn add_profile(&self, user: UserEntity) {
        self.users.write().unwrap_or_else(PoisonError::into_inner).insert(user.id, user);
    }

    pub fn remove_user(&self, id: &Uuid) {
        self.users.write().unwrap_or_else(PoisonError::into_inner).remove(id);
    }

    pub async fn relationship_count(&self) -> usize {
        self.state.read().await.friendships.len()
    }

    async fn write(&self) -> Result<RwLockWriteGuard<'_, GraphState>, error::SystemError> {
        tokio::time::timeout(self.lock_timeout, self.state.write())
            .await
            .map_err(|_| SocialError::ConcurrentModification.into())
    }
}

#[async_trait::async_trait]
impl FriendshipRepository for MemoryStore {
    async fn find_by_key(
        &self,
        key: &RelationshipKey,
    ) -> Result<Option<FriendshipEntity>, error::SystemError> {
        let state = self.state.read().await;
        Ok(state.by_pair.get(&key.normalized()).and_then(|id| state.friendships.get(id)).cloned())
    }

    async fn find_history(
        &self,
        friendship_id: &Uuid,
    ) -> Result<Vec<FriendshipStatusEntity>, error::SystemError> {
        let state = self.state.read().await;
        Ok(state.history.get(friendship_id).cloned().unwrap_or_default())
    }

    async fn append_status(
        &self,
        append: &AppendStatus,
    ) -> Result<FriendshipStatusEntity, error::SystemError> {
        let mut state = self.write().await?;
        let pair = append.key.normalized();

        let friendship_id = match state.by_pair.get(&pair).copied() {
            None if append.expected_seq == 0 => {
                let id = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
                let record = FriendshipEntity {
                    id,
                    requester_id: append.key.requester_id(),
                    target_id: append.key.target_id(),
                    user_low: pair.0,
                    user_high: pair.1,
                    latest_seq: 0,
                    latest_status: append.status,
                    latest_specifier_id: append.specifier_id,
                    created_at: append.created_at,
                    updated_at: append.created_at,
                };
                state.friendships.insert(id, record);
                state.by_pair.insert(pair, id);
                id
            }
            Some(id)
                if state.friendships.get(&id).map(|f| f.latest_seq)
                    == Some(append.expected_seq) =>
            {
                id
            }
            _ => return Err(SocialError::ConcurrentModification.into()),
        };

        let record = state
            .friendships
            .get_mut(&friendship_id)
            .ok_or(SocialError::ConcurrentModification)?;
        record.latest_seq += 1;
        record.latest_status = append.status;
        record.latest_specifier_id = append.specifier_id;
        record.updated_at = record.updated_at.max(append.created_at);

        let entry = FriendshipStatusEntity {
            friendship_id,
            seq: record.latest_seq,
            status: record.latest_status,
            specifier_id: record.latest_specifier_id,
            created_at: record.updated_at,
        };

        state.history.entry(friendship_id).or_default().push(entry.clone());
        if append.clear_group {
            state.assignments.remove(&friendship_id);
        }

        Ok(entry)
    }

    async fn find_status_codes(&self) -> Result<Vec<StatusCodeEntity>, error::SystemError> {
        Ok(FriendshipStatusCode::ALL
            .iter()
            .map(|code| StatusCodeEntity {
                code: *code,
                display_name: display_name(code).to_string(),
            })
            .collect())
    }

    async fn delete_by_user(&self, user_id: &Uuid) -> Result<u64, error::SystemError> {
        let mut state = self.write().await?;

        let removed: Vec<(Uuid, (Uuid, Uuid))> = state
            .friendships
            .values()
            .filter(|f| f.user_low == *user_id || f.user_high == *user_id)
            .map(|f| (f.id, (f.user_low, f.user_high)))
            .collect();

        for (id, pair) in &removed {
            state.friendships.remove(id);
            state.by_pair.remove(pair);
            state.history.remove(id);
            state.assignments.remove(id);
        }

        let owned: HashSet<Uuid> =
            state.groups.values().filter(|g| g.owner_id == *user_id).map(|g| g.id).collect();
        state.groups.retain(|id, _| !owned.contains(id));
        state.assignments.retain(|_, a| !owned.contains(&a.group_id));

        Ok(removed.len() as u64)
    }
}

fn display_name(code: &FriendshipStatusCode) -> &'static str {
    match code {
        FriendshipStatusCode::Pending => "Pending",
        FriendshipStatusCode::Accepted => "Accepted",
        FriendshipStatusCode::Rejected => "Rejected",
        FriendshipStatusCode::Blocked => "Blocked",
        FriendshipStatusCode::Unblocked => "Unblocked",
        FriendshipStatusCode::Unfriended => "Unfriended",
    }
}

#[async_trait::async_trait]
impl GroupRepository for MemoryStore {
    async fn create_group(
        &self,
        owner_id: &Uuid,
        name: &str,
    ) -> Result<GroupEntity, error::SystemError> {
        let mut state = self.write().await?;

        if state.groups.values().any(|g| g.owner_id == *owner_id && g.name == name) {
            return Err(error::SystemError::Conflict(Some(DbErrorMeta {
                code: Some("23505".to_string()),
                constraint: Some("friend_groups_owner_name".to_string()),
                message: format!("group {name} already exists"),
            })));
        }

        let group = GroupEntity {
            id: Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext)),
            owner_id: *owner_id,
            name: name.to_string(),
            created_at: chrono::Utc::now(),
        };
        state.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn find_group(&self, group_id: &Uuid) -> Result<Option<GroupEntity>, error::SystemError> {
        Ok(self.state.read().await.groups.get(group_id).cloned())
    }

    async fn find_groups_by_owner(
        &self,
        owner_id: &Uuid,
    ) -> Result<Vec<GroupEntity>, error::SystemError> {
        let state = self.state.read().await;
        let mut groups: Vec<GroupEntity> =
            state.groups.values().filter(|g| g.owner_id == *owner_id).cloned().collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }

    async fn delete_group(&self, group_id: &Uuid) -> Result<bool, error::SystemError> {
        let mut state = self.write().await?;
        let removed = state.groups.remove(group_id).is_some();
        state.assignments.retain(|_, a| a.group_id != *group_id);
        Ok(removed)
    }

    async fn assign_group(
        &self,
        assign: &AssignGroup,
    ) -> Result<GroupAssignmentEntity, error::SystemError> {
        let mut state = self.write().await?;

        if !state.groups.contains_key(&assign.group_id) {
            return Err(SocialError::GroupNotFound.into());
        }

        let still_accepted = state.friendships.get(&assign.friendship_id).is_some_and(|f| {
            f.latest_seq == assign.expected_seq
                && f.latest_status == FriendshipStatusCode::Accepted
        });
        if !still_accepted {
            return Err(SocialError::ConcurrentModification.into());
        }

        let assignment = GroupAssignmentEntity {
            friendship_id: assign.friendship_id,
            group_id: assign.group_id,
            owner_id: assign.owner_id,
            assigned_at: chrono::Utc::now(),
        };
        state.assignments.insert(assign.friendship_id, assignment.clone());
        Ok(assignment)
    }

    async fn clear_group(&self, friendship_id: &Uuid) -> Result<bool, error::SystemError> {
        Ok(self.write().await?.assignments.remove(friendship_id).is_some())
    }

    async fn find_assignment(
        &self,
        friendship_id: &Uuid,
    ) -> Result<Option<GroupAssignmentEntity>, error::SystemError> {
        Ok(self.state.read().await.assignments.get(friendship_id).cloned())
    }
}

#[async_trait::async_trait]
impl SocialGraphRepository for MemoryStore {
    async fn find_friend_ids(
        &self,
        user_id: &Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Uuid>, error::SystemError> {
        let state = self.state.read().await;
        Ok(state.page_of(user_id, offset, limit, |f| {
            f.latest_status == FriendshipStatusCode::Accepted
        }))
    }

    async fn find_group_member_ids(
        &self,
        group_id: &Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Uuid>, error::SystemError> {
        let state = self.state.read().await;
        let ids = state
            .assignments
            .values()
            .filter(|a| a.group_id == *group_id)
            .filter_map(|a| {
                let f = state.friendships.get(&a.friendship_id)?;
                (f.latest_status == FriendshipStatusCode::Accepted)
                    .then(|| f.other(&a.owner_id))
                    .flatten()
            })
            .collect();
        Ok(page(ids, offset, limit))
    }

    async fn find_blocked_ids(
        &self,
        user_id: &Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Uuid>, error::SystemError> {
        let state = self.state.read().await;
        Ok(state.page_of(user_id, offset, limit, |f| {
            f.latest_status == FriendshipStatusCode::Blocked && f.latest_specifier_id == *user_id
        }))
    }

    async fn find_incoming_request_ids(
        &self,
        user_id: &Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Uuid>, error::SystemError> {
        let state = self.state.read().await;
        Ok(state.page_of(user_id, offset, limit, |f| {
            f.latest_status == FriendshipStatusCode::Pending && f.latest_specifier_id != *user_id
        }))
    }

    async fn find_outgoing_request_ids(
        &self,
        user_id: &Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Uuid>, error::SystemError> {
        let state = self.state.read().await;
        Ok(state.page_of(user_id, offset, limit, |f| {
            f.latest_status == FriendshipStatusCode::Pending && f.latest_specifier_id == *user_id
        }))
    }
}

#[async_trait::async_trait]
impl UserRepository for MemoryStore {
    async fn exists(&self, id: &Uuid) -> Result<bool, error::SystemError> {
        Ok(self.users.read().unwrap_or_else(PoisonError::into_inner).contains_key(id))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserEntity>, error::SystemError> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }
}
