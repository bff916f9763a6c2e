use log::{info, warn};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    api::error::{self, SocialError},
    constants::ENV,
    modules::{
        friend::{
            model::{AppendStatus, RelationshipKey},
            repository::FriendshipRepository,
            schema::{
                FriendshipEntity, FriendshipStatusCode, FriendshipStatusEntity, StatusCodeEntity,
            },
        },
        user::repository::UserRepository,
    },
};

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Extra attempts after a lost optimistic append.
    pub append_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig { append_retries: 3 }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        EngineConfig { append_retries: ENV.append_retries }
    }
}

/// Outcome of validating an action against the current record.
enum Transition {
    Append { status: FriendshipStatusCode, specifier_id: Uuid, clear_group: bool },
    Unchanged,
}

/// The friendship state machine.
///
/// Every action reads the record, validates it, and appends conditionally on
/// the seq it validated against. A lost race is re-validated against fresh
/// state up to `append_retries` times before surfacing.
#[derive(Clone)]
pub struct FriendService<R, U>
where
    R: FriendshipRepository + Send + Sync,
    U: UserRepository + Send + Sync,
{
    friend_repo: Arc<R>,
    user_repo: Arc<U>,
    config: EngineConfig,
}

impl<R, U> FriendService<R, U>
where
    R: FriendshipRepository + Send + Sync,
    U: UserRepository + Send + Sync,
{
    pub fn with_dependencies(friend_repo: Arc<R>, user_repo: Arc<U>, config: EngineConfig) -> Self {
        FriendService { friend_repo, user_repo, config }
    }

    pub async fn send_request(
        &self,
        requester_id: Uuid,
        target_id: Uuid,
    ) -> Result<FriendshipStatusEntity, error::SystemError> {
        let key = RelationshipKey::new(requester_id, target_id)?;
        self.ensure_user_exists(&target_id).await?;

        self.transition("send_request", key, |record| {
            if let Some(record) = record {
                match record.latest_status {
                    FriendshipStatusCode::Blocked => return Err(SocialError::BlockedUser),
                    status if !status.is_baseline() => {
                        return Err(SocialError::TargetUserIsAlreadyFriend)
                    }
                    _ => {}
                }
            }
            Ok(Transition::Append {
                status: FriendshipStatusCode::Pending,
                specifier_id: requester_id,
                clear_group: false,
            })
        })
        .await
    }

    /// Accepts or rejects the pending request `requester_id` sent to
    /// `target_id`. Only the target may answer.
    pub async fn respond(
        &self,
        requester_id: Uuid,
        target_id: Uuid,
        accept: bool,
        specifier_id: Uuid,
    ) -> Result<FriendshipStatusEntity, error::SystemError> {
        let key = RelationshipKey::new(requester_id, target_id)?;
        if specifier_id != target_id {
            return Err(SocialError::NonExistentFriendshipRequest.into());
        }

        let status =
            if accept { FriendshipStatusCode::Accepted } else { FriendshipStatusCode::Rejected };

        self.transition("respond", key, |record| match record {
            Some(r)
                if r.latest_status == FriendshipStatusCode::Pending
                    && r.latest_specifier_id == requester_id =>
            {
                Ok(Transition::Append { status, specifier_id, clear_group: false })
            }
            _ => Err(SocialError::NonExistentFriendshipRequest),
        })
        .await
    }

    pub async fn block(
        &self,
        blocker_id: Uuid,
        blocked_id: Uuid,
    ) -> Result<FriendshipStatusEntity, error::SystemError> {
        let key = RelationshipKey::new(blocker_id, blocked_id)?;
        self.ensure_user_exists(&blocked_id).await?;

        // a counter-block moves the unblock right to the newest blocker
        self.transition("block", key, |record| match record {
            Some(r)
                if r.latest_status == FriendshipStatusCode::Blocked
                    && r.latest_specifier_id == blocker_id =>
            {
                Ok(Transition::Unchanged)
            }
            _ => Ok(Transition::Append {
                status: FriendshipStatusCode::Blocked,
                specifier_id: blocker_id,
                clear_group: true,
            }),
        })
        .await
    }

    pub async fn unblock(
        &self,
        blocker_id: Uuid,
        blocked_id: Uuid,
    ) -> Result<FriendshipStatusEntity, error::SystemError> {
        let key = RelationshipKey::new(blocker_id, blocked_id)?;

        self.transition("unblock", key, |record| match record {
            Some(r)
                if r.latest_status == FriendshipStatusCode::Blocked
                    && r.latest_specifier_id == blocker_id =>
            {
                Ok(Transition::Append {
                    status: FriendshipStatusCode::Unblocked,
                    specifier_id: blocker_id,
                    clear_group: false,
                })
            }
            _ => Err(SocialError::NotBlocked),
        })
        .await
    }

    pub async fn unfriend(
        &self,
        user_id: Uuid,
        other_id: Uuid,
    ) -> Result<FriendshipStatusEntity, error::SystemError> {
        let key = RelationshipKey::new(user_id, other_id)?;

        self.transition("unfriend", key, |record| match record {
            Some(r) if r.latest_status == FriendshipStatusCode::Accepted => {
                Ok(Transition::Append {
                    status: FriendshipStatusCode::Unfriended,
                    specifier_id: user_id,
                    clear_group: true,
                })
            }
            _ => Err(SocialError::TargetUserIsNotFriend),
        })
        .await
    }

    pub async fn current_status(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<FriendshipStatusEntity, error::SystemError> {
        let key = RelationshipKey::new(user_a, user_b)?;
        let record = self
            .friend_repo
            .find_by_key(&key)
            .await?
            .ok_or(SocialError::RelationshipNotFound)?;
        Ok(record.latest_entry())
    }

    pub async fn history(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Vec<FriendshipStatusEntity>, error::SystemError> {
        let key = RelationshipKey::new(user_a, user_b)?;
        let record = self
            .friend_repo
            .find_by_key(&key)
            .await?
            .ok_or(SocialError::RelationshipNotFound)?;
        self.friend_repo.find_history(&record.id).await
    }

    pub async fn status_codes(&self) -> Result<Vec<StatusCodeEntity>, error::SystemError> {
        self.friend_repo.find_status_codes().await
    }

    /// Account deletion: drop every relationship the user is part of.
    pub async fn purge_user(&self, user_id: Uuid) -> Result<u64, error::SystemError> {
        let removed = self.friend_repo.delete_by_user(&user_id).await?;
        info!("Removed {} relationships of deleted user {}", removed, user_id);
        Ok(removed)
    }

    async fn ensure_user_exists(&self, user_id: &Uuid) -> Result<(), error::SystemError> {
        if !self.user_repo.exists(user_id).await? {
            return Err(SocialError::UserNotFound.into());
        }
        Ok(())
    }

    async fn transition<F>(
        &self,
        action: &'static str,
        key: RelationshipKey,
        decide: F,
    ) -> Result<FriendshipStatusEntity, error::SystemError>
    where
        F: Fn(Option<&FriendshipEntity>) -> Result<Transition, SocialError>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let record = self.friend_repo.find_by_key(&key).await?;

            let (status, specifier_id, clear_group) = match decide(record.as_ref())? {
                Transition::Append { status, specifier_id, clear_group } => {
                    (status, specifier_id, clear_group)
                }
                Transition::Unchanged => {
                    let record = record.ok_or(SocialError::RelationshipNotFound)?;
                    return Ok(record.latest_entry());
                }
            };

            let now = chrono::Utc::now();
            let append = AppendStatus {
                key,
                expected_seq: record.as_ref().map_or(0, |r| r.latest_seq),
                status,
                specifier_id,
                clear_group,
                created_at: record.as_ref().map_or(now, |r| now.max(r.updated_at)),
            };

            match self.friend_repo.append_status(&append).await {
                Ok(entry) => {
                    info!(
                        "{}: {} -> {} is now {} (seq {})",
                        action,
                        key.requester_id(),
                        key.target_id(),
                        entry.status.as_str(),
                        entry.seq
                    );
                    return Ok(entry);
                }
                Err(err) if err.is_retryable() && attempt <= self.config.append_retries => {
                    warn!("{}: lost append race on attempt {}, retrying", action, attempt);
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        modules::graph::{model::PageRequest, service::GraphService},
        store::memory::MemoryStore,
    };
    use std::sync::atomic::{AtomicU32, Ordering};

    fn engine(store: &Arc<MemoryStore>) -> FriendService<MemoryStore, MemoryStore> {
        FriendService::with_dependencies(store.clone(), store.clone(), EngineConfig::default())
    }

    fn users<const N: usize>(store: &MemoryStore) -> [Uuid; N] {
        std::array::from_fn(|_| store.add_user(Uuid::new_v4()))
    }

    fn social(err: error::SystemError) -> SocialError {
        err.social().unwrap_or_else(|| panic!("expected a social error, got {err:?}"))
    }

    #[tokio::test]
    async fn request_is_pending_from_both_sides() {
        let store = Arc::new(MemoryStore::default());
        let svc = engine(&store);
        let [a, b] = users(&store);

        svc.send_request(a, b).await.unwrap();

        assert_eq!(svc.current_status(a, b).await.unwrap().status, FriendshipStatusCode::Pending);
        assert_eq!(svc.current_status(b, a).await.unwrap().status, FriendshipStatusCode::Pending);
    }

    #[tokio::test]
    async fn request_to_self_fails_before_storage() {
        let store = Arc::new(MemoryStore::default());
        let svc = engine(&store);
        let a = store.add_user(Uuid::new_v4());

        let err = svc.send_request(a, a).await.unwrap_err();
        assert_eq!(social(err), SocialError::TargetUserIsCurrentUser);
        assert_eq!(store.relationship_count().await, 0);
    }

    #[tokio::test]
    async fn request_to_unknown_user_fails() {
        let store = Arc::new(MemoryStore::default());
        let svc = engine(&store);
        let a = store.add_user(Uuid::new_v4());

        let err = svc.send_request(a, Uuid::new_v4()).await.unwrap_err();
        assert_eq!(social(err), SocialError::UserNotFound);
    }

    #[tokio::test]
    async fn duplicate_or_crossing_request_is_already_friend() {
        let store = Arc::new(MemoryStore::default());
        let svc = engine(&store);
        let [a, b] = users(&store);

        svc.send_request(a, b).await.unwrap();
        assert_eq!(
            social(svc.send_request(a, b).await.unwrap_err()),
            SocialError::TargetUserIsAlreadyFriend
        );
        assert_eq!(
            social(svc.send_request(b, a).await.unwrap_err()),
            SocialError::TargetUserIsAlreadyFriend
        );
    }

    #[tokio::test]
    async fn only_target_can_answer_request() {
        let store = Arc::new(MemoryStore::default());
        let svc = engine(&store);
        let [a, b] = users(&store);

        svc.send_request(a, b).await.unwrap();

        let err = svc.respond(a, b, true, a).await.unwrap_err();
        assert_eq!(social(err), SocialError::NonExistentFriendshipRequest);

        // b never sent anything to a
        let err = svc.respond(b, a, true, a).await.unwrap_err();
        assert_eq!(social(err), SocialError::NonExistentFriendshipRequest);

        let entry = svc.respond(a, b, true, b).await.unwrap();
        assert_eq!(entry.status, FriendshipStatusCode::Accepted);
        assert_eq!(entry.specifier_id, b);
    }

    #[tokio::test]
    async fn respond_without_request_fails() {
        let store = Arc::new(MemoryStore::default());
        let svc = engine(&store);
        let [a, b] = users(&store);

        let err = svc.respond(a, b, false, b).await.unwrap_err();
        assert_eq!(social(err), SocialError::NonExistentFriendshipRequest);
    }

    #[tokio::test]
    async fn accept_unfriend_and_request_again() {
        let store = Arc::new(MemoryStore::default());
        let svc = engine(&store);
        let [a, b] = users(&store);

        svc.send_request(a, b).await.unwrap();
        svc.respond(a, b, true, b).await.unwrap();
        assert_eq!(svc.current_status(a, b).await.unwrap().status, FriendshipStatusCode::Accepted);

        svc.unfriend(b, a).await.unwrap();
        assert_ne!(svc.current_status(a, b).await.unwrap().status, FriendshipStatusCode::Accepted);

        let entry = svc.send_request(a, b).await.unwrap();
        assert_eq!(entry.status, FriendshipStatusCode::Pending);
        assert_eq!(entry.seq, 4);

        let history = svc.history(b, a).await.unwrap();
        let statuses: Vec<_> = history.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                FriendshipStatusCode::Pending,
                FriendshipStatusCode::Accepted,
                FriendshipStatusCode::Unfriended,
                FriendshipStatusCode::Pending,
            ]
        );
        assert!(history.windows(2).all(|w| w[0].created_at <= w[1].created_at));
        assert_eq!(store.relationship_count().await, 1);
    }

    #[tokio::test]
    async fn rejected_request_can_be_sent_again() {
        let store = Arc::new(MemoryStore::default());
        let svc = engine(&store);
        let [a, b] = users(&store);

        svc.send_request(a, b).await.unwrap();
        svc.respond(a, b, false, b).await.unwrap();
        assert_eq!(svc.current_status(a, b).await.unwrap().status, FriendshipStatusCode::Rejected);

        // the other side may open the next cycle
        svc.send_request(b, a).await.unwrap();
        let entry = svc.respond(b, a, true, a).await.unwrap();
        assert_eq!(entry.status, FriendshipStatusCode::Accepted);
    }

    #[tokio::test]
    async fn unfriend_requires_accepted() {
        let store = Arc::new(MemoryStore::default());
        let svc = engine(&store);
        let [a, b] = users(&store);

        assert_eq!(
            social(svc.unfriend(a, b).await.unwrap_err()),
            SocialError::TargetUserIsNotFriend
        );
        svc.send_request(a, b).await.unwrap();
        assert_eq!(
            social(svc.unfriend(a, b).await.unwrap_err()),
            SocialError::TargetUserIsNotFriend
        );
    }

    #[tokio::test]
    async fn block_overrides_friendship_and_stops_requests() {
        let store = Arc::new(MemoryStore::default());
        let svc = engine(&store);
        let [a, b] = users(&store);

        svc.send_request(a, b).await.unwrap();
        svc.respond(a, b, true, b).await.unwrap();

        let entry = svc.block(a, b).await.unwrap();
        assert_eq!(entry.status, FriendshipStatusCode::Blocked);
        assert_eq!(svc.current_status(b, a).await.unwrap().status, FriendshipStatusCode::Blocked);

        assert_eq!(social(svc.send_request(b, a).await.unwrap_err()), SocialError::BlockedUser);
        assert_eq!(social(svc.send_request(a, b).await.unwrap_err()), SocialError::BlockedUser);
    }

    #[tokio::test]
    async fn block_is_idempotent_for_the_blocker() {
        let store = Arc::new(MemoryStore::default());
        let svc = engine(&store);
        let [a, b] = users(&store);

        let first = svc.block(a, b).await.unwrap();
        let second = svc.block(a, b).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(svc.history(a, b).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn counter_block_takes_over_the_block() {
        let store = Arc::new(MemoryStore::default());
        let svc = engine(&store);
        let graph = GraphService::with_dependencies(store.clone(), store.clone(), store.clone());
        let [a, b] = users(&store);
        let page = PageRequest::new(0, 10);

        svc.block(a, b).await.unwrap();
        let entry = svc.block(b, a).await.unwrap();
        assert_eq!(entry.status, FriendshipStatusCode::Blocked);
        assert_eq!(entry.seq, 2);

        assert_eq!(svc.current_status(a, b).await.unwrap().specifier_id, b);
        assert_eq!(graph.blocked_by(b, page).await.unwrap().items, vec![a]);
        assert!(graph.blocked_by(a, page).await.unwrap().items.is_empty());

        assert_eq!(social(svc.unblock(a, b).await.unwrap_err()), SocialError::NotBlocked);
        assert_eq!(svc.unblock(b, a).await.unwrap().status, FriendshipStatusCode::Unblocked);
    }

    #[tokio::test]
    async fn unblock_twice_is_neutral() {
        let store = Arc::new(MemoryStore::default());
        let svc = engine(&store);
        let [a, b] = users(&store);

        svc.block(a, b).await.unwrap();
        let entry = svc.unblock(a, b).await.unwrap();
        assert_eq!(entry.status, FriendshipStatusCode::Unblocked);

        let err = svc.unblock(a, b).await.unwrap_err();
        assert_eq!(social(err), SocialError::NotBlocked);

        let history = svc.history(a, b).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.last().map(|e| e.status), Some(FriendshipStatusCode::Unblocked));

        // baseline again: a fresh request cycle starts
        assert_eq!(svc.send_request(b, a).await.unwrap().status, FriendshipStatusCode::Pending);
    }

    #[tokio::test]
    async fn current_status_of_strangers_is_not_found() {
        let store = Arc::new(MemoryStore::default());
        let svc = engine(&store);
        let [a, b] = users(&store);

        assert_eq!(
            social(svc.current_status(a, b).await.unwrap_err()),
            SocialError::RelationshipNotFound
        );
    }

    #[tokio::test]
    async fn purge_removes_all_relationships_of_user() {
        let store = Arc::new(MemoryStore::default());
        let svc = engine(&store);
        let [a, b, c] = users(&store);

        svc.send_request(a, b).await.unwrap();
        svc.block(c, a).await.unwrap();
        svc.send_request(b, c).await.unwrap();

        assert_eq!(svc.purge_user(a).await.unwrap(), 2);
        assert_eq!(store.relationship_count().await, 1);
        assert_eq!(svc.current_status(b, c).await.unwrap().status, FriendshipStatusCode::Pending);
    }

    #[tokio::test]
    async fn status_codes_come_from_lookup_table() {
        let store = Arc::new(MemoryStore::default());
        let svc = engine(&store);

        let codes = svc.status_codes().await.unwrap();
        assert_eq!(codes.len(), FriendshipStatusCode::ALL.len());
        assert!(codes.iter().any(|c| c.code == FriendshipStatusCode::Blocked));
    }

    /// Loses the first `failures` appends as if another writer got there first.
    struct RacingRepo {
        inner: Arc<MemoryStore>,
        failures: AtomicU32,
    }

    #[async_trait::async_trait]
    impl FriendshipRepository for RacingRepo {
        async fn find_by_key(
            &self,
            key: &RelationshipKey,
        ) -> Result<Option<FriendshipEntity>, error::SystemError> {
            self.inner.find_by_key(key).await
        }

        async fn find_history(
            &self,
            friendship_id: &Uuid,
        ) -> Result<Vec<FriendshipStatusEntity>, error::SystemError> {
            self.inner.find_history(friendship_id).await
        }

        async fn append_status(
            &self,
            append: &AppendStatus,
        ) -> Result<FriendshipStatusEntity, error::SystemError> {
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(SocialError::ConcurrentModification.into());
            }
            self.inner.append_status(append).await
        }

        async fn find_status_codes(&self) -> Result<Vec<StatusCodeEntity>, error::SystemError> {
            self.inner.find_status_codes().await
        }

        async fn delete_by_user(&self, user_id: &Uuid) -> Result<u64, error::SystemError> {
            self.inner.delete_by_user(user_id).await
        }
    }

    #[tokio::test]
    async fn lost_race_is_retried_with_fresh_state() {
        let store = Arc::new(MemoryStore::default());
        let [a, b] = users(&store);
        let repo = Arc::new(RacingRepo { inner: store.clone(), failures: AtomicU32::new(2) });
        let svc = FriendService::with_dependencies(repo, store.clone(), EngineConfig::default());

        let entry = svc.send_request(a, b).await.unwrap();
        assert_eq!(entry.seq, 1);
    }

    #[tokio::test]
    async fn concurrent_modification_surfaces_after_retries() {
        let store = Arc::new(MemoryStore::default());
        let [a, b] = users(&store);
        let repo = Arc::new(RacingRepo { inner: store.clone(), failures: AtomicU32::new(10) });
        let svc = FriendService::with_dependencies(
            repo.clone(),
            store.clone(),
            EngineConfig { append_retries: 2 },
        );

        let err = svc.send_request(a, b).await.unwrap_err();
        assert_eq!(social(err), SocialError::ConcurrentModification);
        assert_eq!(repo.failures.load(Ordering::SeqCst), 7);
        assert_eq!(store.relationship_count().await, 0);
    }

    #[tokio::test]
    async fn racing_accept_and_block_leave_one_consistent_outcome() {
        let store = Arc::new(MemoryStore::default());
        let svc = engine(&store);
        let [a, b] = users(&store);

        svc.send_request(a, b).await.unwrap();

        let (accepted, blocked) = tokio::join!(svc.respond(a, b, true, b), svc.block(a, b));
        assert!(blocked.is_ok());

        let history = svc.history(a, b).await.unwrap();
        let seqs: Vec<_> = history.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, (1..=history.len() as i32).collect::<Vec<_>>());
        assert_eq!(svc.current_status(a, b).await.unwrap().status, FriendshipStatusCode::Blocked);
        // accept either landed before the block or found the request gone
        if let Err(err) = accepted {
            assert_eq!(social(err), SocialError::NonExistentFriendshipRequest);
        }
    }
}
