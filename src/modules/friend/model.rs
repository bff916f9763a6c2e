use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::error::SocialError,
    modules::friend::schema::{FriendshipStatusCode, FriendshipStatusEntity},
};

/// Identity of a relationship between two users.
///
/// The requester side is kept for audit; equality and hashing ignore the
/// orientation so `(a, b)` and `(b, a)` name the same relationship.
#[derive(Debug, Clone, Copy, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipKey {
    requester_id: Uuid,
    target_id: Uuid,
}

impl RelationshipKey {
    pub fn new(requester_id: Uuid, target_id: Uuid) -> Result<Self, SocialError> {
        if requester_id == target_id {
            return Err(SocialError::TargetUserIsCurrentUser);
        }
        Ok(Self { requester_id, target_id })
    }

    pub fn requester_id(&self) -> Uuid {
        self.requester_id
    }

    pub fn target_id(&self) -> Uuid {
        self.target_id
    }

    pub fn normalized(&self) -> (Uuid, Uuid) {
        if self.requester_id <= self.target_id {
            (self.requester_id, self.target_id)
        } else {
            (self.target_id, self.requester_id)
        }
    }

    pub fn involves(&self, user_id: &Uuid) -> bool {
        self.requester_id == *user_id || self.target_id == *user_id
    }
}

impl PartialEq for RelationshipKey {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Hash for RelationshipKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

/// Conditional append of one history entry.
///
/// `expected_seq` is the seq of the newest entry the caller validated against
/// (0 when no record existed). The store rejects the write with
/// `ConcurrentModification` if the record moved on in the meantime.
#[derive(Debug, Clone)]
pub struct AppendStatus {
    pub key: RelationshipKey,
    pub expected_seq: i32,
    pub status: FriendshipStatusCode,
    pub specifier_id: Uuid,
    pub clear_group: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestBody {
    pub target_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendshipStatusResponse {
    pub user_id: Uuid,
    pub other_id: Uuid,
    pub status: FriendshipStatusCode,
    pub specifier_id: Uuid,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl FriendshipStatusResponse {
    pub fn from_entry(user_id: Uuid, other_id: Uuid, entry: FriendshipStatusEntity) -> Self {
        FriendshipStatusResponse {
            user_id,
            other_id,
            status: entry.status,
            specifier_id: entry.specifier_id,
            updated_at: entry.created_at,
        }
    }
}
