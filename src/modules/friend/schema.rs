use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use uuid::Uuid;

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "friendship_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum FriendshipStatusCode {
    Pending,
    Accepted,
    Rejected,
    Blocked,
    /// Terminal marker: the blocker lifted the block.
    Unblocked,
    /// Terminal marker: one side ended an accepted friendship.
    Unfriended,
}

impl FriendshipStatusCode {
    pub const ALL: [FriendshipStatusCode; 6] = [
        FriendshipStatusCode::Pending,
        FriendshipStatusCode::Accepted,
        FriendshipStatusCode::Rejected,
        FriendshipStatusCode::Blocked,
        FriendshipStatusCode::Unblocked,
        FriendshipStatusCode::Unfriended,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FriendshipStatusCode::Pending => "PENDING",
            FriendshipStatusCode::Accepted => "ACCEPTED",
            FriendshipStatusCode::Rejected => "REJECTED",
            FriendshipStatusCode::Blocked => "BLOCKED",
            FriendshipStatusCode::Unblocked => "UNBLOCKED",
            FriendshipStatusCode::Unfriended => "UNFRIENDED",
        }
    }

    /// Statuses after which the pair behaves as if no relationship existed.
    pub fn is_baseline(&self) -> bool {
        matches!(
            self,
            FriendshipStatusCode::Rejected
                | FriendshipStatusCode::Unblocked
                | FriendshipStatusCode::Unfriended
        )
    }
}

/// One row per unordered pair of users.
///
/// `requester_id`/`target_id` record who opened the very first request and are
/// never used for lookups; `user_low`/`user_high` hold the normalized pair.
/// The `latest_*` columns mirror the newest history entry so hot paths never
/// scan the log.
#[derive(Debug, Clone, FromRow)]
pub struct FriendshipEntity {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub target_id: Uuid,
    pub user_low: Uuid,
    pub user_high: Uuid,
    pub latest_seq: i32,
    pub latest_status: FriendshipStatusCode,
    pub latest_specifier_id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl FriendshipEntity {
    pub fn other(&self, user_id: &Uuid) -> Option<Uuid> {
        if *user_id == self.user_low {
            Some(self.user_high)
        } else if *user_id == self.user_high {
            Some(self.user_low)
        } else {
            None
        }
    }

    /// The newest history entry, rebuilt from the cached columns.
    pub fn latest_entry(&self) -> FriendshipStatusEntity {
        FriendshipStatusEntity {
            friendship_id: self.id,
            seq: self.latest_seq,
            status: self.latest_status,
            specifier_id: self.latest_specifier_id,
            created_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FriendshipStatusEntity {
    pub friendship_id: Uuid,
    pub seq: i32,
    pub status: FriendshipStatusCode,
    pub specifier_id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StatusCodeEntity {
    pub code: FriendshipStatusCode,
    pub display_name: String,
}
