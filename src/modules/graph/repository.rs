use uuid::Uuid;

use crate::api::error;

/// Read side of the relationship graph. Every method returns the ids of the
/// other party, ascending, skipping `offset` rows and returning at most
/// `limit`.
#[async_trait::async_trait]
pub trait SocialGraphRepository {
    async fn find_friend_ids(
        &self,
        user_id: &Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Uuid>, error::SystemError>;

    async fn find_group_member_ids(
        &self,
        group_id: &Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Uuid>, error::SystemError>;

    /// Users currently blocked *by* `user_id`; never the users blocking them.
    async fn find_blocked_ids(
        &self,
        user_id: &Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Uuid>, error::SystemError>;

    async fn find_incoming_request_ids(
        &self,
        user_id: &Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Uuid>, error::SystemError>;

    async fn find_outgoing_request_ids(
        &self,
        user_id: &Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Uuid>, error::SystemError>;
}
