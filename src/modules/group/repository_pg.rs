use std::time::Duration;
use uuid::Uuid;

use crate::{
    api::error::{self, SocialError},
    modules::{
        friend::schema::FriendshipStatusCode,
        group::{
            model::AssignGroup,
            repository::GroupRepository,
            schema::{GroupAssignmentEntity, GroupEntity},
        },
    },
};

#[derive(Clone)]
pub struct GroupRepositoryPg {
    pool: sqlx::PgPool,
    lock_timeout: Duration,
}

impl GroupRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool, lock_timeout: Duration::from_secs(2) }
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }
}

#[async_trait::async_trait]
impl GroupRepository for GroupRepositoryPg {
    async fn create_group(
        &self,
        owner_id: &Uuid,
        name: &str,
    ) -> Result<GroupEntity, error::SystemError> {
        let group = sqlx::query_as::<_, GroupEntity>(
            r#"
            INSERT INTO friend_groups (id, owner_id, name)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext)))
        .bind(owner_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(group)
    }

    async fn find_group(&self, group_id: &Uuid) -> Result<Option<GroupEntity>, error::SystemError> {
        let group = sqlx::query_as::<_, GroupEntity>("SELECT * FROM friend_groups WHERE id = $1")
            .bind(group_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(group)
    }

    async fn find_groups_by_owner(
        &self,
        owner_id: &Uuid,
    ) -> Result<Vec<GroupEntity>, error::SystemError> {
        let groups = sqlx::query_as::<_, GroupEntity>(
            "SELECT * FROM friend_groups WHERE owner_id = $1 ORDER BY name",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }

    async fn delete_group(&self, group_id: &Uuid) -> Result<bool, error::SystemError> {
        let rows = sqlx::query("DELETE FROM friend_groups WHERE id = $1")
            .bind(group_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows > 0)
    }

    async fn assign_group(
        &self,
        assign: &AssignGroup,
    ) -> Result<GroupAssignmentEntity, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await?;

        // holds off a concurrent delete_group until the label is written
        let group_exists = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM friend_groups WHERE id = $1 FOR SHARE",
        )
        .bind(assign.group_id)
        .fetch_optional(&mut *tx)
        .await?
        .is_some();

        if !group_exists {
            return Err(SocialError::GroupNotFound.into());
        }

        // row lock keeps a concurrent block/unfriend out until the label is written
        let current = sqlx::query_as::<_, (i32, FriendshipStatusCode)>(
            "SELECT latest_seq, latest_status FROM friendships WHERE id = $1 FOR UPDATE",
        )
        .bind(assign.friendship_id)
        .fetch_optional(&mut *tx)
        .await?;

        if current != Some((assign.expected_seq, FriendshipStatusCode::Accepted)) {
            return Err(SocialError::ConcurrentModification.into());
        }

        let assignment = sqlx::query_as::<_, GroupAssignmentEntity>(
            r#"
            INSERT INTO friend_group_assignments (friendship_id, group_id, owner_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (friendship_id) DO UPDATE
            SET group_id = EXCLUDED.group_id,
                owner_id = EXCLUDED.owner_id,
                assigned_at = NOW()
            RETURNING *
            "#,
        )
        .bind(assign.friendship_id)
        .bind(assign.group_id)
        .bind(assign.owner_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(assignment)
    }

    async fn clear_group(&self, friendship_id: &Uuid) -> Result<bool, error::SystemError> {
        let rows = sqlx::query("DELETE FROM friend_group_assignments WHERE friendship_id = $1")
            .bind(friendship_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows > 0)
    }

    async fn find_assignment(
        &self,
        friendship_id: &Uuid,
    ) -> Result<Option<GroupAssignmentEntity>, error::SystemError> {
        let assignment = sqlx::query_as::<_, GroupAssignmentEntity>(
            "SELECT * FROM friend_group_assignments WHERE friendship_id = $1",
        )
        .bind(friendship_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(assignment)
    }
}
