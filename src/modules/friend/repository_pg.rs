use std::time::Duration;
use uuid::Uuid;

use crate::{
    api::error::{self, SocialError},
    modules::friend::{
        model::{AppendStatus, RelationshipKey},
        repository::FriendshipRepository,
        schema::{FriendshipEntity, FriendshipStatusEntity, StatusCodeEntity},
    },
};

#[derive(Clone)]
pub struct FriendRepositoryPg {
    pool: sqlx::PgPool,
    lock_timeout: Duration,
}

impl FriendRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool, lock_timeout: Duration::from_secs(2) }
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }
}

#[async_trait::async_trait]
impl FriendshipRepository for FriendRepositoryPg {
    async fn find_by_key(
        &self,
        key: &RelationshipKey,
    ) -> Result<Option<FriendshipEntity>, error::SystemError> {
        let (user_low, user_high) = key.normalized();

        let friendship = sqlx::query_as::<_, FriendshipEntity>(
            "SELECT * FROM friendships WHERE user_low = $1 AND user_high = $2",
        )
        .bind(user_low)
        .bind(user_high)
        .fetch_optional(&self.pool)
        .await?;

        Ok(friendship)
    }

    async fn find_history(
        &self,
        friendship_id: &Uuid,
    ) -> Result<Vec<FriendshipStatusEntity>, error::SystemError> {
        let history = sqlx::query_as::<_, FriendshipStatusEntity>(
            "SELECT * FROM friendship_statuses WHERE friendship_id = $1 ORDER BY seq ASC",
        )
        .bind(friendship_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(history)
    }

    async fn append_status(
        &self,
        append: &AppendStatus,
    ) -> Result<FriendshipStatusEntity, error::SystemError> {
        let (user_low, user_high) = append.key.normalized();
        let mut tx = self.pool.begin().await?;

        // bounded wait on the row lock; 55P03 maps to ConcurrentModification
        sqlx::query(&format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await?;

        let updated: Option<Uuid> = if append.expected_seq == 0 {
            sqlx::query_scalar::<_, Uuid>(
                r#"
                INSERT INTO friendships (
                    id, requester_id, target_id, user_low, user_high,
                    latest_seq, latest_status, latest_specifier_id, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, 1, $6, $7, $8, $8)
                ON CONFLICT (user_low, user_high) DO NOTHING
                RETURNING id
                "#,
            )
            .bind(Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext)))
            .bind(append.key.requester_id())
            .bind(append.key.target_id())
            .bind(user_low)
            .bind(user_high)
            .bind(append.status)
            .bind(append.specifier_id)
            .bind(append.created_at)
            .fetch_optional(&mut *tx)
            .await?
        } else {
            sqlx::query_scalar::<_, Uuid>(
                r#"
                UPDATE friendships
                SET
                    latest_seq          = latest_seq + 1,
                    latest_status       = $3,
                    latest_specifier_id = $4,
                    updated_at          = GREATEST(updated_at, $5)
                WHERE user_low = $1 AND user_high = $2 AND latest_seq = $6
                RETURNING id
                "#,
            )
            .bind(user_low)
            .bind(user_high)
            .bind(append.status)
            .bind(append.specifier_id)
            .bind(append.created_at)
            .bind(append.expected_seq)
            .fetch_optional(&mut *tx)
            .await?
        };
        let friendship_id = updated.ok_or(SocialError::ConcurrentModification)?;

        let entry = sqlx::query_as::<_, FriendshipStatusEntity>(
            r#"
            INSERT INTO friendship_statuses (friendship_id, seq, status, specifier_id, created_at)
            SELECT id, latest_seq, latest_status, latest_specifier_id, updated_at
            FROM friendships
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(friendship_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| match error::SystemError::from(err) {
            error::SystemError::Conflict(_) => SocialError::ConcurrentModification.into(),
            other => other,
        })?;

        if append.clear_group {
            sqlx::query("DELETE FROM friend_group_assignments WHERE friendship_id = $1")
                .bind(friendship_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(entry)
    }

    async fn find_status_codes(&self) -> Result<Vec<StatusCodeEntity>, error::SystemError> {
        let codes = sqlx::query_as::<_, StatusCodeEntity>(
            "SELECT code, display_name FROM friendship_status_codes ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(codes)
    }

    async fn delete_by_user(&self, user_id: &Uuid) -> Result<u64, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        // history and group labels go with the record (ON DELETE CASCADE)
        let rows = sqlx::query("DELETE FROM friendships WHERE user_low = $1 OR user_high = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM friend_groups WHERE owner_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::friend::schema::FriendshipStatusCode;
    use sqlx::PgPool;

    fn append(
        key: RelationshipKey,
        expected_seq: i32,
        status: FriendshipStatusCode,
        specifier_id: Uuid,
    ) -> AppendStatus {
        AppendStatus {
            key,
            expected_seq,
            status,
            specifier_id,
            clear_group: false,
            created_at: chrono::Utc::now(),
        }
    }

    fn pair() -> (Uuid, Uuid, RelationshipKey) {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        (a, b, RelationshipKey::new(a, b).unwrap())
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn stale_seq_append_is_rejected(pool: PgPool) {
        let repo = FriendRepositoryPg::new(pool);
        let (a, b, key) = pair();

        repo.append_status(&append(key, 0, FriendshipStatusCode::Pending, a)).await.unwrap();
        repo.append_status(&append(key, 1, FriendshipStatusCode::Accepted, b)).await.unwrap();

        let err = repo
            .append_status(&append(key, 1, FriendshipStatusCode::Rejected, b))
            .await
            .unwrap_err();
        assert_eq!(err.social(), Some(SocialError::ConcurrentModification));

        let record = repo.find_by_key(&key).await.unwrap().unwrap();
        assert_eq!(record.latest_seq, 2);
        assert_eq!(record.latest_status, FriendshipStatusCode::Accepted);
        assert_eq!(record.latest_specifier_id, b);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn racing_creates_keep_one_record_per_pair(pool: PgPool) {
        let repo = FriendRepositoryPg::new(pool);
        let (a, b, ab) = pair();
        let ba = RelationshipKey::new(b, a).unwrap();

        let first_req = append(ab, 0, FriendshipStatusCode::Pending, a);
        let second_req = append(ba, 0, FriendshipStatusCode::Pending, b);
        let (first, second) = tokio::join!(
            repo.append_status(&first_req),
            repo.append_status(&second_req),
        );

        assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
        let lost = first.err().or(second.err()).unwrap();
        assert!(lost.is_retryable());

        let record = repo.find_by_key(&ab).await.unwrap().unwrap();
        assert_eq!(repo.find_history(&record.id).await.unwrap().len(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn history_mirrors_appends_in_order(pool: PgPool) {
        let repo = FriendRepositoryPg::new(pool);
        let (a, b, key) = pair();

        let first =
            repo.append_status(&append(key, 0, FriendshipStatusCode::Pending, a)).await.unwrap();
        let mut late = append(key, 1, FriendshipStatusCode::Rejected, b);
        late.created_at = first.created_at - chrono::Duration::seconds(30);
        let second = repo.append_status(&late).await.unwrap();

        let history = repo.find_history(&first.friendship_id).await.unwrap();
        assert_eq!(history, vec![first.clone(), second.clone()]);
        assert!(second.created_at >= first.created_at);

        let record = repo.find_by_key(&key).await.unwrap().unwrap();
        assert_eq!(record.latest_entry(), second);
        assert_eq!(record.requester_id, a);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn held_row_lock_times_out_as_concurrent_modification(pool: PgPool) {
        let repo =
            FriendRepositoryPg::new(pool.clone()).with_lock_timeout(Duration::from_millis(50));
        let (a, _, key) = pair();
        let entry =
            repo.append_status(&append(key, 0, FriendshipStatusCode::Pending, a)).await.unwrap();

        let mut holder = pool.begin().await.unwrap();
        sqlx::query("SELECT id FROM friendships WHERE id = $1 FOR UPDATE")
            .bind(entry.friendship_id)
            .execute(&mut *holder)
            .await
            .unwrap();

        let err = repo
            .append_status(&append(key, 1, FriendshipStatusCode::Blocked, a))
            .await
            .unwrap_err();
        assert_eq!(err.social(), Some(SocialError::ConcurrentModification));

        holder.rollback().await.unwrap();
        repo.append_status(&append(key, 1, FriendshipStatusCode::Blocked, a)).await.unwrap();
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn status_codes_are_seeded(pool: PgPool) {
        let repo = FriendRepositoryPg::new(pool);
        let codes = repo.find_status_codes().await.unwrap();
        assert_eq!(codes.len(), FriendshipStatusCode::ALL.len());
    }
}
