use uuid::Uuid;

use crate::{api::error, modules::graph::repository::SocialGraphRepository};

#[derive(Clone)]
pub struct GraphRepositoryPg {
    pool: sqlx::PgPool,
}

impl GraphRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_ids(
        &self,
        sql: &str,
        id: &Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Uuid>, error::SystemError> {
        let ids = sqlx::query_scalar::<_, Uuid>(sql)
            .bind(id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }
}

// served by friendships_{low,high}_status_idx
const FRIEND_IDS: &str = r#"
    SELECT CASE WHEN user_low = $1 THEN user_high ELSE user_low END AS other_id
    FROM friendships
    WHERE (user_low = $1 OR user_high = $1)
      AND latest_status = 'ACCEPTED'
    ORDER BY other_id
    LIMIT $2 OFFSET $3
"#;

const GROUP_MEMBER_IDS: &str = r#"
    SELECT CASE WHEN f.user_low = a.owner_id THEN f.user_high ELSE f.user_low END AS other_id
    FROM friend_group_assignments a
    JOIN friendships f
        ON f.id = a.friendship_id
    WHERE a.group_id = $1
      AND f.latest_status = 'ACCEPTED'
    ORDER BY other_id
    LIMIT $2 OFFSET $3
"#;

const BLOCKED_IDS: &str = r#"
    SELECT CASE WHEN user_low = $1 THEN user_high ELSE user_low END AS other_id
    FROM friendships
    WHERE (user_low = $1 OR user_high = $1)
      AND latest_status = 'BLOCKED'
      AND latest_specifier_id = $1
    ORDER BY other_id
    LIMIT $2 OFFSET $3
"#;

const INCOMING_REQUEST_IDS: &str = r#"
    SELECT CASE WHEN user_low = $1 THEN user_high ELSE user_low END AS other_id
    FROM friendships
    WHERE (user_low = $1 OR user_high = $1)
      AND latest_status = 'PENDING'
      AND latest_specifier_id <> $1
    ORDER BY other_id
    LIMIT $2 OFFSET $3
"#;

const OUTGOING_REQUEST_IDS: &str = r#"
    SELECT CASE WHEN user_low = $1 THEN user_high ELSE user_low END AS other_id
    FROM friendships
    WHERE (user_low = $1 OR user_high = $1)
      AND latest_status = 'PENDING'
      AND latest_specifier_id = $1
    ORDER BY other_id
    LIMIT $2 OFFSET $3
"#;

#[async_trait::async_trait]
impl SocialGraphRepository for GraphRepositoryPg {
    async fn find_friend_ids(
        &self,
        user_id: &Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Uuid>, error::SystemError> {
        self.fetch_ids(FRIEND_IDS, user_id, offset, limit).await
    }

    async fn find_group_member_ids(
        &self,
        group_id: &Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Uuid>, error::SystemError> {
        self.fetch_ids(GROUP_MEMBER_IDS, group_id, offset, limit).await
    }

    async fn find_blocked_ids(
        &self,
        user_id: &Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Uuid>, error::SystemError> {
        self.fetch_ids(BLOCKED_IDS, user_id, offset, limit).await
    }

    async fn find_incoming_request_ids(
        &self,
        user_id: &Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Uuid>, error::SystemError> {
        self.fetch_ids(INCOMING_REQUEST_IDS, user_id, offset, limit).await
    }

    async fn find_outgoing_request_ids(
        &self,
        user_id: &Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Uuid>, error::SystemError> {
        self.fetch_ids(OUTGOING_REQUEST_IDS, user_id, offset, limit).await
    }
}
