use serde::Serialize;
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GroupEntity {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Label placing one accepted friendship into one of its owner's groups.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GroupAssignmentEntity {
    pub friendship_id: Uuid,
    pub group_id: Uuid,
    pub owner_id: Uuid,
    pub assigned_at: chrono::DateTime<chrono::Utc>,
}
