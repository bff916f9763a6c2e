use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateGroupBody {
    #[validate(length(min = 1, max = 64, message = "Group name must be 1 to 64 characters long"))]
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct AssignGroup {
    pub friendship_id: Uuid,
    pub group_id: Uuid,
    pub owner_id: Uuid,
    /// Seq of the ACCEPTED entry the assignment was validated against.
    pub expected_seq: i32,
}
