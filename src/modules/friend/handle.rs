use actix_web::{delete, get, post, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::current_user_id,
    modules::{
        friend::{
            model::{FriendRequestBody, FriendshipStatusResponse},
            repository_pg::FriendRepositoryPg,
            schema::{FriendshipStatusEntity, StatusCodeEntity},
            service::FriendService,
        },
        user::repository_pg::UserRepositoryPg,
    },
    utils::ValidatedJson,
};

pub type FriendSvc = FriendService<FriendRepositoryPg, UserRepositoryPg>;

#[post("/requests")]
pub async fn send_friend_request(
    friend_service: web::Data<FriendSvc>,
    body: ValidatedJson<FriendRequestBody>,
    req: HttpRequest,
) -> Result<success::Success<FriendshipStatusEntity>, error::Error> {
    let requester_id = current_user_id(&req)?;
    let entry = friend_service.send_request(requester_id, body.0.target_id).await?;

    Ok(success::Success::created(Some(entry)).message("Friend request sent successfully"))
}

#[post("/requests/{requester_id}/accept")]
pub async fn accept_friend_request(
    friend_service: web::Data<FriendSvc>,
    requester_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<FriendshipStatusEntity>, error::Error> {
    let user_id = current_user_id(&req)?;
    let entry = friend_service.respond(*requester_id, user_id, true, user_id).await?;

    Ok(success::Success::ok(Some(entry)).message("Friend request accepted successfully"))
}

#[post("/requests/{requester_id}/reject")]
pub async fn reject_friend_request(
    friend_service: web::Data<FriendSvc>,
    requester_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<FriendshipStatusEntity>, error::Error> {
    let user_id = current_user_id(&req)?;
    let entry = friend_service.respond(*requester_id, user_id, false, user_id).await?;

    Ok(success::Success::ok(Some(entry)).message("Friend request rejected"))
}

#[delete("/{friend_id}")]
pub async fn remove_friend(
    friend_service: web::Data<FriendSvc>,
    friend_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let user_id = current_user_id(&req)?;
    friend_service.unfriend(user_id, *friend_id).await?;
    Ok(success::Success::no_content())
}

#[post("/blocks/{user_id}")]
pub async fn block_user(
    friend_service: web::Data<FriendSvc>,
    blocked_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<FriendshipStatusEntity>, error::Error> {
    let blocker_id = current_user_id(&req)?;
    let entry = friend_service.block(blocker_id, *blocked_id).await?;

    Ok(success::Success::ok(Some(entry)).message("User blocked"))
}

#[delete("/blocks/{user_id}")]
pub async fn unblock_user(
    friend_service: web::Data<FriendSvc>,
    blocked_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let blocker_id = current_user_id(&req)?;
    friend_service.unblock(blocker_id, *blocked_id).await?;
    Ok(success::Success::no_content())
}

#[get("/{user_id}/status")]
pub async fn get_status(
    friend_service: web::Data<FriendSvc>,
    other_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<FriendshipStatusResponse>, error::Error> {
    let user_id = current_user_id(&req)?;
    let other_id = other_id.into_inner();
    let entry = friend_service.current_status(user_id, other_id).await?;

    Ok(success::Success::ok(Some(FriendshipStatusResponse::from_entry(user_id, other_id, entry))))
}

#[get("/{user_id}/history")]
pub async fn get_history(
    friend_service: web::Data<FriendSvc>,
    other_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<Vec<FriendshipStatusEntity>>, error::Error> {
    let user_id = current_user_id(&req)?;
    let history = friend_service.history(user_id, *other_id).await?;

    Ok(success::Success::ok(Some(history)).message("Relationship history retrieved successfully"))
}

#[get("/status-codes")]
pub async fn list_status_codes(
    friend_service: web::Data<FriendSvc>,
) -> Result<success::Success<Vec<StatusCodeEntity>>, error::Error> {
    let codes = friend_service.status_codes().await?;
    Ok(success::Success::ok(Some(codes)))
}
