use actix_web::{delete, get, post, put, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::current_user_id,
    modules::{
        friend::{model::RelationshipKey, repository_pg::FriendRepositoryPg},
        group::{
            model::CreateGroupBody,
            repository_pg::GroupRepositoryPg,
            schema::{GroupAssignmentEntity, GroupEntity},
            service::GroupService,
        },
    },
    utils::ValidatedJson,
};

pub type GroupSvc = GroupService<GroupRepositoryPg, FriendRepositoryPg>;

#[post("")]
pub async fn create_group(
    group_service: web::Data<GroupSvc>,
    body: ValidatedJson<CreateGroupBody>,
    req: HttpRequest,
) -> Result<success::Success<GroupEntity>, error::Error> {
    let owner_id = current_user_id(&req)?;
    let group = group_service.create_group(owner_id, &body.0.name).await?;

    Ok(success::Success::created(Some(group)).message("Group created successfully"))
}

#[get("")]
pub async fn list_groups(
    group_service: web::Data<GroupSvc>,
    req: HttpRequest,
) -> Result<success::Success<Vec<GroupEntity>>, error::Error> {
    let owner_id = current_user_id(&req)?;
    let groups = group_service.list_groups(owner_id).await?;

    Ok(success::Success::ok(Some(groups)).message("Groups retrieved successfully"))
}

#[delete("/{group_id}")]
pub async fn delete_group(
    group_service: web::Data<GroupSvc>,
    group_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let owner_id = current_user_id(&req)?;
    group_service.delete_group(owner_id, *group_id).await?;
    Ok(success::Success::no_content())
}

#[put("/{group_id}/members/{friend_id}")]
pub async fn assign_member(
    group_service: web::Data<GroupSvc>,
    path: web::Path<(Uuid, Uuid)>,
    req: HttpRequest,
) -> Result<success::Success<GroupAssignmentEntity>, error::Error> {
    let owner_id = current_user_id(&req)?;
    let (group_id, friend_id) = path.into_inner();
    let key = RelationshipKey::new(owner_id, friend_id).map_err(error::Error::from)?;
    let assignment = group_service.assign_to_group(owner_id, key, group_id).await?;

    Ok(success::Success::ok(Some(assignment)).message("Friend added to group"))
}

#[delete("/members/{friend_id}")]
pub async fn clear_member(
    group_service: web::Data<GroupSvc>,
    friend_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let owner_id = current_user_id(&req)?;
    let key = RelationshipKey::new(owner_id, *friend_id).map_err(error::Error::from)?;
    group_service.clear_group(key).await?;
    Ok(success::Success::no_content())
}
