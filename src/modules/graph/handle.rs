use actix_web::{get, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    constants::ENV,
    middlewares::current_user_id,
    modules::{
        graph::{
            model::{PageRequest, Slice},
            repository_pg::GraphRepositoryPg,
            service::GraphService,
        },
        group::repository_pg::GroupRepositoryPg,
        user::{model::UserProfile, repository_pg::UserRepositoryPg},
    },
    utils::ValidatedQuery,
};

pub type GraphSvc = GraphService<GraphRepositoryPg, GroupRepositoryPg, UserRepositoryPg>;

fn bounded(page: PageRequest) -> Result<PageRequest, error::Error> {
    if page.page_size > ENV.max_page_size {
        return Err(error::Error::bad_request(format!(
            "Page size must be at most {}",
            ENV.max_page_size
        )));
    }
    Ok(page)
}

#[get("/friends")]
pub async fn list_friends(
    graph_service: web::Data<GraphSvc>,
    query: ValidatedQuery<PageRequest>,
    req: HttpRequest,
) -> Result<success::Success<Slice<UserProfile>>, error::Error> {
    let user_id = current_user_id(&req)?;
    let slice = graph_service.friends_of(user_id, bounded(query.0)?).await?;
    let slice = graph_service.resolve_profiles(slice).await?;

    Ok(success::Success::ok(Some(slice)).message("Friends retrieved successfully"))
}

#[get("/groups/{group_id}/friends")]
pub async fn list_group_friends(
    graph_service: web::Data<GraphSvc>,
    group_id: web::Path<Uuid>,
    query: ValidatedQuery<PageRequest>,
    req: HttpRequest,
) -> Result<success::Success<Slice<UserProfile>>, error::Error> {
    let user_id = current_user_id(&req)?;
    let slice =
        graph_service.friends_of_owned_group(user_id, *group_id, bounded(query.0)?).await?;
    let slice = graph_service.resolve_profiles(slice).await?;

    Ok(success::Success::ok(Some(slice)).message("Group friends retrieved successfully"))
}

#[get("/blocked")]
pub async fn list_blocked(
    graph_service: web::Data<GraphSvc>,
    query: ValidatedQuery<PageRequest>,
    req: HttpRequest,
) -> Result<success::Success<Slice<UserProfile>>, error::Error> {
    let user_id = current_user_id(&req)?;
    let slice = graph_service.blocked_by(user_id, bounded(query.0)?).await?;
    let slice = graph_service.resolve_profiles(slice).await?;

    Ok(success::Success::ok(Some(slice)).message("Blocked users retrieved successfully"))
}

#[get("/requests/incoming")]
pub async fn list_incoming_requests(
    graph_service: web::Data<GraphSvc>,
    query: ValidatedQuery<PageRequest>,
    req: HttpRequest,
) -> Result<success::Success<Slice<UserProfile>>, error::Error> {
    let user_id = current_user_id(&req)?;
    let slice = graph_service.requests_to(user_id, bounded(query.0)?).await?;
    let slice = graph_service.resolve_profiles(slice).await?;

    Ok(success::Success::ok(Some(slice)).message("Friend requests retrieved successfully"))
}

#[get("/requests/outgoing")]
pub async fn list_outgoing_requests(
    graph_service: web::Data<GraphSvc>,
    query: ValidatedQuery<PageRequest>,
    req: HttpRequest,
) -> Result<success::Success<Slice<UserProfile>>, error::Error> {
    let user_id = current_user_id(&req)?;
    let slice = graph_service.requests_from(user_id, bounded(query.0)?).await?;
    let slice = graph_service.resolve_profiles(slice).await?;

    Ok(success::Success::ok(Some(slice)).message("Sent requests retrieved successfully"))
}
