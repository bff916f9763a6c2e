use actix_web::{
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    Error, HttpMessage, HttpRequest,
};
use log::debug;
use uuid::Uuid;

use crate::{api::error, constants::ENV, utils::Claims};

/// The verified caller of a request, placed in the request extensions by
/// [`authentication`].
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Uuid);

pub async fn authentication<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<B>, Error>
where
    B: MessageBody + 'static,
{
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| error::Error::unauthorized("Missing bearer token"))?;

    let claims = Claims::decode(token, ENV.jwt_secret.as_ref()).map_err(|e| {
        debug!("Rejected token on {}: {}", req.path(), e);
        error::Error::forbidden("Token Invalid or Expired")
    })?;

    req.extensions_mut().insert(CurrentUser(claims.sub));

    next.call(req).await
}

/// Id of the authenticated caller. Fails for routes mounted outside the
/// authenticated scope.
pub fn current_user_id(req: &HttpRequest) -> Result<Uuid, error::Error> {
    req.extensions()
        .get::<CurrentUser>()
        .map(|user| user.0)
        .ok_or_else(|| error::Error::unauthorized("Unauthorized"))
}
