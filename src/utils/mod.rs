use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use validator::Validate;

use crate::api::error;

/// Access token claims. Tokens are issued by the identity service; this
/// crate only verifies them to learn who is calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: uuid::Uuid,
    pub iat: u64,
    pub exp: u64,
}

impl Claims {
    pub fn decode(token: &str, secret: &[u8]) -> Result<Self, error::SystemError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_nbf = false;
        let token_data = decode::<Self>(token, &DecodingKey::from_secret(secret), &validation)?;
        Ok(token_data.claims)
    }
}

fn bad_request<E: std::fmt::Display>(err: E) -> error::Error {
    error::Error::BadRequest(err.to_string().into())
}

fn validated<T: Validate>(value: T) -> Result<T, error::Error> {
    value.validate().map_err(bad_request)?;
    Ok(value)
}

/// JSON body extractor that also runs the `validator` rules of `T`.
pub struct ValidatedJson<T>(pub T);

impl<T> FromRequest for ValidatedJson<T>
where
    T: Validate + DeserializeOwned + 'static,
{
    type Error = error::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = web::Json::<T>::from_request(req, payload);
        Box::pin(async move {
            let body = fut.await.map_err(bad_request)?;
            validated(body.into_inner()).map(ValidatedJson)
        })
    }
}

/// Query string extractor, validated the same way as [`ValidatedJson`].
pub struct ValidatedQuery<T>(pub T);

impl<T> FromRequest for ValidatedQuery<T>
where
    T: Validate + DeserializeOwned + 'static,
{
    type Error = error::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = web::Query::<T>::from_request(req, payload);
        Box::pin(async move {
            let query = fut.await.map_err(bad_request)?;
            validated(query.into_inner()).map(ValidatedQuery)
        })
    }
}
