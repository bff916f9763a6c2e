use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::borrow::Cow;

use crate::constants::ENV;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Bad Request: {0}")]
    BadRequest(Cow<'static, str>),
    #[error("Unauthorized: {0}")]
    Unauthorized(Cow<'static, str>),
    #[error("Forbidden: {0}")]
    Forbidden(Cow<'static, str>),
    #[error("Not Found: {0}")]
    NotFound(Cow<'static, str>),
    #[error("Conflict: {0}")]
    Conflict(Cow<'static, str>),
    #[error("Internal Server Error")]
    InternalServer,
}

#[derive(serde::Serialize)]
pub struct ErrorBody {
    pub message: Cow<'static, str>,
}

impl Error {
    pub fn bad_request(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Conflict(msg.into())
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match *self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::InternalServer => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let header = ("Access-Control-Allow-Origin", ENV.frontend_url.as_str());
        let mut res = HttpResponse::build(self.status_code());

        res.insert_header(header);
        res.insert_header(("Access-Control-Allow-Credentials", "true"));

        match self {
            // Has Message
            Error::NotFound(msg)
            | Error::Conflict(msg)
            | Error::Unauthorized(msg)
            | Error::BadRequest(msg)
            | Error::Forbidden(msg) => res.json(ErrorBody { message: msg.clone() }),
            // No Message
            Error::InternalServer => {
                res.json(ErrorBody { message: "Internal Server Error".into() })
            }
        }
    }
}

/// Domain failures of the friendship engine and graph queries.
///
/// All of these are recoverable conditions handed back to the caller. The
/// HTTP layer picks the status code and sends [`SocialError::code`]; turning
/// the code into localized text is the client's job.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocialError {
    #[error("target user is the current user")]
    TargetUserIsCurrentUser,
    #[error("target user is already a friend or has a pending request")]
    TargetUserIsAlreadyFriend,
    #[error("a block is in effect between the users")]
    BlockedUser,
    #[error("no matching pending friendship request")]
    NonExistentFriendshipRequest,
    #[error("target user is not a friend")]
    TargetUserIsNotFriend,
    #[error("relationship is not blocked by this user")]
    NotBlocked,
    #[error("friend cannot be placed in this group")]
    UserNotInGroup,
    #[error("relationship was modified concurrently")]
    ConcurrentModification,
    #[error("relationship not found")]
    RelationshipNotFound,
    #[error("group not found")]
    GroupNotFound,
    #[error("user not found")]
    UserNotFound,
}

impl SocialError {
    pub fn code(&self) -> &'static str {
        match self {
            SocialError::TargetUserIsCurrentUser => "TARGET_USER_IS_CURRENT_USER",
            SocialError::TargetUserIsAlreadyFriend => "TARGET_USER_IS_ALREADY_FRIEND",
            SocialError::BlockedUser => "BLOCKED_USER",
            SocialError::NonExistentFriendshipRequest => "NON_EXISTENT_FRIENDSHIP_REQUEST",
            SocialError::TargetUserIsNotFriend => "TARGET_USER_IS_NOT_FRIEND",
            SocialError::NotBlocked => "NOT_BLOCKED",
            SocialError::UserNotInGroup => "USER_NOT_IN_GROUP",
            SocialError::ConcurrentModification => "CONCURRENT_MODIFICATION",
            SocialError::RelationshipNotFound => "RELATIONSHIP_NOT_FOUND",
            SocialError::GroupNotFound => "GROUP_NOT_FOUND",
            SocialError::UserNotFound => "USER_NOT_FOUND",
        }
    }

    /// Only a lost optimistic append is worth retrying with fresh state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SocialError::ConcurrentModification)
    }
}

impl From<SocialError> for Error {
    fn from(value: SocialError) -> Self {
        let code = value.code();
        match value {
            SocialError::TargetUserIsCurrentUser | SocialError::TargetUserIsNotFriend => {
                Error::bad_request(code)
            }
            SocialError::BlockedUser | SocialError::NotBlocked | SocialError::UserNotInGroup => {
                Error::forbidden(code)
            }
            SocialError::NonExistentFriendshipRequest
            | SocialError::RelationshipNotFound
            | SocialError::GroupNotFound
            | SocialError::UserNotFound => Error::not_found(code),
            SocialError::TargetUserIsAlreadyFriend | SocialError::ConcurrentModification => {
                Error::conflict(code)
            }
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SystemError {
    // jwt errors
    #[error("JWT Error")]
    JwtError(#[from] jsonwebtoken::errors::Error),
    // sqlx errors
    #[error("Database Error : {0}")]
    DatabaseError(Cow<'static, str>),
    #[error("Migration Error")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
    // domain errors
    #[error(transparent)]
    Social(#[from] SocialError),
    // Custom Errors
    #[error("Bad Request: {0}")]
    BadRequest(Cow<'static, str>),
    #[error("Database Conflict: {0:?}")]
    Conflict(Option<DbErrorMeta>),
    #[error("Internal System Error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

fn conflict_message(meta: &Option<DbErrorMeta>) -> Cow<'static, str> {
    let Some(m) = meta else {
        return "Duplicate value".into();
    };

    let Some(constraint) = &m.constraint else {
        return "Duplicate value".into();
    };

    let field = constraint.split('_').next_back().unwrap_or("value");

    let mut chars = field.chars();
    let field = match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => "Value".to_string(),
    };

    format!("{field} already exists").into()
}

#[derive(Debug)]
pub struct DbErrorMeta {
    pub code: Option<String>,
    pub constraint: Option<String>,
    pub message: String,
}

impl From<SystemError> for Error {
    fn from(value: SystemError) -> Self {
        match value {
            SystemError::Social(err) => Error::from(err),
            SystemError::BadRequest(msg) => Error::BadRequest(msg),
            SystemError::Conflict(meta) => Error::Conflict(conflict_message(&meta)),
            _ => {
                log::error!("Internal Server Error: {:?}", value);
                Error::InternalServer
            }
        }
    }
}

impl From<sqlx::Error> for SystemError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some("23505") => {
                    return SystemError::Conflict(Some(DbErrorMeta {
                        code: db_err.code().map(|s| s.to_string()),
                        constraint: db_err.constraint().map(|s| s.to_string()),
                        message: db_err.message().to_string(),
                    }));
                }
                // lock_not_available, serialization_failure
                Some("55P03") | Some("40001") => {
                    log::warn!("Lost relationship write race: {}", db_err.message());
                    return SystemError::Social(SocialError::ConcurrentModification);
                }
                _ => {
                    log::error!("Unhandled DB error: {:?}", db_err);
                    return SystemError::DatabaseError(db_err.message().to_string().into());
                }
            }
        }
        log::error!("{:?}", err);
        SystemError::InternalError(Box::new(err))
    }
}

impl SystemError {
    pub fn bad_request(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// The domain kind carried by this error, if any.
    pub fn social(&self) -> Option<SocialError> {
        match self {
            SystemError::Social(err) => Some(*err),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.social().is_some_and(|e| e.is_retryable())
    }
}
