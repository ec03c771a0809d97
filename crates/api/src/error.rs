use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use crewdesk_services::access::{AccessError, ResolveError};
use crewdesk_services::auth::AuthError;
use crewdesk_services::dao::attendance::AttendanceError;
use crewdesk_services::dao::base::DaoError;
use serde::Serialize;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    Conflict(String),
    Internal(String),
    Validation(String),
    Access(AccessError),
    LimitExceeded { remaining: i64 },
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    remaining: Option<i64>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message, remaining) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found".to_string(), msg, None),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request".to_string(), msg, None)
            }
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized".to_string(), msg, None)
            }
            ApiError::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, "forbidden".to_string(), msg, None)
            }
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict".to_string(), msg, None),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal".to_string(),
                msg,
                None,
            ),
            ApiError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation".to_string(),
                msg,
                None,
            ),
            ApiError::Access(err) => {
                let status = match err {
                    AccessError::OrphanedMembership => StatusCode::NOT_FOUND,
                    AccessError::InvalidRole(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    _ => StatusCode::FORBIDDEN,
                };
                (status, err.code().to_string(), err.to_string(), None)
            }
            ApiError::LimitExceeded { remaining } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rectification_limit_exceeded".to_string(),
                format!(
                    "Monthly rectification limit reached, {} attempts remaining",
                    remaining
                ),
                Some(remaining),
            ),
        };

        let body = ErrorResponse {
            error: error_type,
            message,
            remaining,
        };

        (status, Json(body)).into_response()
    }
}

impl From<DaoError> for ApiError {
    fn from(err: DaoError) -> Self {
        match err {
            DaoError::NotFound => ApiError::NotFound("Resource not found".to_string()),
            DaoError::DuplicateKey(msg) => ApiError::Conflict(msg),
            DaoError::Forbidden(msg) => ApiError::Forbidden(msg),
            DaoError::Validation(msg) => ApiError::Validation(msg),
            DaoError::Mongo(e) => ApiError::Internal(e.to_string()),
            DaoError::BsonSer(e) => ApiError::Internal(e.to_string()),
            DaoError::BsonDe(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid credentials".to_string())
            }
            AuthError::TokenExpired => ApiError::Unauthorized("Token expired".to_string()),
            AuthError::InvalidToken(msg) => ApiError::Unauthorized(msg),
            AuthError::HashError(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        ApiError::Access(err)
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Dao(e) => e.into(),
            ResolveError::Access(e) => e.into(),
        }
    }
}

impl From<AttendanceError> for ApiError {
    fn from(err: AttendanceError) -> Self {
        match err {
            AttendanceError::InvalidStatus { .. } => ApiError::Validation(err.to_string()),
            AttendanceError::LimitExceeded { remaining } => ApiError::LimitExceeded { remaining },
            AttendanceError::Dao(e) => e.into(),
        }
    }
}
