use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;
use storage::{dto::common::ErrorResponse, error::StorageError};
use validator::ValidationErrors;

/// Web layer errors
#[derive(Debug)]
pub enum WebError {
    Storage(StorageError),
    /// Malformed input: bad score, empty title, end before start.
    Validation(String),
    NotFound(String),
    /// Acting on another user's resource.
    Forbidden(String),
    /// Duplicate submission.
    Conflict(String),
    /// Operation not allowed in the contest's current status.
    InvalidState(String),
    Unauthorized(String),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "Storage error: {}", e),
            Self::Validation(msg) => write!(f, "Validation error: {}", msg),
            Self::NotFound(msg) => write!(f, "Not found: {}", msg),
            Self::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            Self::Conflict(msg) => write!(f, "Conflict: {}", msg),
            Self::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
        }
    }
}

impl WebError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Storage(StorageError::NotFound) => StatusCode::NOT_FOUND,
            Self::Storage(StorageError::VersionConflict(_)) => StatusCode::CONFLICT,
            Self::Storage(StorageError::ConstraintViolation(_)) => StatusCode::CONFLICT,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            // Duplicate submissions have always been reported as 400.
            Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::InvalidState(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Storage(StorageError::NotFound) => "Resource not found".to_string(),
            Self::Storage(StorageError::VersionConflict(id)) => {
                tracing::warn!(contest_id = %id, "Rejected stale contest write");
                "Contest was modified concurrently, please retry".to_string()
            }
            Self::Storage(StorageError::ConstraintViolation(msg)) => msg.clone(),
            Self::Storage(e) => {
                tracing::error!("Storage error: {:?}", e);
                "An internal error occurred".to_string()
            }
            Self::Validation(msg)
            | Self::NotFound(msg)
            | Self::Forbidden(msg)
            | Self::Conflict(msg)
            | Self::InvalidState(msg)
            | Self::Unauthorized(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let body = ErrorResponse::new(self.message());

        (status_code, Json(body)).into_response()
    }
}

impl From<StorageError> for WebError {
    fn from(error: StorageError) -> Self {
        Self::Storage(error)
    }
}

impl From<ValidationErrors> for WebError {
    fn from(errors: ValidationErrors) -> Self {
        let mut field_errors: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{}: {}", field, e.code))
                })
            })
            .collect();
        field_errors.sort();

        Self::Validation(field_errors.join(", "))
    }
}

pub type WebResult<T> = Result<T, WebError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn maps_each_kind_to_its_status() {
        let cases = [
            (WebError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (WebError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (WebError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (WebError::Conflict("x".into()), StatusCode::BAD_REQUEST),
            (WebError::InvalidState("x".into()), StatusCode::BAD_REQUEST),
            (WebError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (
                WebError::Storage(StorageError::VersionConflict(Uuid::nil())),
                StatusCode::CONFLICT,
            ),
            (
                WebError::Storage(StorageError::Database(sqlx_pool_timeout())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status_code(), expected, "{error}");
        }
    }

    #[test]
    fn storage_failures_hide_details() {
        let error = WebError::Storage(StorageError::Database(sqlx_pool_timeout()));
        assert_eq!(error.message(), "An internal error occurred");
    }

    fn sqlx_pool_timeout() -> storage::error::SqlxError {
        storage::error::SqlxError::PoolTimedOut
    }
}
