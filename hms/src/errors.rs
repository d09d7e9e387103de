use crate::api::models::accounts::{AccountStatus, Role};
use crate::db::errors::DbError;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Malformed or missing request data
    #[error("{message}")]
    Validation { message: String },

    /// Password rejected by the strength policy
    #[error("Password does not meet strength requirements")]
    WeakPassword { reasons: Vec<String> },

    /// A live account already holds the email
    #[error("User with this email already exists")]
    UserExists,

    /// Account missing or soft-deleted
    #[error("User not found")]
    UserNotFound,

    /// Account exists but is not allowed to authenticate
    #[error("Account is {status}")]
    UserInactive { status: AccountStatus },

    /// Unknown email or wrong password
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Bad signature, expired, malformed or otherwise unusable token
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Authentication required but not provided
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Caller's role is not permitted to perform the operation
    #[error("Role {role} is not permitted to perform this operation")]
    Forbidden { role: Role },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation { .. } | Error::WeakPassword { .. } => StatusCode::BAD_REQUEST,
            Error::Unauthenticated { .. } | Error::InvalidCredentials | Error::InvalidToken => StatusCode::UNAUTHORIZED,
            Error::UserInactive { .. } | Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::UserNotFound => StatusCode::NOT_FOUND,
            Error::UserExists => StatusCode::CONFLICT,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "VALIDATION_ERROR",
            Error::WeakPassword { .. } => "WEAK_PASSWORD",
            Error::UserExists => "USER_EXISTS",
            Error::UserNotFound => "USER_NOT_FOUND",
            Error::UserInactive { .. } => "USER_INACTIVE",
            Error::InvalidCredentials => "INVALID_CREDENTIALS",
            Error::InvalidToken => "INVALID_TOKEN",
            Error::Unauthenticated { .. } => "UNAUTHENTICATED",
            Error::Forbidden { .. } => "FORBIDDEN",
            Error::Database(DbError::NotFound) => "NOT_FOUND",
            Error::Database(DbError::UniqueViolation { .. }) => "CONFLICT",
            Error::Database(DbError::CheckViolation { .. }) => "VALIDATION_ERROR",
            Error::Internal { .. } | Error::Database(DbError::Other(_)) | Error::Other(_) => "INTERNAL",
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation { message } => message.clone(),
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Authentication required".to_string()),
            Error::Forbidden { .. } => "Insufficient permissions".to_string(),
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { .. } if db_err.is_email_conflict() => {
                    "An account with this email address already exists".to_string()
                }
                DbError::UniqueViolation { .. } => "Resource already exists".to_string(),
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::WeakPassword { reasons } => Some(json!({ "reasons": reasons })),
            Error::UserInactive { status } => Some(json!({ "status": status })),
            _ => None,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated { .. }
            | Error::InvalidCredentials
            | Error::InvalidToken
            | Error::Forbidden { .. }
            | Error::UserInactive { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::Validation { .. } | Error::WeakPassword { .. } | Error::UserExists | Error::UserNotFound => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        let mut body = json!({
            "success": false,
            "code": self.code(),
            "error": self.user_message(),
            "statusCode": status.as_u16(),
            "timestamp": Utc::now(),
        });
        if let Some(details) = self.details() {
            body["details"] = details;
        }

        (status, Json(body)).into_response()
    }
}

/// Malformed or mistyped JSON bodies surface as validation errors
impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::Validation {
            message: rejection.body_text(),
        }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
