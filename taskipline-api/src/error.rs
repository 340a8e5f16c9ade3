/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers return `Result<T, ApiError>` which automatically converts
/// to the appropriate status code and a stable machine-readable error code.
///
/// Several flows deliberately collapse distinct failure causes into one
/// error so responses leak nothing: signin always answers
/// `INVALID_CREDENTIALS` whether the email or the password was wrong, and
/// token-redemption flows answer `INVALID_OR_EXPIRED_TOKEN` for unknown
/// and expired secrets alike.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use taskipline_shared::auth::password::PasswordError;
use taskipline_shared::auth::token::TokenError;
use taskipline_shared::email::EmailError;
use taskipline_shared::graph::GraphError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest { code: &'static str, message: String },

    /// Unauthorized (401)
    Unauthorized { code: &'static str, message: String },

    /// Forbidden (403)
    Forbidden { code: &'static str, message: String },

    /// Not found (404)
    NotFound { code: &'static str, message: String },

    /// Conflict (409) - e.g., duplicate email
    Conflict { code: &'static str, message: String },

    /// Unprocessable entity (422) - validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine-readable error code (e.g. "INVALID_CREDENTIALS")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// Signup with an email that already has an account.
    pub fn email_exists() -> Self {
        ApiError::Conflict {
            code: "EMAIL_ALREADY_EXISTS",
            message: "An account with this email already exists".to_string(),
        }
    }

    /// Unknown, expired, or already-used single-use secret. One error for
    /// all three causes.
    pub fn invalid_token() -> Self {
        ApiError::BadRequest {
            code: "INVALID_OR_EXPIRED_TOKEN",
            message: "This link is invalid or has expired".to_string(),
        }
    }

    /// Wrong email or wrong password. One error for both causes.
    pub fn invalid_credentials() -> Self {
        ApiError::Unauthorized {
            code: "INVALID_CREDENTIALS",
            message: "Invalid email or password".to_string(),
        }
    }

    /// Correct credentials but the email was never verified.
    pub fn unverified() -> Self {
        ApiError::Forbidden {
            code: "FORBIDDEN_UNVERIFIED",
            message: "Please verify your email address before signing in".to_string(),
        }
    }

    /// Missing, malformed, expired, or revoked session token.
    pub fn unauthenticated() -> Self {
        ApiError::Unauthorized {
            code: "UNAUTHENTICATED",
            message: "Authentication required".to_string(),
        }
    }

    pub fn goal_not_found() -> Self {
        ApiError::NotFound {
            code: "GOAL_NOT_FOUND",
            message: "Goal not found".to_string(),
        }
    }

    pub fn task_not_found() -> Self {
        ApiError::NotFound {
            code: "TASK_NOT_FOUND",
            message: "Task not found".to_string(),
        }
    }

    pub fn user_not_found() -> Self {
        ApiError::NotFound {
            code: "USER_NOT_FOUND",
            message: "User not found".to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest { code, message } => write!(f, "{}: {}", code, message),
            ApiError::Unauthorized { code, message } => write!(f, "{}: {}", code, message),
            ApiError::Forbidden { code, message } => write!(f, "{}: {}", code, message),
            ApiError::NotFound { code, message } => write!(f, "{}: {}", code, message),
            ApiError::Conflict { code, message } => write!(f, "{}: {}", code, message),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message, None),
            ApiError::Unauthorized { code, message } => {
                (StatusCode::UNAUTHORIZED, code, message, None)
            }
            ApiError::Forbidden { code, message } => (StatusCode::FORBIDDEN, code, message, None),
            ApiError::NotFound { code, message } => (StatusCode::NOT_FOUND, code, message, None),
            ApiError::Conflict { code, message } => (StatusCode::CONFLICT, code, message, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound {
                code: "NOT_FOUND",
                message: "Resource not found".to_string(),
            },
            sqlx::Error::Database(db_err) => {
                if let Some(constraint) = db_err.constraint() {
                    if constraint.contains("email") {
                        return ApiError::email_exists();
                    }
                    return ApiError::Conflict {
                        code: "CONFLICT",
                        message: format!("Constraint violation: {}", constraint),
                    };
                }

                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert graph errors to API errors
impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::GoalNotFound => ApiError::goal_not_found(),
            GraphError::TaskNotFound => ApiError::task_not_found(),
            GraphError::Db(err) => err.into(),
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Convert token errors to API errors
impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        ApiError::InternalError(format!("Token operation failed: {}", err))
    }
}

/// Convert email errors to API errors
///
/// Email delivery is best-effort; most callers log and discard instead of
/// converting, but the impl exists for the few places that do propagate.
impl From<EmailError> for ApiError {
    fn from(err: EmailError) -> Self {
        ApiError::InternalError(format!("Email delivery failed: {}", err))
    }
}

/// Converts `validator` failures to a 422 with per-field details.
pub fn validation_errors(e: validator::ValidationErrors) -> ApiError {
    let errors: Vec<ValidationErrorDetail> = e
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| ValidationErrorDetail {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Validation failed".to_string()),
            })
        })
        .collect();
    ApiError::ValidationError(errors)
}
