/// Error Handling Module
///
/// A single taxonomy is shared by every service and every RPC method:
/// 1. Repository errors (what the store reports)
/// 2. Application errors (what a caller is allowed to see)
/// 3. RPC response mapping (status codes, JSON body, structured logging)
///
/// Store-level failures are translated into an `AppError` at the service
/// boundary. Anything that reaches the transport without a recognized kind is
/// coerced into `AppError::InternalFailure` by the logging interceptor.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;

/// ============================================================================
/// 1. REPOSITORY ERRORS
/// ============================================================================

/// Errors reported by a repository implementation
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A uniqueness constraint rejected the write
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    /// No row matched the lookup
    #[error("record not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

/// SQLSTATE for `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

impl RepositoryError {
    /// Classify a sqlx error, turning unique violations into `Conflict`
    /// and empty single-row results into `NotFound`.
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound,
            sqlx::Error::Database(db_err)
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                RepositoryError::Conflict(constraint)
            }
            other => RepositoryError::Database(other),
        }
    }
}

/// ============================================================================
/// 2. APPLICATION ERROR TYPE
/// ============================================================================

/// Every failure a caller can observe.
///
/// Display strings are what clients see, so variants that wrap internal
/// detail must never print it.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("error: invalid email")]
    InvalidEmail,
    #[error("error: invalid password")]
    InvalidPassword,
    #[error("error: user already exists")]
    UserAlreadyExists,
    #[error("error: invalid token")]
    InvalidToken,
    #[error("error: expired token")]
    ExpiredToken,
    #[error("error: internal server error")]
    HashingFailure(String),
    #[error("error: internal server error")]
    InternalFailure(String),
    #[error("error: no permissions")]
    PermissionDenied,
    #[error("error: malformed request: {0}")]
    MalformedRequest(String),
    #[error("error: invalid post id")]
    InvalidPostId,
    #[error("error: post not found")]
    PostNotFound,
    #[error("error: idempotency key already exists")]
    IdempotencyKeyAlreadyExists,
}

impl AppError {
    /// Shorthand for an internal failure with a log-only detail
    pub fn internal(detail: impl Into<String>) -> Self {
        AppError::InternalFailure(detail.into())
    }

    /// RPC-style code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidEmail
            | AppError::InvalidPassword
            | AppError::MalformedRequest(_)
            | AppError::InvalidPostId => "INVALID_ARGUMENT",
            AppError::UserAlreadyExists | AppError::IdempotencyKeyAlreadyExists => {
                "ALREADY_EXISTS"
            }
            AppError::PostNotFound => "NOT_FOUND",
            AppError::InvalidToken | AppError::ExpiredToken | AppError::PermissionDenied => {
                "PERMISSION_DENIED"
            }
            AppError::HashingFailure(_) | AppError::InternalFailure(_) => "INTERNAL",
        }
    }

    /// True for kinds whose detail must stay inside the process
    pub fn is_internal(&self) -> bool {
        matches!(self, AppError::HashingFailure(_) | AppError::InternalFailure(_))
    }
}

// ============================================================================
// 3. RPC RESPONSE MAPPING
// ============================================================================

/// Error body returned for every failed RPC
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    /// Unique error ID for correlating client reports with logs
    pub error_id: String,
    pub code: String,
    pub message: String,
    pub status: u16,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, code: String, message: String, status: u16) -> Self {
        Self {
            error_id,
            code,
            message,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Converts errors to RPC responses with matching log output
pub trait ErrorHandler {
    fn error_response(&self, error_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, error_id: &str);
}

impl ErrorHandler for AppError {
    fn error_response(&self, error_id: &str) -> (StatusCode, ErrorResponse) {
        let status = ResponseError::status_code(self);
        let response = ErrorResponse::new(
            error_id.to_string(),
            self.code().to_string(),
            self.to_string(),
            status.as_u16(),
        );
        (status, response)
    }

    fn log_error(&self, error_id: &str) {
        match self {
            AppError::HashingFailure(detail) => {
                tracing::error!(error_id = error_id, detail = %detail, "Credential hashing failed");
            }
            AppError::InternalFailure(detail) => {
                tracing::error!(error_id = error_id, detail = %detail, "Internal error");
            }
            AppError::InvalidToken | AppError::ExpiredToken | AppError::PermissionDenied => {
                tracing::warn!(error_id = error_id, error = %self, "Authorization rejected");
            }
            _ => {
                tracing::info!(error_id = error_id, error = %self, code = self.code(), "Request rejected");
            }
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self.code() {
            "INVALID_ARGUMENT" => StatusCode::BAD_REQUEST,
            "ALREADY_EXISTS" => StatusCode::CONFLICT,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "PERMISSION_DENIED" => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&error_id);

        let (status, body) = <Self as ErrorHandler>::error_response(self, &error_id);
        HttpResponse::build(status).json(body)
    }
}
