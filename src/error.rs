//! Error Handling Module
//!
//! Unified error handling for the authentication core and the thin HTTP
//! surface around it. It covers:
//! 1. Domain-specific error types (auth, store, configuration)
//! 2. The unified `AppError` used for control flow
//! 3. HTTP response mapping with structured logging
//! 4. Request context shared by handler logs and error bodies
//!
//! Recoverable authentication failures always collapse into a generic
//! unauthorized response. Nothing that distinguishes "unknown user" from
//! "wrong password", and no token or hash material, ever reaches a response
//! body or a log line.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

// ============================================================================
// 1. DOMAIN-SPECIFIC ERROR TYPES
// ============================================================================

/// Authentication and credential errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization` header, or an empty one
    MissingCredential,
    /// `Authorization` header present but not `<Scheme> <value>`
    MalformedHeader,
    /// Password mismatch (also used for unknown accounts)
    InvalidCredential,
    /// Access token signature does not verify under the secret
    InvalidSignature,
    /// Access token cannot be parsed or carries unexpected claims
    MalformedToken,
    /// Access or refresh token past its expiry
    TokenExpired,
    /// Refresh token has been revoked
    TokenRevoked,
    /// Refresh token unknown to the store
    TokenNotFound,
    /// The OS entropy source failed
    RandomSourceFailure,
}

impl AuthError {
    /// Stable code used in HTTP error bodies
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "MISSING_CREDENTIAL",
            AuthError::MalformedHeader => "MALFORMED_HEADER",
            AuthError::InvalidCredential => "INVALID_CREDENTIALS",
            AuthError::InvalidSignature
            | AuthError::MalformedToken
            | AuthError::TokenExpired
            | AuthError::TokenRevoked
            | AuthError::TokenNotFound => "TOKEN_INVALID",
            AuthError::RandomSourceFailure => "INTERNAL_ERROR",
        }
    }

    /// Whether the error is fatal for the operation rather than a caller mistake
    pub fn is_fatal(&self) -> bool {
        matches!(self, AuthError::RandomSourceFailure)
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::MissingCredential => write!(f, "Missing credential"),
            AuthError::MalformedHeader => write!(f, "Malformed authorization header"),
            AuthError::InvalidCredential => write!(f, "Invalid credentials"),
            AuthError::InvalidSignature => write!(f, "Invalid token signature"),
            AuthError::MalformedToken => write!(f, "Malformed token"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::TokenRevoked => write!(f, "Token has been revoked"),
            AuthError::TokenNotFound => write!(f, "Token not found"),
            AuthError::RandomSourceFailure => write!(f, "Random source failure"),
        }
    }
}

impl StdError for AuthError {}

/// Resource Store errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    UniqueViolation(String),
    NotFound(String),
    Unavailable(String),
    Timeout,
    Unexpected(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::UniqueViolation(msg) => write!(f, "Duplicate entry: {}", msg),
            StoreError::NotFound(msg) => write!(f, "Not found: {}", msg),
            StoreError::Unavailable(msg) => write!(f, "Store unavailable: {}", msg),
            StoreError::Timeout => write!(f, "Store call exceeded its deadline"),
            StoreError::Unexpected(msg) => write!(f, "Store error: {}", msg),
        }
    }
}

impl StdError for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                StoreError::UniqueViolation(db_err.message().to_string())
            }
            sqlx::Error::PoolTimedOut => StoreError::Timeout,
            sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::Unexpected(other.to_string()),
        }
    }
}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    MissingRequired(String),
    InvalidValue(String),
    ParseError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired(msg) => write!(f, "Missing required config: {}", msg),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Config parse error: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => ConfigError::MissingRequired(key),
            other => ConfigError::ParseError(other.to_string()),
        }
    }
}

// ============================================================================
// 2. UNIFIED APPLICATION ERROR TYPE
// ============================================================================

/// Central error type that all application errors map to
#[derive(Debug)]
pub enum AppError {
    Auth(AuthError),
    Store(StoreError),
    Config(ConfigError),
    Internal(String),
}

impl AppError {
    /// Returns the authentication error, if this is one
    pub fn as_auth(&self) -> Option<AuthError> {
        match self {
            AppError::Auth(e) => Some(*e),
            _ => None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Store(e) => write!(f, "{}", e),
            AppError::Config(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

// ============================================================================
// FROM IMPLEMENTATIONS
// ============================================================================

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Store(err.into())
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, message) = match self {
            AppError::Auth(e) if e.is_fatal() => (
                StatusCode::INTERNAL_SERVER_ERROR,
                e.code(),
                "Internal server error",
            ),
            AppError::Auth(AuthError::InvalidCredential) => (
                StatusCode::UNAUTHORIZED,
                AuthError::InvalidCredential.code(),
                "Incorrect email or password",
            ),
            AppError::Auth(AuthError::MissingCredential) => (
                StatusCode::UNAUTHORIZED,
                AuthError::MissingCredential.code(),
                "Missing authentication credential",
            ),
            AppError::Auth(AuthError::MalformedHeader) => (
                StatusCode::UNAUTHORIZED,
                AuthError::MalformedHeader.code(),
                "Malformed authorization header",
            ),
            AppError::Auth(e) => (StatusCode::UNAUTHORIZED, e.code(), "Invalid or expired token"),

            AppError::Store(StoreError::Unavailable(_)) | AppError::Store(StoreError::Timeout) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "Storage temporarily unavailable",
            ),
            AppError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORE_ERROR",
                "Storage error occurred",
            ),

            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                "Server configuration error",
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error",
            ),
        };

        let error_response = ErrorResponse::new(
            request_id.to_string(),
            message.to_string(),
            code.to_string(),
            status.as_u16(),
        );

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Auth(e) if e.is_fatal() => {
                tracing::error!(request_id = request_id, error = %e, "Fatal authentication error");
            }
            AppError::Auth(AuthError::InvalidCredential) => {
                tracing::warn!(request_id = request_id, error = %self, "Invalid credentials attempt");
            }
            AppError::Auth(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Authentication error");
            }
            AppError::Store(StoreError::UniqueViolation(_)) => {
                tracing::warn!(request_id = request_id, error = %self, "Duplicate entry attempt");
            }
            AppError::Store(e) => {
                tracing::error!(request_id = request_id, error = %e, "Store error");
            }
            AppError::Config(e) => {
                tracing::error!(request_id = request_id, error = %e, "Configuration error");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

impl AppError {
    /// Log under `request_id` and render the body carrying the same id
    fn respond(&self, request_id: &str) -> HttpResponse {
        self.log_error(request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, request_id);

        HttpResponse::build(status).json(error_response)
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        self.respond(&uuid::Uuid::new_v4().to_string())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(e) if e.is_fatal() => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Store(StoreError::Unavailable(_)) | AppError::Store(StoreError::Timeout) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// ============================================================================
// 4. REQUEST CONTEXT
// ============================================================================

/// Per-request context attached to handler log lines
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub operation: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            operation: operation.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    /// Tag `err` with this request's id, so the error log line and the
    /// `error_id` in the response body match the handler's own log lines
    pub fn fail(&self, err: impl Into<AppError>) -> RequestError {
        RequestError {
            request_id: self.request_id.clone(),
            operation: self.operation.clone(),
            error: err.into(),
        }
    }
}

/// An `AppError` raised while serving a request with a known id
#[derive(Debug)]
pub struct RequestError {
    pub request_id: String,
    pub operation: String,
    pub error: AppError,
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.operation, self.error)
    }
}

impl StdError for RequestError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.error)
    }
}

impl ResponseError for RequestError {
    fn error_response(&self) -> HttpResponse {
        self.error.respond(&self.request_id)
    }

    fn status_code(&self) -> StatusCode {
        self.error.status_code()
    }
}
