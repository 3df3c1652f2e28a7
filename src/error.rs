//! # Error Handling
//!
//! Custom error types and how they become HTTP responses.
//!
//! ## Response Format:
//! Every failure answers with the same JSON envelope the browser panel
//! checks for:
//! ```json
//! {
//!   "success": false,
//!   "error": "Media host rejected upload (401): Invalid Signature",
//!   "error_type": "media_host_error",
//!   "timestamp": "2025-01-01T12:00:00Z"
//! }
//! ```
//!
//! ## Rust Concepts:
//! - **enum variants**: one per failure category, each mapped to a status code
//! - **From trait**: lets handlers use `?` on sqlx, IO, multipart and media
//!   errors and get the right category automatically
//! - **ResponseError trait**: actix calls `error_response` for any handler
//!   returning `Err(AppError)`

use crate::media::MediaError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    /// Unexpected server-side failure (IO, task join, ...)
    Internal(String),

    /// Client sent malformed data
    BadRequest(String),

    /// Requested record doesn't exist
    NotFound(String),

    /// Configuration file or environment variable problems
    ConfigError(String),

    /// Well-formed input that breaks a rule (empty file, bad limits)
    ValidationError(String),

    /// Upload exceeded the configured size limit
    PayloadTooLarge(String),

    /// The media host could not take the file
    MediaHost(String),

    /// Reading or writing the audio reference log failed
    Database(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            AppError::MediaHost(msg) => write!(f, "Media host error: {}", msg),
            AppError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl AppError {
    /// Machine-readable category sent as `error_type`.
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Internal(_) => "internal_error",
            AppError::BadRequest(_) => "bad_request",
            AppError::NotFound(_) => "not_found",
            AppError::ConfigError(_) => "config_error",
            AppError::ValidationError(_) => "validation_error",
            AppError::PayloadTooLarge(_) => "payload_too_large",
            AppError::MediaHost(_) => "media_host_error",
            AppError::Database(_) => "database_error",
        }
    }

    /// The bare message, without the category prefix `Display` adds.
    pub fn message(&self) -> &str {
        match self {
            AppError::Internal(msg)
            | AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::ConfigError(msg)
            | AppError::ValidationError(msg)
            | AppError::PayloadTooLarge(msg)
            | AppError::MediaHost(msg)
            | AppError::Database(msg) => msg,
        }
    }
}

/// ## HTTP Status Code Mapping:
/// - BadRequest/ValidationError → 400
/// - NotFound → 404
/// - PayloadTooLarge → 413
/// - everything else → 500, carrying the caught error's message
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Internal(_)
            | AppError::ConfigError(_)
            | AppError::MediaHost(_)
            | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": self.message(),
            "error_type": self.error_type(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// JSON parsing errors come from client bodies, so they are a 400.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        AppError::BadRequest(format!("Multipart error: {}", err))
    }
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        AppError::MediaHost(err.to_string())
    }
}

/// Shorthand for handler results.
pub type AppResult<T> = Result<T, AppError>;
