//! Error handling for the PodPulse client

use std::fmt;
use thiserror::Error;

/// Unified error type for the PodPulse client
#[derive(Error, Debug)]
pub enum Error {
    /// Network or HTTP related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// WebSocket errors from the realtime connection
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JWT errors
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Local file errors (reading uploads from disk)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Document store errors
    #[error("Database error: {0}")]
    Database(String),

    /// Object store errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Live feed errors
    #[error("Realtime error: {0}")]
    Realtime(String),

    /// Callable function errors not covered by a more specific variant
    #[error("Function error: {0}")]
    Function(String),

    /// The backend (or a client-side gate) refused the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The request was malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The addressed record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or malformed form input
    #[error("{0}")]
    Validation(String),

    /// The admin status could not be determined
    #[error("Admin check failed for user {0}")]
    AdminCheckFailed(String),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// General errors
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Create a new authentication error
    pub fn auth<T: fmt::Display>(msg: T) -> Self {
        Error::Auth(msg.to_string())
    }

    /// Create a new database error
    pub fn database<T: fmt::Display>(msg: T) -> Self {
        Error::Database(msg.to_string())
    }

    /// Create a new storage error
    pub fn storage<T: fmt::Display>(msg: T) -> Self {
        Error::Storage(msg.to_string())
    }

    /// Create a new realtime error
    pub fn realtime<T: fmt::Display>(msg: T) -> Self {
        Error::Realtime(msg.to_string())
    }

    /// Create a new function error
    pub fn function<T: fmt::Display>(msg: T) -> Self {
        Error::Function(msg.to_string())
    }

    /// Create a new validation error
    pub fn validation<T: fmt::Display>(msg: T) -> Self {
        Error::Validation(msg.to_string())
    }

    /// Create a new general error
    pub fn general<T: fmt::Display>(msg: T) -> Self {
        Error::General(msg.to_string())
    }

    /// Map a failed HTTP response onto the error taxonomy.
    ///
    /// `fallback` builds the service-specific variant for statuses that
    /// carry no extra meaning.
    pub fn from_status(status: u16, body: &str, fallback: fn(String) -> Error) -> Self {
        let detail = if body.is_empty() {
            format!("status {}", status)
        } else {
            format!("status {}: {}", status, body)
        };
        match status {
            401 | 403 => Error::PermissionDenied(detail),
            404 => Error::NotFound(detail),
            400 | 422 => Error::InvalidArgument(detail),
            _ => fallback(detail),
        }
    }

    /// Map a callable status code (`PERMISSION_DENIED`, ...) to an error.
    pub fn from_callable_status(status: &str, message: String) -> Self {
        match status {
            "PERMISSION_DENIED" | "UNAUTHENTICATED" => Error::PermissionDenied(message),
            "INVALID_ARGUMENT" => Error::InvalidArgument(message),
            "NOT_FOUND" => Error::NotFound(message),
            _ => Error::Function(format!("{}: {}", status, message)),
        }
    }

    /// The callable status code this error is reported with.
    pub fn callable_status(&self) -> &'static str {
        match self {
            Error::PermissionDenied(_) => "PERMISSION_DENIED",
            Error::InvalidArgument(_) | Error::Validation(_) => "INVALID_ARGUMENT",
            Error::NotFound(_) => "NOT_FOUND",
            _ => "INTERNAL",
        }
    }

    /// Whether the backend refused the operation for the current caller
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Error::PermissionDenied(_))
    }

    /// Generic message shown to users: "Error fetching X. Please try again."
    ///
    /// Validation messages are already meant for users and pass through.
    pub fn user_message(&self, what: &str) -> String {
        match self {
            Error::Validation(msg) => msg.clone(),
            _ => format!("Error fetching {}. Please try again.", what),
        }
    }
}
