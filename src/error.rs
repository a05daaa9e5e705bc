use thiserror::Error;

use crate::models::ListingStatus;

/// Error type shared by the backend clients, the session provider and the screens.
#[derive(Debug, Error)]
pub enum SooqError {
    /// A required form field was empty. Raised before any network call.
    #[error("{field} is required")]
    MissingField { field: &'static str },

    /// A form field was present but could not be accepted.
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// The hosted backend answered with a non-success status.
    #[error("{message} (status {status})")]
    Remote { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("realtime channel error: {0}")]
    Realtime(String),

    #[error("status change {from} -> {to} is not allowed")]
    InvalidTransition {
        from: ListingStatus,
        to: ListingStatus,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SooqError>;
