//! Errors raised at the edges of the crate.
//!
//! The view pipeline itself never fails: malformed values degrade silently.
//! These errors only come from parsing user-written filter expressions,
//! reading server configuration and decoding JSON payloads.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewError {
    #[error("invalid filter expression at position {position}: {message}")]
    Query { position: usize, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ViewError {
    pub(crate) fn query(position: usize, message: impl Into<String>) -> Self {
        ViewError::Query {
            position,
            message: message.into(),
        }
    }
}
