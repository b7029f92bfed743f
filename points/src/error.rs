//! Error types for the points engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PointsError {
    /// No wallet identity came with the request.
    #[error("Unauthorized")]
    Unauthorized,

    /// The wallet has no user row; the client must sign in first.
    #[error("User not found")]
    NotFound,

    #[error("Play session not found")]
    SessionNotFound,

    #[error("{0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    /// A persisted value could not be decoded.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, PointsError>;
