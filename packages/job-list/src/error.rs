//! Typed errors for the job list.
//!
//! Four kinds reach the controller boundary, where they are turned into a
//! user-visible message and a non-throwing [`Outcome`](crate::controller::Outcome).

use serde::Serialize;
use thiserror::Error;

/// Errors raised by the query client, stores, row actions and crawl service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobListError {
    /// Bad page, page size, status or request input. Never reaches the store.
    #[error("invalid input: {0}")]
    Validation(String),

    /// No active session, or the resource is not owned by the caller
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Network or database failure, including timeouts
    #[error("store error: {0}")]
    Store(String),

    /// Action attempted against a job in an incompatible status
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Discriminant of [`JobListError`], useful where only the category matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Unauthorized,
    Store,
    Conflict,
}

impl JobListError {
    pub fn validation(msg: impl Into<String>) -> Self {
        JobListError::Validation(msg.into())
    }

    pub fn store(err: impl std::fmt::Display) -> Self {
        JobListError::Store(err.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            JobListError::Validation(_) => ErrorKind::Validation,
            JobListError::Unauthorized(_) => ErrorKind::Unauthorized,
            JobListError::Store(_) => ErrorKind::Store,
            JobListError::Conflict(_) => ErrorKind::Conflict,
        }
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            JobListError::Validation(msg) => msg.clone(),
            JobListError::Unauthorized(_) => "You are not allowed to do that".to_string(),
            JobListError::Store(_) => "Could not reach the job store, showing last known data".to_string(),
            JobListError::Conflict(msg) => msg.clone(),
        }
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for JobListError {
    fn from(err: sqlx::Error) -> Self {
        JobListError::Store(err.to_string())
    }
}

/// Result type alias for job list operations.
pub type Result<T> = std::result::Result<T, JobListError>;
