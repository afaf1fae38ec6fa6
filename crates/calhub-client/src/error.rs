//! Client error types.

use std::io;

use thiserror::Error;

use calhub_core::TracingError;
use calhub_providers::RegistryError;
use calhub_server::{HubError, SchedulerError, SyncError};

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Providers could not be set up.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Providers could not be queried.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// A mutation failed.
    #[error(transparent)]
    Hub(#[from] HubError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("logging setup failed: {0}")]
    Tracing(#[from] TracingError),

    /// Bad command-line input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A calendar named on the command line does not exist.
    #[error("calendar not found: {0}")]
    CalendarNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
