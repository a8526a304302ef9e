//! Tether error types.

use crate::host::{HostError, StorageError};
use thiserror::Error;

/// Result type for Tether operations.
pub type Result<T> = std::result::Result<T, TetherError>;

/// Errors surfaced by a request call.
#[derive(Debug, Error)]
pub enum TetherError {
    /// Invalid or incomplete configuration, raised before any host call.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Raised from inside an interceptor.
    #[error("Interceptor error: {0}")]
    Interceptor(String),

    /// The host primitive reported failure. Carried untransformed.
    #[error("Transport error: {0}")]
    Transport(HostError),

    /// A successful response declared as JSON could not be parsed.
    #[error("Failed to parse response data: {0}")]
    DataParse(#[from] serde_json::Error),

    /// The host key-value store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The host dropped a task's callbacks without settling it.
    #[error("{adapter} task was dropped without settling")]
    Abandoned {
        /// Name of the adapter that issued the task.
        adapter: String,
    },

    /// The adapter or host panicked while dispatching.
    #[error("Dispatch panicked: {0}")]
    Panicked(String),
}

impl TetherError {
    /// Shorthand for [`TetherError::Config`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Shorthand for [`TetherError::Interceptor`].
    pub fn interceptor(message: impl Into<String>) -> Self {
        Self::Interceptor(message.into())
    }

    /// Check if this is a host transport failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Check if this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is a response parsing error.
    pub fn is_data_parse(&self) -> bool {
        matches!(self, Self::DataParse(_))
    }

    /// The host failure payload, for transport errors.
    pub fn host_error(&self) -> Option<&HostError> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HostError> for TetherError {
    fn from(err: HostError) -> Self {
        Self::Transport(err)
    }
}
