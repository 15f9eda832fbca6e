//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::DomainError;
use crate::infrastructure::traits::BackendError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    /// The server answered the login with its not-authenticated marker.
    #[error("login failed for user '{username}': not authenticated")]
    AuthFailure { username: String },

    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: BackendError,
    },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    /// Wrap a local I/O failure on `path`.
    pub fn io(action: &str, path: &std::path::Path, source: std::io::Error) -> Self {
        Self::OperationFailed {
            context: format!("{}: {}", action, path.display()),
            source: Box::new(source),
        }
    }

    /// Message of a request the service refused, if this is one.
    pub fn rejection(&self) -> Option<&str> {
        match self {
            ApplicationError::Domain(DomainError::Rejected { message, .. }) => Some(message),
            _ => None,
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
