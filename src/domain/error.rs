//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent protocol contract violations and rejected requests.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DomainError {
    /// The response body is not the JSON array of strings the service promises.
    #[error("unexpected response from server: {reason}")]
    Decode { reason: String, body: String },

    /// The service accepted the request but refused it with a non-zero status.
    #[error("{message}")]
    Rejected { status: i64, message: String },

    #[error("missing argument: {0}")]
    MissingArgument(String),

    #[error("operation registered twice: {0}")]
    DuplicateOperation(String),
}

impl DomainError {
    pub(crate) fn decode(reason: impl Into<String>, body: &str) -> Self {
        Self::Decode {
            reason: reason.into(),
            body: body.to_string(),
        }
    }
}
