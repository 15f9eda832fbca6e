//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::infrastructure::InfraError;

/// Corrective hint shown when credentials are incomplete.
pub const CREDENTIALS_HINT: &str = "Please check whether\n\t--username CLOUDLAND_USERNAME\n\t--password CLOUDLAND_PASSWORD\n\t--endpoint CLOUDLAND_ENDPOINT\nare set correctly.";

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    /// Rendered clap error or usage message.
    #[error("{0}")]
    Usage(String),

    #[error("{}", CREDENTIALS_HINT)]
    MissingCredentials { missing: Vec<&'static str> },
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

impl From<DomainError> for CliError {
    fn from(e: DomainError) -> Self {
        CliError::from(ApplicationError::Domain(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => crate::exitcode::USAGE,
            CliError::MissingCredentials { .. } => crate::exitcode::CONFIG,
            CliError::Infra(e) => match e {
                InfraError::Backend(_) => crate::exitcode::SOFTWARE,
                InfraError::Application(e) => match e {
                    ApplicationError::Domain(DomainError::Rejected { .. }) => {
                        crate::exitcode::FAILURE
                    }
                    ApplicationError::Domain(DomainError::Decode { .. }) => {
                        crate::exitcode::PROTOCOL
                    }
                    ApplicationError::Domain(_) => crate::exitcode::SOFTWARE,
                    ApplicationError::AuthFailure { .. } => crate::exitcode::NOPERM,
                    ApplicationError::Transport { .. } => crate::exitcode::UNAVAILABLE,
                    ApplicationError::Config { .. } => crate::exitcode::CONFIG,
                    ApplicationError::OperationFailed { .. } => crate::exitcode::SOFTWARE,
                },
            },
        }
    }

    /// Message of a request the service refused; printed as the command's status line.
    pub fn rejection(&self) -> Option<&str> {
        match self {
            CliError::Infra(InfraError::Application(e)) => e.rejection(),
            _ => None,
        }
    }
}
