//! CLI layer: argument parsing, command dispatch and terminal output

pub mod args;
pub mod dispatcher;
pub mod error;
pub mod output;

pub use args::Cli;
pub use dispatcher::{Call, Dispatcher, Outcome, Resolution};
pub use error::{CliError, CliResult};
