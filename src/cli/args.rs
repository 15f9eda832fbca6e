//! Global options, parsed with clap derive
//!
//! The subcommands are generated from the operation registry at run time, so this
//! parse only looks at the global options and takes the rest of the command line
//! verbatim. The dispatcher re-parses strictly once the command tree is built.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};
use clap_complete::Shell;

use crate::cli::{CliError, CliResult};

pub const BIN_NAME: &str = "cloudland";

/// Command line client for the Cloudland virtualization control panel
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = BIN_NAME, version, about, long_about = None)]
#[command(disable_help_flag = true, disable_version_flag = true)]
#[command(disable_help_subcommand = true, ignore_errors = true)]
#[command(subcommand_value_name = "SUBCOMMAND")]
pub struct Cli {
    /// Print help
    #[arg(short = 'h', long, action = ArgAction::SetTrue)]
    pub help: bool,

    /// Shows the client version and exits
    #[arg(short = 'V', long, action = ArgAction::SetTrue)]
    pub version: bool,

    /// Enable debug output (-d info, -d -d debug, -d -d -d trace)
    #[arg(short = 'd', long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Control panel API endpoint
    #[arg(long, global = true, value_name = "URL", env = "CLOUDLAND_ENDPOINT")]
    pub endpoint: Option<String>,

    #[arg(long, global = true, value_name = "USERNAME", env = "CLOUDLAND_USERNAME")]
    pub username: Option<String>,

    /// Password or its SHA-1 hex digest
    #[arg(
        long,
        global = true,
        value_name = "PASSWORD",
        env = "CLOUDLAND_PASSWORD",
        hide_env_values = true
    )]
    pub password: Option<String>,

    /// Config file (default: $XDG_CONFIG_HOME/cloudland/cloudland.toml)
    #[arg(long, global = true, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Print shell completions and exit
    #[arg(long, value_name = "SHELL", value_enum)]
    pub generate: Option<Shell>,

    #[command(subcommand)]
    pub command: Option<Invocation>,
}

/// Whatever follows the global options.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    #[command(external_subcommand)]
    Command(Vec<String>),
}

impl Cli {
    /// Parse global options, tolerating unknown subcommands and their arguments.
    pub fn parse_globals<I, T>(argv: I) -> CliResult<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(argv).map_err(|e| CliError::Usage(e.render().to_string()))
    }

    /// Subcommand name, if any.
    pub fn subcommand(&self) -> Option<&str> {
        match &self.command {
            Some(Invocation::Command(words)) => words.first().map(String::as_str),
            None => None,
        }
    }

    /// Words following the subcommand name.
    pub fn subcommand_args(&self) -> &[String] {
        match &self.command {
            Some(Invocation::Command(words)) if !words.is_empty() => &words[1..],
            _ => &[],
        }
    }
}
