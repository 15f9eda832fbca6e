//! Command dispatcher
//!
//! Builds the command tree from the operation registry, resolves one command line
//! to one operation and runs it against an authenticated client.

use std::ffi::OsString;

use clap::builder::{BoolishValueParser, ValueParser};
use clap::error::ErrorKind;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command, CommandFactory};
use tracing::{debug, instrument};

use crate::application::operation::HELP_COMMAND;
use crate::application::{
    ArgValue, OperationDescriptor, ParamKind, ParamSpec, ParsedArgs, Registry,
};
use crate::cli::args::{Cli, BIN_NAME};
use crate::cli::{CliError, CliResult};
use crate::config::Settings;
use crate::domain::protocol::COLUMN_SEPARATOR;
use crate::domain::{Credentials, Row};
use crate::infrastructure::di::ServiceContainer;

/// Terminal state of one invocation. Printing is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Help(String),
    Version(String),
    Completions(String),
    /// Rows of a completed operation and the header they render under.
    Rows {
        header: Vec<String>,
        rows: Vec<Row>,
    },
}

/// An operation resolved from the command line, not yet sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub operation: &'static str,
    pub args: ParsedArgs,
    /// `-d` occurrences, before or after the subcommand name
    pub debug: u8,
    endpoint: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

/// What a command line resolves to before any settings or services exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Done(Outcome),
    Call(Call),
}

pub struct Dispatcher {
    registry: Registry,
}

impl Dispatcher {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Full command tree: global options, one subcommand per operation, and `help`.
    pub fn command(&self) -> Command {
        let mut cmd = Cli::command()
            .ignore_errors(false)
            .allow_external_subcommands(false)
            .subcommand(
                Command::new(HELP_COMMAND)
                    .about("Display help for <SUBCOMMAND>.")
                    .arg(
                        Arg::new("command")
                            .value_name("SUBCOMMAND")
                            .help("Display help for <SUBCOMMAND>."),
                    ),
            );
        for op in self.registry.iter() {
            cmd = cmd.subcommand(operation_command(op));
        }
        cmd
    }

    /// Run one invocation; `cli` holds the already parsed global options.
    ///
    /// `services` is only called once the command line names a valid operation,
    /// so help, version and completions never load settings.
    pub fn dispatch<I, T, F>(&self, cli: &Cli, argv: I, services: F) -> CliResult<Outcome>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
        F: FnOnce(&Call) -> CliResult<ServiceContainer>,
    {
        match self.resolve(cli, argv)? {
            Resolution::Done(outcome) => Ok(outcome),
            Resolution::Call(call) => {
                let container = services(&call)?;
                self.invoke(&call, &container)
            }
        }
    }

    /// Resolve the command line to a local outcome or an operation call.
    #[instrument(skip_all)]
    pub fn resolve<I, T>(&self, cli: &Cli, argv: I) -> CliResult<Resolution>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        if let Some(shell) = cli.generate {
            let mut cmd = self.command();
            let mut buf = Vec::new();
            clap_complete::generate(shell, &mut cmd, BIN_NAME, &mut buf);
            let script = String::from_utf8_lossy(&buf).into_owned();
            return Ok(Resolution::Done(Outcome::Completions(script)));
        }
        if cli.version {
            let version = format!("{} {}", BIN_NAME, env!("CARGO_PKG_VERSION"));
            return Ok(Resolution::Done(Outcome::Version(version)));
        }

        let name = match cli.subcommand() {
            Some(name) if !cli.help => name,
            _ => return Ok(self.top_level_help()),
        };
        if name == HELP_COMMAND {
            return self
                .help(cli.subcommand_args().first().map(String::as_str))
                .map(Resolution::Done);
        }

        let mut cmd = self.command();
        let matches = match cmd.try_get_matches_from_mut(argv) {
            Ok(m) => m,
            Err(e) => {
                return match e.kind() {
                    ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                        Ok(Resolution::Done(Outcome::Help(e.render().to_string())))
                    }
                    _ => Err(CliError::Usage(e.render().to_string())),
                };
            }
        };
        let Some((name, sub)) = matches.subcommand() else {
            return Ok(self.top_level_help());
        };
        let op = self
            .registry
            .get(name)
            .ok_or_else(|| CliError::Usage(format!("invalid subcommand: {name}")))?;

        Ok(Resolution::Call(Call {
            operation: op.name(),
            args: parsed_args(op, sub),
            debug: cli.debug.max(sub.get_count("debug")),
            endpoint: sub.get_one::<String>("endpoint").cloned(),
            username: sub.get_one::<String>("username").cloned(),
            password: sub.get_one::<String>("password").cloned(),
        }))
    }

    /// Log in and run `call` against the services in `container`.
    #[instrument(skip_all, fields(operation = call.operation))]
    pub fn invoke(&self, call: &Call, container: &ServiceContainer) -> CliResult<Outcome> {
        let op = self
            .registry
            .get(call.operation)
            .ok_or_else(|| CliError::Usage(format!("invalid subcommand: {}", call.operation)))?;
        let (endpoint, credentials) = credentials(call, &container.settings)?;
        debug!(%endpoint, "dispatching");

        let session = container.session_service().login(&endpoint, &credentials)?;
        let client = container.client(&endpoint, session);
        let rows = op.invoke(&client, &call.args)?;

        Ok(Outcome::Rows {
            header: op
                .header()
                .split(COLUMN_SEPARATOR)
                .map(String::from)
                .collect(),
            rows,
        })
    }

    fn top_level_help(&self) -> Resolution {
        Resolution::Done(Outcome::Help(self.command().render_help().to_string()))
    }

    /// Top-level help, or the help of `topic`.
    fn help(&self, topic: Option<&str>) -> CliResult<Outcome> {
        let mut cmd = self.command();
        let Some(topic) = topic else {
            return Ok(Outcome::Help(cmd.render_help().to_string()));
        };
        cmd.build();
        match cmd.find_subcommand_mut(topic) {
            Some(sub) => Ok(Outcome::Help(sub.render_help().to_string())),
            None => Err(CliError::Usage(format!("invalid subcommand: {topic}"))),
        }
    }
}

/// Endpoint and credentials: command line first, then settings.
fn credentials(call: &Call, settings: &Settings) -> CliResult<(String, Credentials)> {
    let pick = |given: &Option<String>, fallback: &Option<String>| {
        given
            .clone()
            .or_else(|| fallback.clone())
            .filter(|v| !v.is_empty())
    };
    let endpoint = pick(&call.endpoint, &settings.endpoint);
    let username = pick(&call.username, &settings.username);
    let password = pick(&call.password, &settings.password);

    match (endpoint, username, password) {
        (Some(endpoint), Some(username), Some(password)) => {
            Ok((endpoint, Credentials::new(username, password)))
        }
        (endpoint, username, password) => {
            let missing = [
                ("endpoint", endpoint.is_none()),
                ("username", username.is_none()),
                ("password", password.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();
            Err(CliError::MissingCredentials { missing })
        }
    }
}

/// Subcommand exposing exactly the declared parameters of `op`.
fn operation_command(op: &OperationDescriptor) -> Command {
    op.params()
        .iter()
        .fold(Command::new(op.name()).about(op.about()), |cmd, spec| {
            cmd.arg(param_arg(spec))
        })
}

/// Required parameters are positional, optional ones `--long` flags.
fn param_arg(spec: &ParamSpec) -> Arg {
    let parser: ValueParser = match spec.kind {
        ParamKind::Text => ValueParser::string(),
        ParamKind::Integer => value_parser!(i64).into(),
        ParamKind::Boolean => BoolishValueParser::new().into(),
    };
    let mut arg = Arg::new(spec.name)
        .help(spec.help)
        .action(ArgAction::Set)
        .value_parser(parser)
        .required(spec.required);
    if !spec.required {
        arg = arg.long(spec.flag_name());
    }
    if let Some(metavar) = spec.metavar {
        arg = arg.value_name(metavar);
    }
    arg
}

fn parsed_args(op: &OperationDescriptor, matches: &ArgMatches) -> ParsedArgs {
    let mut args = ParsedArgs::new();
    for spec in op.params() {
        let value = match spec.kind {
            ParamKind::Text => matches
                .get_one::<String>(spec.name)
                .cloned()
                .map(ArgValue::Text),
            ParamKind::Integer => matches
                .get_one::<i64>(spec.name)
                .copied()
                .map(ArgValue::Integer),
            ParamKind::Boolean => matches
                .get_one::<bool>(spec.name)
                .copied()
                .map(ArgValue::Boolean),
        };
        if let Some(value) = value {
            args.insert(spec.name, value);
        }
    }
    args
}
