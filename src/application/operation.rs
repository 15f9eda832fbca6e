//! Operation descriptors and the command registry
//!
//! Every command the client offers is declared once as an [`OperationDescriptor`]:
//! its name, help text, ordered parameters, response header and the pure mapping
//! from parsed arguments to a protocol [`Request`]. The command line surface is
//! derived from the [`Registry`] alone.

use std::collections::BTreeMap;
use std::fmt;

use crate::application::services::CloudlandClient;
use crate::application::ApplicationResult;
use crate::domain::{DomainError, Request, Row};

/// Name reserved for the built-in help command.
pub const HELP_COMMAND: &str = "help";

/// Value type of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Text,
    Integer,
    /// Accepts true/false, yes/no, on/off, 1/0.
    Boolean,
}

/// One declared parameter.
///
/// Required parameters are positional, optional ones are `--long` flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub metavar: Option<&'static str>,
    pub help: &'static str,
}

impl ParamSpec {
    /// Required text parameter.
    pub fn positional(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Text,
            required: true,
            metavar: None,
            help,
        }
    }

    /// Optional text parameter.
    pub fn option(name: &'static str, help: &'static str) -> Self {
        Self {
            required: false,
            ..Self::positional(name, help)
        }
    }

    pub fn integer(mut self) -> Self {
        self.kind = ParamKind::Integer;
        self
    }

    pub fn boolean(mut self) -> Self {
        self.kind = ParamKind::Boolean;
        self
    }

    pub fn metavar(mut self, metavar: &'static str) -> Self {
        self.metavar = Some(metavar);
        self
    }

    /// Long flag name: `use_dhcp` becomes `use-dhcp`.
    pub fn flag_name(&self) -> String {
        self.name.replace('_', "-")
    }
}

/// A parsed, typed argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
}

impl fmt::Display for ArgValue {
    /// Wire form: integers in decimal, booleans as `true`/`false`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Text(s) => f.write_str(s),
            ArgValue::Integer(n) => write!(f, "{n}"),
            ArgValue::Boolean(b) => write!(f, "{b}"),
        }
    }
}

/// Arguments of one invocation, keyed by parameter name. Unset optionals are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArgs(BTreeMap<&'static str, ArgValue>);

impl ParsedArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, value: ArgValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &'static str, value: ArgValue) {
        self.0.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.0.get(name)
    }

    /// Wire form of an optional argument.
    pub fn value(&self, name: &str) -> Option<String> {
        self.get(name).map(ArgValue::to_string)
    }

    /// Wire form of a required argument.
    pub fn require(&self, name: &str) -> Result<String, DomainError> {
        self.value(name)
            .ok_or_else(|| DomainError::MissingArgument(name.to_string()))
    }
}

/// How the response body of an operation is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Standard row envelope with status sentinel.
    Rows,
    /// Single JSON object rendered as key/value rows; falls back to `Rows`.
    Record,
}

/// Maps parsed arguments to the protocol request.
pub type RequestBuilder = fn(&ParsedArgs) -> Result<Request, DomainError>;

/// Declarative description of one command.
#[derive(Clone)]
pub struct OperationDescriptor {
    name: &'static str,
    about: &'static str,
    header: &'static str,
    params: Vec<ParamSpec>,
    shape: ResponseShape,
    build: RequestBuilder,
}

impl OperationDescriptor {
    /// Declare an operation; add parameters with [`param`](Self::param).
    pub fn new(
        name: &'static str,
        about: &'static str,
        header: &'static str,
        build: RequestBuilder,
    ) -> Self {
        Self {
            name,
            about,
            header,
            params: Vec::new(),
            shape: ResponseShape::Rows,
            build,
        }
    }

    /// Append a parameter in declaration order.
    ///
    /// Required parameters stay ahead of optional ones; within each group the
    /// declaration order is kept.
    pub fn param(mut self, spec: ParamSpec) -> Self {
        if spec.required {
            let at = self.params.iter().take_while(|p| p.required).count();
            self.params.insert(at, spec);
        } else {
            self.params.push(spec);
        }
        self
    }

    /// Decode the response as a single record.
    pub fn record(mut self) -> Self {
        self.shape = ResponseShape::Record;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn about(&self) -> &'static str {
        self.about
    }

    /// Pipe-delimited column header for rendering.
    pub fn header(&self) -> &'static str {
        self.header
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn shape(&self) -> ResponseShape {
        self.shape
    }

    /// Protocol request for `args`, without sending it.
    pub fn request(&self, args: &ParsedArgs) -> Result<Request, DomainError> {
        (self.build)(args)
    }

    /// Send the request through `client` and decode the rows.
    pub fn invoke(
        &self,
        client: &CloudlandClient,
        args: &ParsedArgs,
    ) -> ApplicationResult<Vec<Row>> {
        let request = self.request(args)?;
        match self.shape {
            ResponseShape::Rows => client.call(&request),
            ResponseShape::Record => client.call_record(&request),
        }
    }
}

impl fmt::Debug for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("shape", &self.shape)
            .finish()
    }
}

/// Immutable set of operations, keyed and listed by name.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    operations: BTreeMap<&'static str, OperationDescriptor>,
}

impl Registry {
    /// Register all `operations`.
    ///
    /// # Errors
    /// [`DomainError::DuplicateOperation`] if a name occurs twice or collides with
    /// the built-in `help` command.
    pub fn new(
        operations: impl IntoIterator<Item = OperationDescriptor>,
    ) -> Result<Self, DomainError> {
        let mut registered = BTreeMap::new();
        for op in operations {
            if op.name == HELP_COMMAND || registered.contains_key(op.name) {
                return Err(DomainError::DuplicateOperation(op.name.to_string()));
            }
            registered.insert(op.name, op);
        }
        Ok(Self {
            operations: registered,
        })
    }

    pub fn get(&self, name: &str) -> Option<&OperationDescriptor> {
        self.operations.get(name)
    }

    /// Operations in name order.
    pub fn iter(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.operations.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.operations.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
