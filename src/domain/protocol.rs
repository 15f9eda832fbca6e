//! Wire codec for the Cloudland control panel protocol
//!
//! Requests are flat form field sets: read requests carry `action=<name>` as query
//! parameters, mutate requests carry `exec=<name>` as form body fields.
//!
//! Responses are a single JSON array of strings. The last element is the decimal
//! status sentinel (0 = success); the preceding elements are either pipe-delimited
//! data rows or, on failure, the error message.

use serde_json::Value;

use crate::domain::DomainError;

/// Field carrying the operation name of a read request.
pub const READ_FIELD: &str = "action";
/// Field carrying the operation name of a mutate request.
pub const MUTATE_FIELD: &str = "exec";
/// Separator between the columns of a data row.
pub const COLUMN_SEPARATOR: char = '|';
/// Text the service answers with when the presented session is not logged in.
pub const NOT_AUTHENTICATED_MARKER: &str = "not authenticated";

/// Whether `body` carries the not-authenticated marker (case-insensitive).
pub fn is_not_authenticated(body: &str) -> bool {
    body.to_ascii_lowercase().contains(NOT_AUTHENTICATED_MARKER)
}

/// Request kind: idempotent listing or state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// Sent as HTTP GET query parameters.
    Read,
    /// Sent as HTTP POST form body.
    Mutate,
}

impl Verb {
    /// Field name carrying the operation name for this verb.
    pub fn operation_field(self) -> &'static str {
        match self {
            Verb::Read => READ_FIELD,
            Verb::Mutate => MUTATE_FIELD,
        }
    }
}

/// Insertion-ordered field set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap(Vec<(String, String)>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`, replacing an earlier value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pairs in insertion order, as accepted by form/query serializers.
    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.0
    }
}

impl std::fmt::Display for FieldMap {
    /// Renders `k=v` pairs for logging, with the login digest masked.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self
            .iter()
            .map(|(k, v)| match k {
                "sha1" => format!("{k}=***"),
                _ => format!("{k}={v}"),
            })
            .collect();
        write!(f, "{{{}}}", rendered.join(", "))
    }
}

/// Merge the operation-name field with the argument fields.
///
/// `None` arguments are omitted rather than sent empty: the service treats an
/// absent optional field differently from an empty one.
pub fn encode_request<'a, I>(verb: Verb, operation: &str, args: I) -> FieldMap
where
    I: IntoIterator<Item = (&'a str, Option<String>)>,
{
    let mut fields = FieldMap::new();
    fields.insert(verb.operation_field(), operation);
    for (name, value) in args {
        if let Some(value) = value {
            fields.insert(name, value);
        }
    }
    fields
}

/// One protocol request: a verb and its encoded fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    verb: Verb,
    operation: String,
    fields: FieldMap,
}

impl Request {
    /// Read request (`action=<operation>`).
    pub fn read(operation: impl Into<String>) -> Self {
        Self::new(Verb::Read, operation.into())
    }

    /// Mutate request (`exec=<operation>`).
    pub fn mutate(operation: impl Into<String>) -> Self {
        Self::new(Verb::Mutate, operation.into())
    }

    fn new(verb: Verb, operation: String) -> Self {
        let fields = encode_request(verb, &operation, Vec::<(&str, Option<String>)>::new());
        Self {
            verb,
            operation,
            fields,
        }
    }

    /// Add a field that is always sent.
    pub fn field(mut self, name: &str, value: impl ToString) -> Self {
        self.fields.insert(name, value.to_string());
        self
    }

    /// Add a field that is sent only when set.
    pub fn optional<T: ToString>(self, name: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.field(name, value),
            None => self,
        }
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }
}

/// One data row: opaque pipe-delimited text whose columns are defined by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row(String);

impl Row {
    pub fn new(line: impl Into<String>) -> Self {
        Self(line.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Columns of this row.
    pub fn columns(&self) -> Vec<&str> {
        self.0.split(COLUMN_SEPARATOR).collect()
    }
}

impl From<&str> for Row {
    fn from(line: &str) -> Self {
        Self::new(line)
    }
}

/// Decoded response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub rows: Vec<String>,
    pub status: i64,
}

impl Response {
    pub fn is_success(&self) -> bool {
        self.status == 0
    }

    /// Convert a non-zero status into [`DomainError::Rejected`].
    ///
    /// The rows of a failed response are the error message, never data.
    pub fn into_rows(self) -> Result<Vec<Row>, DomainError> {
        if self.is_success() {
            return Ok(self.rows.into_iter().map(Row::new).collect());
        }
        let message = if self.rows.is_empty() {
            format!("request failed with status {}", self.status)
        } else {
            self.rows.join("\n")
        };
        Err(DomainError::Rejected {
            status: self.status,
            message,
        })
    }
}

/// Split a raw body into data rows and status sentinel.
///
/// # Errors
/// [`DomainError::Decode`] if the body is not a JSON array of strings, is empty,
/// or its last element is not a decimal integer.
pub fn decode_response(body: &str) -> Result<Response, DomainError> {
    let mut elements: Vec<String> = serde_json::from_str(body.trim())
        .map_err(|e| DomainError::decode(format!("not a JSON array of strings: {e}"), body))?;

    let sentinel = elements
        .pop()
        .ok_or_else(|| DomainError::decode("missing status element", body))?;
    let status = sentinel
        .trim()
        .parse::<i64>()
        .map_err(|_| DomainError::decode(format!("invalid status element {sentinel:?}"), body))?;

    elements.retain(|e| !e.is_empty());
    Ok(Response {
        rows: elements,
        status,
    })
}

/// Decode and reject non-zero status in one step.
pub fn decode_or_raise(body: &str) -> Result<Vec<Row>, DomainError> {
    decode_response(body)?.into_rows()
}

/// Decode a single-record body.
///
/// Some queries answer with a JSON object instead of the row envelope; its entries
/// become `KEY|VALUE` rows. Anything else is decoded as a regular envelope.
pub fn decode_record(body: &str) -> Result<Vec<Row>, DomainError> {
    match serde_json::from_str::<Value>(body.trim()) {
        Ok(Value::Object(entries)) => Ok(entries
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s.trim().to_string(),
                    other => other.to_string(),
                };
                Row::new(format!(
                    "{}{}{}",
                    key.to_uppercase(),
                    COLUMN_SEPARATOR,
                    value
                ))
            })
            .collect()),
        _ => decode_or_raise(body),
    }
}
