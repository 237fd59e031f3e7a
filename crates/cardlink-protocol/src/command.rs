//! The decoded command: a name plus a key/value field map.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::ProtocolError;

/// One decoded unit of protocol meaning.
///
/// A `Command` is what [`decode`](crate::decode) produces from a line like
/// `CAST_FLIP_RESULT roomId=r1 index=3 card=7`. Field keys are unique; when
/// a line repeats a key, the later value wins.
///
/// Fields are kept in a `BTreeMap` so that [`Display`](fmt::Display)
/// output is deterministic (sorted by key), which keeps logs and tests
/// stable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Command {
    name: String,
    fields: BTreeMap<String, String>,
}

impl Command {
    /// Creates a command with no fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field insertion. A repeated key overwrites.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub(crate) fn from_parts(name: String, fields: BTreeMap<String, String>) -> Self {
        Self { name, fields }
    }

    /// The command name (the first token of the line).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All fields, sorted by key.
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Returns the raw value of a field, if present.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Returns `true` if the command carries no fields at all.
    pub fn is_bare(&self) -> bool {
        self.fields.is_empty()
    }

    /// Splits the command into its name and field map.
    pub fn into_parts(self) -> (String, BTreeMap<String, String>) {
        (self.name, self.fields)
    }

    // -- Typed accessors used by the inbound parsers --

    /// Returns a field that must be present.
    pub fn require(&self, key: &'static str) -> Result<&str, ProtocolError> {
        self.field(key).ok_or_else(|| ProtocolError::MissingField {
            command: self.name.clone(),
            field: key,
        })
    }

    /// Returns a field that must be present and parse as `T`.
    pub fn require_parsed<T: FromStr>(&self, key: &'static str) -> Result<T, ProtocolError> {
        let raw = self.require(key)?;
        raw.parse().map_err(|_| self.invalid(key, raw))
    }

    /// Parses an optional field. Absent → `Ok(None)`, present but
    /// unparseable → `Err`.
    pub fn optional_parsed<T: FromStr>(
        &self,
        key: &'static str,
    ) -> Result<Option<T>, ProtocolError> {
        match self.field(key) {
            None => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| self.invalid(key, raw)),
        }
    }

    pub(crate) fn invalid(&self, key: &'static str, raw: &str) -> ProtocolError {
        ProtocolError::InvalidField {
            command: self.name.clone(),
            field: key,
            value: raw.to_string(),
        }
    }
}

/// Prints the command in wire format (without the trailing newline).
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (k, v) in &self.fields {
            write!(f, " {k}={v}")?;
        }
        Ok(())
    }
}
