//! Response definitions
//!
//! A decoded backend response keeps every field in wire order and derives two
//! projections from it: the merged map and the per-record sequence.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

/// Reserved key carrying the overall outcome
pub const STATUS_KEY: &str = "status";

/// Reserved key carrying a human-readable error message
pub const ERROR_KEY: &str = "error";

/// Status reported by the backend on success
pub const STATUS_OK: &str = "TRANS_OK";

/// Generic error status
pub const STATUS_ERROR: &str = "TRANS_ERROR";

/// Canonical database error status (also the prefix of raw database failures)
pub const STATUS_DATABASE_ERROR: &str = "TRANS_DATABASE_ERROR";

/// Status the backend reports for a command it does not know
pub const STATUS_NO_SUCH_COMMAND: &str = "TRANS_ERROR_NO_SUCH_COMMAND:Err no such command";

/// One row of a possibly multi-row response
pub type Record = BTreeMap<String, String>;

/// Which projection to present to a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// Single merged mapping, last occurrence wins
    #[default]
    Map,

    /// One mapping per record
    Slice,
}

impl std::str::FromStr for ResponseFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "map" => Ok(ResponseFormat::Map),
            "slice" => Ok(ResponseFormat::Slice),
            other => Err(format!("unknown response format {:?}", other)),
        }
    }
}

/// A decoded backend response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// Every `(key, value)` pair in wire order, reserved keys included
    fields: Vec<(String, String)>,

    status: String,
    error: Option<String>,
}

impl Response {
    /// Create an empty response with the given status
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            ..Self::default()
        }
    }

    /// Create an empty `TRANS_OK` response
    pub fn ok() -> Self {
        Self::with_status(STATUS_OK)
    }

    /// Append a field, promoting `status` and `error` as they are seen
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match key.as_str() {
            STATUS_KEY => self.status = value.clone(),
            ERROR_KEY => self.error = Some(value.clone()),
            _ => {}
        }
        self.fields.push((key, value));
    }

    /// Builder-style [`Response::push`]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    /// Status string, empty when the backend sent none
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Error message, if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
    }

    /// True when the status is `TRANS_OK`
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Raw fields in wire order
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Fields other than the reserved `status` and `error`, in wire order
    pub fn data_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .filter(|(key, _)| key != STATUS_KEY && key != ERROR_KEY)
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Last value seen for a data field
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data_fields()
            .filter(|(k, _)| *k == key)
            .last()
            .map(|(_, value)| value)
    }

    /// Merged projection: later occurrences of a key overwrite earlier ones
    pub fn map(&self) -> Record {
        self.data_fields()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    /// Record projection: the n-th occurrence of each key belongs to record n
    pub fn records(&self) -> Vec<Record> {
        let mut records: Vec<Record> = Vec::new();
        let mut seen: BTreeMap<&str, usize> = BTreeMap::new();

        for (key, value) in self.data_fields() {
            let rank = seen.entry(key).or_insert(0);
            if *rank == records.len() {
                records.push(Record::new());
            }
            records[*rank].insert(key.to_string(), value.to_string());
            *rank += 1;
        }

        records
    }

    /// Borrowing view suitable for JSON rendering
    pub fn view(&self, format: ResponseFormat) -> ResponseView<'_> {
        let body = match format {
            ResponseFormat::Map => Body::Map(self.map()),
            ResponseFormat::Slice => Body::Slice(self.records()),
        };
        ResponseView {
            status: &self.status,
            error: self.error.as_deref(),
            response: body,
        }
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.view(ResponseFormat::Map).serialize(serializer)
    }
}

/// Rendered shape `{status, error?, response}`
#[derive(Debug, Serialize)]
pub struct ResponseView<'a> {
    pub status: &'a str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,

    pub response: Body,
}

/// Either projection of a response body
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Body {
    Map(Record),
    Slice(Vec<Record>),
}
