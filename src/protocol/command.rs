//! Command definitions
//!
//! Represents commands forwarded to the backend.

use std::fmt;

use crate::error::{GatewayError, Result};

/// A parameter value before it is rendered to its wire form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
}

impl ParamValue {
    /// The value as it appears on the wire
    pub fn to_wire(&self) -> String {
        match self {
            ParamValue::Str(s) => s.clone(),
            ParamValue::Int(n) => n.to_string(),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(s) => f.write_str(s),
            ParamValue::Int(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(n) => ParamValue::Int(n),
            Err(_) => ParamValue::Str(value.to_string()),
        }
    }
}

impl From<usize> for ParamValue {
    fn from(value: usize) -> Self {
        ParamValue::from(value as u64)
    }
}

/// One `key:value` argument of a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub key: String,
    pub value: ParamValue,

    /// Frame the value with an explicit byte length
    pub is_blob: bool,
}

impl Parameter {
    /// A plain parameter (still blob-framed on the wire if the value holds a newline)
    pub fn new(key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            is_blob: false,
        }
    }

    /// A parameter always framed as a blob
    pub fn blob(key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            is_blob: true,
        }
    }
}

/// A command and its ordered parameters
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Command {
    pub name: String,
    pub params: Vec<Parameter>,
}

impl Command {
    /// Create a command with no parameters
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    /// Append a plain parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.push(Parameter::new(key, value));
        self
    }

    /// Append a blob parameter
    pub fn blob(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.push(Parameter::blob(key, value));
        self
    }

    /// Append an already-built parameter
    pub fn with_param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    /// Reject names and keys that would break the line framing
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(GatewayError::BadInput("command name is empty".to_string()));
        }
        if self.name.contains(':') || self.name.contains('\n') {
            return Err(GatewayError::BadInput(format!(
                "command name {:?} contains a separator",
                self.name
            )));
        }
        for param in &self.params {
            if param.key.is_empty() || param.key.contains(':') || param.key.contains('\n') {
                return Err(GatewayError::BadInput(format!(
                    "parameter key {:?} is empty or contains a separator",
                    param.key
                )));
            }
        }
        Ok(())
    }
}
