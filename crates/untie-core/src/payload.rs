use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, UntieError};

/// The unit of work crossing a call boundary.
///
/// Wire form: `{"identity": "<key>", "args": [..]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallPayload {
    /// Key of the registered function to invoke.
    pub identity: String,
    /// Positional arguments.
    pub args: Vec<Value>,
}

impl CallPayload {
    /// Create a payload.
    pub fn new(identity: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            identity: identity.into(),
            args,
        }
    }
}

/// Describes an implementation failure as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub message: String,
}

/// Outcome of a call, tagged so it can cross a transport as a value.
///
/// Wire form: `{"ok": <value>}` or `{"error": {"message": "<text>"}}`. The tag keeps a
/// returned object that happens to hold an `error` key from being read as a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallResult {
    Ok(Value),
    Error(ErrorDescriptor),
}

impl CallResult {
    /// Success result.
    pub fn ok(value: Value) -> Self {
        Self::Ok(value)
    }

    /// Failure result carrying `message`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorDescriptor {
            message: message.into(),
        })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Unwrap into the returned value, reconstituting a failure as [`UntieError::Call`].
    pub fn into_result(self) -> Result<Value> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Error(descriptor) => Err(UntieError::Call(descriptor.message)),
        }
    }
}
