use std::fmt;

use serde::{Deserialize, Serialize};
use untie_core::UntieError;

/// Why a receiver refused a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    /// The handshake credential did not match the receiver's secret.
    Authentication,
    /// The arguments failed the receiver's serialization guard.
    Serialization,
    /// Nothing is registered under the identity.
    NotFound,
    /// The `CALL` payload could not be parsed.
    BadRequest,
    Internal,
}

impl RejectionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectionKind::Authentication => "authentication",
            RejectionKind::Serialization => "serialization",
            RejectionKind::NotFound => "not_found",
            RejectionKind::BadRequest => "bad_request",
            RejectionKind::Internal => "internal",
        }
    }
}

/// `REJECT` frame payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub kind: RejectionKind,
    pub message: String,
}

impl Rejection {
    pub fn new(kind: RejectionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Describe an ingest failure for the initiator.
    pub fn from_error(err: &UntieError) -> Self {
        let kind = match err {
            UntieError::Authentication => RejectionKind::Authentication,
            UntieError::Serialization => RejectionKind::Serialization,
            UntieError::FunctionNotFound(_) => RejectionKind::NotFound,
            UntieError::Decode(_) => RejectionKind::BadRequest,
            _ => RejectionKind::Internal,
        };
        Self::new(kind, err.to_string())
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind.as_str())
    }
}
