//! Serialization guard.
//!
//! Arguments are checked structurally against the shapes JSON can carry.
//! Nothing is encoded to find out; a rejected argument list is never partially sent.

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, UntieError};

/// Deepest container nesting a payload may reach. The receiving decoder gives up at
/// 128 levels, so anything deeper would encode here and fail to decode on the peer.
pub const MAX_DEPTH: usize = 127;

/// Containers added by the payload envelope: the payload object and its `args` array.
const ENVELOPE_DEPTH: usize = 2;

/// Returns true if every argument can round-trip through JSON.
pub fn is_safe(args: &[Value]) -> bool {
    args.iter().all(|value| fits(value, ENVELOPE_DEPTH))
}

/// Fails with [`UntieError::Serialization`] when [`is_safe`] does not hold.
pub fn check(args: &[Value]) -> Result<()> {
    if is_safe(args) {
        Ok(())
    } else {
        Err(UntieError::Serialization)
    }
}

/// Convert a typed argument into a JSON value.
///
/// Values without a JSON form (integers beyond 64 bits, maps keyed by non-strings)
/// are reported as [`UntieError::Serialization`].
pub fn to_arg<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|err| {
        tracing::debug!(error = %err, "argument has no JSON representation");
        UntieError::Serialization
    })
}

// `depth` counts the containers enclosing `value`.
fn fits(value: &Value, depth: usize) -> bool {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => true,
        Value::Number(number) => number.as_f64().is_some_and(f64::is_finite),
        Value::Array(items) => {
            depth < MAX_DEPTH && items.iter().all(|item| fits(item, depth + 1))
        }
        Value::Object(map) => depth < MAX_DEPTH && map.values().all(|item| fits(item, depth + 1)),
    }
}
