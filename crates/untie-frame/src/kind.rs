//! Frame kinds.
//!
//! A connection carries exactly one exchange: `HELLO` both ways, then one
//! `CALL` from the initiator answered by one `RESULT` or `REJECT`.

/// Handshake message, sent by both sides.
pub const HELLO: u16 = 0;

/// Call payload JSON, initiator to receiver.
pub const CALL: u16 = 1;

/// Tagged call result JSON, receiver to initiator.
pub const RESULT: u16 = 2;

/// Rejection JSON; the call never produced a result.
pub const REJECT: u16 = 3;

/// Returns a human-readable name for a frame kind.
pub fn kind_name(kind: u16) -> &'static str {
    match kind {
        HELLO => "HELLO",
        CALL => "CALL",
        RESULT => "RESULT",
        REJECT => "REJECT",
        _ => "UNKNOWN",
    }
}
