//! Length-prefixed framing for untie peers.
//!
//! Every message is framed with:
//! - A 2-byte magic number ("UT") for stream synchronization
//! - A 4-byte little-endian payload length
//! - A 2-byte little-endian frame kind
//!
//! [`UntieCodec`] plugs the format into `tokio_util::codec::Framed`.

pub mod codec;
pub mod error;
pub mod kind;

pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, UntieCodec, DEFAULT_MAX_PAYLOAD, HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use kind::{kind_name, CALL, HELLO, REJECT, RESULT};
