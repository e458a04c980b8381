//! Socket transport for untie: the initiator-side [`SocketTransporter`] and the
//! receiver-side [`IngestListener`].
//!
//! Each call uses its own connection: a `HELLO` exchange carrying the shared
//! secret, one `CALL`, and one `RESULT` or `REJECT`.

pub mod connector;
pub mod error;
pub mod handshake;
pub mod listener;
pub mod rejection;

pub use connector::{SocketTransporter, SocketTransporterConfig};
pub use error::{PeerError, Result};
pub use handshake::{
    handshake_client, handshake_server, Connection, HandshakeConfig, HandshakeResult, Hello,
    HelloAck, MAX_CREDENTIAL_LEN,
};
pub use listener::IngestListener;
pub use rejection::{Rejection, RejectionKind};
