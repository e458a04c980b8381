//! Local socket transport for untie peers.
//!
//! This is the lowest layer: it binds, accepts and connects Unix domain sockets
//! and hands out connected [`tokio::net::UnixStream`]s. Framing and the call
//! protocol live in `untie-frame` and `untie-peer`.

pub mod error;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};

#[cfg(unix)]
pub use uds::{connect, PeerCredentials, UnixSocketListener};
