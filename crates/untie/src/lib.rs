//! Register a function once, call it in-process or on a remote peer.
//!
//! The routing core is re-exported at the crate root. With the `peer` feature
//! (on by default) the Unix socket transport is available as well.
//!
//! # Crate Structure
//!
//! - crate root: [`Untie`], [`Untied`], [`Transporter`] and friends from `untie-core`
//! - [`transport`]: Unix domain socket listener and connector
//! - [`frame`]: length-prefixed frames and the tokio codec
//! - [`peer`]: [`peer::SocketTransporter`] and [`peer::IngestListener`]

pub use untie_core::*;

/// Re-export transport types (requires `peer` feature).
#[cfg(feature = "peer")]
pub mod transport {
    pub use untie_transport::*;
}

/// Re-export frame types (requires `peer` feature).
#[cfg(feature = "peer")]
pub mod frame {
    pub use untie_frame::*;
}

/// Re-export peer types (requires `peer` feature).
#[cfg(feature = "peer")]
pub mod peer {
    pub use untie_peer::*;
}
