//! Call routing core for untied functions.
//!
//! A function registered on an [`Untie`] instance is called through the returned
//! [`Untied`] handle. Depending on the instance's mode the call either runs the
//! implementation in-process or is serialized into a [`CallPayload`] and handed to a
//! [`Transporter`], which delivers it to a peer's ingest gate.
//!
//! - [`guard`]: structural JSON-safety check run before any call leaves the process
//! - [`Registry`]: identity-keyed implementations
//! - [`Untie::invoke`]: the local/remote routing decision
//! - [`Untie::ingest`]: credential gate for inbound remote calls

pub mod config;
pub mod credential;
pub mod error;
pub mod guard;
pub mod handler;
pub mod identity;
pub mod instance;
pub mod payload;
pub mod registry;
pub mod transporter;
pub mod untied;

pub use config::{Mode, UntieConfig};
pub use error::{Result, UntieError};
pub use handler::{Handler, IntoArgs};
pub use identity::RegisterOptions;
pub use instance::Untie;
pub use payload::{CallPayload, CallResult, ErrorDescriptor};
pub use registry::Registry;
pub use transporter::{LoopbackTransporter, Transporter};
pub use untied::Untied;

// Re-exported for implementors of `Transporter`.
pub use async_trait::async_trait;
