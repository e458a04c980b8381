use async_trait::async_trait;

use crate::error::Result;
use crate::instance::Untie;
use crate::payload::{CallPayload, CallResult};

/// Delivers a call payload to a remote ingest gate and returns what comes back.
///
/// Implementations authenticate with `origin.secret()`. Their own failures are
/// reported through [`UntieError::Transport`](crate::UntieError::Transport) and reach
/// the caller untranslated. Timeouts, if any, are the implementation's business.
#[async_trait]
pub trait Transporter: Send + Sync + 'static {
    async fn send(&self, origin: &Untie, payload: CallPayload) -> Result<CallResult>;
}

/// In-process transporter that hands payloads straight to another instance's ingest gate.
#[derive(Debug, Clone)]
pub struct LoopbackTransporter {
    target: Untie,
}

impl LoopbackTransporter {
    /// Deliver to `target`.
    pub fn new(target: Untie) -> Self {
        Self { target }
    }
}

#[async_trait]
impl Transporter for LoopbackTransporter {
    async fn send(&self, origin: &Untie, payload: CallPayload) -> Result<CallResult> {
        let credential = origin.secret().unwrap_or_default();
        self.target.ingest(credential, payload).await
    }
}
