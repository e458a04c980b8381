use crate::rejection::Rejection;

/// Errors that can occur in peer operations.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error("transport error: {0}")]
    Transport(#[from] untie_transport::TransportError),

    #[error("frame error: {0}")]
    Frame(#[from] untie_frame::FrameError),

    /// Handshake failed.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// Peer disconnected.
    #[error("peer disconnected: {0}")]
    Disconnected(String),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The receiver refused the call before producing a result.
    #[error("call rejected by peer: {0}")]
    Rejected(Rejection),

    /// A frame of a kind that is not valid at this point of the exchange.
    #[error("unexpected {} frame", untie_frame::kind_name(*.0))]
    UnexpectedFrame(u16),
}

impl From<PeerError> for untie_core::UntieError {
    fn from(err: PeerError) -> Self {
        untie_core::UntieError::transport(err)
    }
}

pub type Result<T> = std::result::Result<T, PeerError>;
