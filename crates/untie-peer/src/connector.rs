use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_util::codec::Framed;
use tracing::debug;
use untie_core::{CallPayload, CallResult, Transporter, Untie};
use untie_frame::{Frame, FrameConfig, FrameError, UntieCodec, CALL, REJECT, RESULT};

use crate::error::{PeerError, Result};
use crate::handshake::{handshake_client, HandshakeConfig};
use crate::rejection::Rejection;

/// Settings for [`SocketTransporter`].
#[derive(Debug, Clone, Default)]
pub struct SocketTransporterConfig {
    pub handshake: HandshakeConfig,
    /// Limits applied once the handshake is done.
    pub frame: FrameConfig,
    /// Upper bound on waiting for the receiver's answer. `None` waits indefinitely.
    pub call_timeout: Option<Duration>,
}

/// [`Transporter`] that delivers each call over a fresh Unix socket connection.
///
/// One connection per call: connect, handshake with the origin's secret, one
/// `CALL`, one `RESULT` or `REJECT`, close. No pooling and no retries.
///
/// The secret travels in the handshake, so it must fit in
/// [`MAX_CREDENTIAL_LEN`](crate::MAX_CREDENTIAL_LEN) bytes; longer secrets
/// fail every call with [`PeerError::HandshakeFailed`].
#[derive(Debug, Clone)]
pub struct SocketTransporter {
    path: PathBuf,
    config: SocketTransporterConfig,
}

impl SocketTransporter {
    /// Deliver calls to the ingest listener bound at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            config: SocketTransporterConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SocketTransporterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.config.call_timeout = Some(timeout);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Perform one call exchange, presenting `credential` in the handshake.
    ///
    /// A `REJECT` answer comes back as [`PeerError::Rejected`].
    pub async fn call(&self, credential: &str, payload: &CallPayload) -> Result<CallResult> {
        let stream = untie_transport::connect(&self.path).await?;
        let mut conn = Framed::new(
            stream,
            UntieCodec::with_config(FrameConfig {
                max_payload_size: self.config.handshake.max_handshake_payload,
            }),
        );

        let handshake = handshake_client(&mut conn, credential, &self.config.handshake).await?;
        // Handshake runs under a tighter pre-auth payload budget.
        conn.codec_mut()
            .set_max_payload_size(self.config.frame.max_payload_size);

        debug!(
            session_id = %handshake.session_id,
            identity = %payload.identity,
            "sending call"
        );
        conn.send(Frame::new(CALL, serde_json::to_vec(payload)?))
            .await?;

        let next = match self.config.call_timeout {
            Some(timeout) => tokio::time::timeout(timeout, conn.next())
                .await
                .map_err(|_| PeerError::Timeout(timeout))?,
            None => conn.next().await,
        };

        let frame = match next {
            Some(Ok(frame)) => frame,
            None | Some(Err(FrameError::ConnectionClosed)) => {
                return Err(PeerError::Disconnected(
                    "connection closed before a result arrived".to_string(),
                ));
            }
            Some(Err(err)) => return Err(PeerError::Frame(err)),
        };

        match frame.kind {
            RESULT => Ok(serde_json::from_slice(&frame.payload)?),
            REJECT => {
                let rejection: Rejection = serde_json::from_slice(&frame.payload)?;
                debug!(session_id = %handshake.session_id, %rejection, "call rejected");
                Err(PeerError::Rejected(rejection))
            }
            other => Err(PeerError::UnexpectedFrame(other)),
        }
    }
}

#[async_trait]
impl Transporter for SocketTransporter {
    async fn send(&self, origin: &Untie, payload: CallPayload) -> untie_core::Result<CallResult> {
        let credential = origin.secret().unwrap_or_default();
        Ok(self.call(credential, &payload).await?)
    }
}
