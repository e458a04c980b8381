use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::net::UnixStream;
use tokio::task::JoinSet;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};
use untie_core::{CallPayload, Untie};
use untie_frame::{Frame, FrameConfig, FrameError, UntieCodec, CALL, REJECT, RESULT};
use untie_transport::UnixSocketListener;

use crate::error::{PeerError, Result};
use crate::handshake::{handshake_server, HandshakeConfig};
use crate::rejection::{Rejection, RejectionKind};

/// Accepts socket connections and passes their calls through an instance's ingest gate.
pub struct IngestListener {
    socket: UnixSocketListener,
    handler: ConnectionHandler,
    next_session_id: AtomicU64,
}

#[derive(Clone)]
struct ConnectionHandler {
    untie: Untie,
    handshake_config: HandshakeConfig,
    frame_config: FrameConfig,
}

impl IngestListener {
    /// Bind to a Unix domain socket path, serving calls on `untie`.
    pub fn bind(path: impl AsRef<Path>, untie: Untie) -> Result<Self> {
        let socket = UnixSocketListener::bind(path)?;
        info!(path = ?socket.path(), mode = %untie.mode(), "ingest listener bound");
        Ok(Self {
            socket,
            handler: ConnectionHandler {
                untie,
                handshake_config: HandshakeConfig::default(),
                frame_config: FrameConfig::default(),
            },
            next_session_id: AtomicU64::new(1),
        })
    }

    pub fn with_handshake_config(mut self, config: HandshakeConfig) -> Self {
        self.handler.handshake_config = config;
        self
    }

    /// Override the post-handshake frame limits.
    pub fn with_frame_config(mut self, config: FrameConfig) -> Self {
        self.handler.frame_config = config;
        self
    }

    /// Bound socket path.
    pub fn path(&self) -> &Path {
        self.socket.path()
    }

    /// Accept one connection and serve it to completion.
    pub async fn serve_one(&self) -> Result<()> {
        let (stream, credentials) = self.socket.accept().await?;
        let session_id = self.session_id();
        debug!(%session_id, ?credentials, "connection accepted");
        self.handler.handle(stream, &session_id).await
    }

    /// Accept connections until `shutdown` resolves, one task per connection.
    ///
    /// Per-connection failures are logged and do not stop the loop. Connections
    /// in flight when `shutdown` fires are allowed to finish.
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.socket.accept() => match accepted {
                    Ok((stream, credentials)) => {
                        let session_id = self.session_id();
                        debug!(%session_id, ?credentials, "connection accepted");
                        let handler = self.handler.clone();
                        connections.spawn(async move {
                            if let Err(err) = handler.handle(stream, &session_id).await {
                                warn!(%session_id, error = %err, "connection failed");
                            }
                        });
                    }
                    Err(err) => warn!(error = %err, "accept failed"),
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        info!(path = ?self.socket.path(), in_flight = connections.len(), "ingest listener stopping");
        while connections.join_next().await.is_some() {}
        Ok(())
    }

    fn session_id(&self) -> String {
        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        format!("session-{id}")
    }
}

impl std::fmt::Debug for IngestListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestListener")
            .field("path", &self.socket.path())
            .field("mode", &self.handler.untie.mode())
            .finish()
    }
}

impl ConnectionHandler {
    async fn handle(&self, stream: UnixStream, session_id: &str) -> Result<()> {
        let mut conn = Framed::new(
            stream,
            UntieCodec::with_config(FrameConfig {
                max_payload_size: self.handshake_config.max_handshake_payload,
            }),
        );

        let handshake = handshake_server(&mut conn, session_id, &self.handshake_config).await?;
        conn.codec_mut()
            .set_max_payload_size(self.frame_config.max_payload_size);
        let credential = handshake.credential.unwrap_or_default();

        let timeout = self.handshake_config.timeout;
        let next = tokio::time::timeout(timeout, conn.next())
            .await
            .map_err(|_| PeerError::Timeout(timeout))?;
        let frame = match next {
            Some(Ok(frame)) => frame,
            None | Some(Err(FrameError::ConnectionClosed)) => {
                return Err(PeerError::Disconnected(
                    "connection closed before a call arrived".to_string(),
                ));
            }
            Some(Err(err)) => return Err(PeerError::Frame(err)),
        };
        if frame.kind != CALL {
            return Err(PeerError::UnexpectedFrame(frame.kind));
        }

        let payload: CallPayload = match serde_json::from_slice(&frame.payload) {
            Ok(payload) => payload,
            Err(err) => {
                let rejection = Rejection::new(
                    RejectionKind::BadRequest,
                    format!("invalid call payload: {err}"),
                );
                return send_json(&mut conn, REJECT, &rejection).await;
            }
        };

        debug!(%session_id, identity = %payload.identity, "call received");
        match self.ingest(&credential, payload).await {
            Ok(result) => send_json(&mut conn, RESULT, &result).await,
            Err(rejection) => {
                debug!(%session_id, %rejection, "rejecting call");
                send_json(&mut conn, REJECT, &rejection).await
            }
        }
    }

    async fn ingest(
        &self,
        credential: &str,
        payload: CallPayload,
    ) -> std::result::Result<untie_core::CallResult, Rejection> {
        self.untie
            .ingest(credential, payload)
            .await
            .map_err(|err| Rejection::from_error(&err))
    }
}

async fn send_json<T: serde::Serialize>(
    conn: &mut Framed<UnixStream, UntieCodec>,
    kind: u16,
    value: &T,
) -> Result<()> {
    let payload = serde_json::to_vec(value)?;
    conn.send(Frame::new(kind, payload)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::path::PathBuf;

    use untie_core::{CallResult, RegisterOptions};

    use super::*;
    use crate::connector::SocketTransporter;

    fn make_sock_path(tag: &str) -> PathBuf {
        let dir = PathBuf::from(format!(
            "/tmp/untie-{}-{}-{}",
            tag,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir.join("ingest.sock")
    }

    fn receiver() -> Untie {
        let untie = Untie::receiver("secret").expect("receiver config is valid");
        untie
            .register(
                |a: i64, b: i64| async move { Ok::<_, Infallible>(a + b) },
                RegisterOptions::key("sum"),
            )
            .expect("sum registers");
        untie
    }

    #[tokio::test]
    async fn serve_one_answers_a_call() {
        let sock_path = make_sock_path("one");
        let listener = IngestListener::bind(&sock_path, receiver()).expect("listener should bind");

        let server = tokio::spawn(async move { listener.serve_one().await });

        let result = SocketTransporter::new(&sock_path)
            .call(
                "secret",
                &CallPayload::new("sum", vec![serde_json::json!(2), serde_json::json!(3)]),
            )
            .await
            .expect("call should succeed");
        assert_eq!(result, CallResult::ok(serde_json::json!(5)));

        server.await.unwrap().expect("connection should be served");
        if let Some(parent) = sock_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[tokio::test]
    async fn wrong_credential_is_rejected() {
        let sock_path = make_sock_path("auth");
        let listener = IngestListener::bind(&sock_path, receiver()).expect("listener should bind");

        let server = tokio::spawn(async move { listener.serve_one().await });

        let err = SocketTransporter::new(&sock_path)
            .call("guess", &CallPayload::new("sum", Vec::new()))
            .await
            .unwrap_err();
        match err {
            PeerError::Rejected(rejection) => {
                assert_eq!(rejection.kind, RejectionKind::Authentication);
                assert_eq!(rejection.message, "Invalid credentials");
            }
            other => panic!("expected rejection, got {other:?}"),
        }

        server.await.unwrap().expect("rejection is a served connection");
        if let Some(parent) = sock_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[tokio::test]
    async fn malformed_call_is_a_bad_request() {
        let sock_path = make_sock_path("bad");
        let listener = IngestListener::bind(&sock_path, receiver()).expect("listener should bind");
        let server = tokio::spawn(async move { listener.serve_one().await });

        let stream = untie_transport::connect(&sock_path).await.unwrap();
        let mut conn = Framed::new(stream, UntieCodec::new());
        crate::handshake::handshake_client(&mut conn, "secret", &HandshakeConfig::default())
            .await
            .unwrap();
        conn.send(Frame::new(CALL, b"{\"identity\":1}".to_vec()))
            .await
            .unwrap();

        let frame = conn.next().await.unwrap().unwrap();
        assert_eq!(frame.kind, REJECT);
        let rejection: Rejection = serde_json::from_slice(&frame.payload).unwrap();
        assert_eq!(rejection.kind, RejectionKind::BadRequest);

        server.await.unwrap().unwrap();
        if let Some(parent) = sock_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[tokio::test]
    async fn serve_stops_on_shutdown() {
        let sock_path = make_sock_path("stop");
        let listener = IngestListener::bind(&sock_path, receiver()).expect("listener should bind");
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let server = tokio::spawn(listener.serve(async {
            let _ = stop_rx.await;
        }));

        let transporter = SocketTransporter::new(&sock_path);
        for n in 0..3i64 {
            let result = transporter
                .call(
                    "secret",
                    &CallPayload::new("sum", vec![serde_json::json!(n), serde_json::json!(n)]),
                )
                .await
                .unwrap();
            assert_eq!(result, CallResult::ok(serde_json::json!(n * 2)));
        }

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
        assert!(!sock_path.exists(), "listener drop removes the socket file");

        if let Some(parent) = sock_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }
}
