use std::fmt;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::debug;
use untie_frame::{Frame, FrameError, UntieCodec, HELLO};

use crate::error::{PeerError, Result};

const MAX_PROTOCOL_LEN: usize = 32;
const MAX_VERSION_LEN: usize = 16;
const MAX_SESSION_ID_LEN: usize = 128;
/// Longest credential a `Hello` may carry, in bytes.
pub const MAX_CREDENTIAL_LEN: usize = 4096;

/// Framed socket carrying untie frames.
pub type Connection<T> = Framed<T, UntieCodec>;

/// Client greeting sent as the first `HELLO` frame.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Hello {
    /// Protocol name. Must be `untie` by default.
    pub protocol: String,
    pub version: String,
    /// Shared secret presented to the receiver's ingest gate.
    /// Redacted in debug output.
    pub credential: String,
}

/// Server answer to [`Hello`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HelloAck {
    pub protocol: String,
    /// Version the server speaks.
    pub version: String,
    /// Opaque server-assigned connection identifier, for log correlation.
    pub session_id: String,
}

/// Result of a successful handshake.
#[derive(Clone, PartialEq, Eq)]
pub struct HandshakeResult {
    pub session_id: String,
    pub protocol_version: String,
    /// Credential observed by the server side; `None` on the client side.
    pub credential: Option<String>,
}

/// Configuration for handshake negotiation.
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    /// Timeout for each handshake step.
    pub timeout: Duration,
    /// Expected protocol name.
    pub protocol_name: String,
    /// Local protocol version, `<major>.<minor>`.
    pub protocol_version: String,
    /// Maximum handshake frame payload size in bytes.
    pub max_handshake_payload: usize,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            protocol_name: "untie".to_string(),
            protocol_version: "1.0".to_string(),
            max_handshake_payload: 16 * 1024,
        }
    }
}

impl fmt::Debug for Hello {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hello")
            .field("protocol", &self.protocol)
            .field("version", &self.version)
            .field(
                "credential",
                &format_args!("<redacted:{} bytes>", self.credential.len()),
            )
            .finish()
    }
}

impl fmt::Debug for HandshakeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("HandshakeResult");
        dbg.field("session_id", &self.session_id)
            .field("protocol_version", &self.protocol_version);
        if let Some(credential) = &self.credential {
            dbg.field(
                "credential",
                &format_args!("<redacted:{} bytes>", credential.len()),
            );
        } else {
            dbg.field("credential", &Option::<String>::None);
        }
        dbg.finish()
    }
}

/// Client side: present `credential` and wait for the server's acknowledgement.
pub async fn handshake_client<T>(
    conn: &mut Connection<T>,
    credential: &str,
    config: &HandshakeConfig,
) -> Result<HandshakeResult>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    validate_protocol_name(&config.protocol_name)?;
    validate_version(&config.protocol_version)?;
    validate_credential(credential)?;

    let hello = Hello {
        protocol: config.protocol_name.clone(),
        version: config.protocol_version.clone(),
        credential: credential.to_string(),
    };
    send_hello(conn, &hello, config.timeout).await?;

    let ack: HelloAck = recv_hello(conn, config).await?;

    validate_protocol_name(&ack.protocol)?;
    validate_version(&ack.version)?;
    validate_session_id(&ack.session_id)?;

    if ack.protocol != config.protocol_name {
        return Err(PeerError::HandshakeFailed(format!(
            "unknown protocol '{}' (expected '{}')",
            ack.protocol, config.protocol_name
        )));
    }

    if !is_version_compatible(&config.protocol_version, &ack.version)? {
        return Err(PeerError::HandshakeFailed(format!(
            "incompatible version '{}' (local '{}')",
            ack.version, config.protocol_version
        )));
    }

    debug!(session_id = %ack.session_id, "handshake complete");

    Ok(HandshakeResult {
        session_id: ack.session_id,
        protocol_version: ack.version,
        credential: None,
    })
}

/// Server side: read the client's [`Hello`], check protocol and version, and
/// acknowledge with `session_id`.
///
/// The credential is not judged here; it is handed back for the ingest gate.
pub async fn handshake_server<T>(
    conn: &mut Connection<T>,
    session_id: &str,
    config: &HandshakeConfig,
) -> Result<HandshakeResult>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    validate_protocol_name(&config.protocol_name)?;
    validate_version(&config.protocol_version)?;
    validate_session_id(session_id)?;

    let hello: Hello = recv_hello(conn, config).await?;

    validate_protocol_name(&hello.protocol)?;
    validate_version(&hello.version)?;
    validate_credential(&hello.credential)?;

    if hello.protocol != config.protocol_name {
        return Err(PeerError::HandshakeFailed(format!(
            "unknown protocol '{}' (expected '{}')",
            hello.protocol, config.protocol_name
        )));
    }

    if !is_version_compatible(&hello.version, &config.protocol_version)? {
        return Err(PeerError::HandshakeFailed(format!(
            "incompatible version '{}' (server '{}')",
            hello.version, config.protocol_version
        )));
    }

    let ack = HelloAck {
        protocol: config.protocol_name.clone(),
        version: config.protocol_version.clone(),
        session_id: session_id.to_string(),
    };
    send_hello(conn, &ack, config.timeout).await?;

    Ok(HandshakeResult {
        session_id: session_id.to_string(),
        protocol_version: config.protocol_version.clone(),
        credential: Some(hello.credential),
    })
}

async fn send_hello<T, M>(conn: &mut Connection<T>, message: &M, timeout: Duration) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
    M: Serialize,
{
    let payload = serde_json::to_vec(message)?;
    tokio::time::timeout(timeout, conn.send(Frame::new(HELLO, payload)))
        .await
        .map_err(|_| PeerError::Timeout(timeout))??;
    Ok(())
}

async fn recv_hello<T, M>(conn: &mut Connection<T>, config: &HandshakeConfig) -> Result<M>
where
    T: AsyncRead + AsyncWrite + Unpin,
    M: DeserializeOwned,
{
    let next = tokio::time::timeout(config.timeout, conn.next())
        .await
        .map_err(|_| PeerError::Timeout(config.timeout))?;

    let frame = match next {
        Some(Ok(frame)) => frame,
        None | Some(Err(FrameError::ConnectionClosed)) => {
            return Err(PeerError::Disconnected(
                "connection closed during handshake".to_string(),
            ));
        }
        Some(Err(err)) => return Err(PeerError::Frame(err)),
    };

    if frame.kind != HELLO {
        return Err(PeerError::UnexpectedFrame(frame.kind));
    }
    if frame.payload.len() > config.max_handshake_payload {
        return Err(PeerError::HandshakeFailed(format!(
            "handshake payload too large: {} (max {})",
            frame.payload.len(),
            config.max_handshake_payload
        )));
    }
    Ok(serde_json::from_slice(&frame.payload)?)
}

fn validate_protocol_name(protocol: &str) -> Result<()> {
    if protocol.is_empty() || protocol.len() > MAX_PROTOCOL_LEN {
        return Err(PeerError::HandshakeFailed(format!(
            "invalid protocol name length: {}",
            protocol.len()
        )));
    }
    Ok(())
}

fn validate_version(version: &str) -> Result<()> {
    if version.is_empty() || version.len() > MAX_VERSION_LEN {
        return Err(PeerError::HandshakeFailed(format!(
            "invalid protocol version length: {}",
            version.len()
        )));
    }
    parse_version(version).map(|_| ())
}

fn validate_session_id(session_id: &str) -> Result<()> {
    if session_id.is_empty() || session_id.len() > MAX_SESSION_ID_LEN {
        return Err(PeerError::HandshakeFailed(format!(
            "invalid session_id length: {}",
            session_id.len()
        )));
    }
    Ok(())
}

// Empty credentials pass here; the ingest gate rejects them.
fn validate_credential(credential: &str) -> Result<()> {
    if credential.len() > MAX_CREDENTIAL_LEN {
        return Err(PeerError::HandshakeFailed(format!(
            "credential is {} bytes, limit is {MAX_CREDENTIAL_LEN}",
            credential.len()
        )));
    }
    Ok(())
}

fn is_version_compatible(client_version: &str, server_version: &str) -> Result<bool> {
    let (client_major, client_minor) = parse_version(client_version)?;
    let (server_major, server_minor) = parse_version(server_version)?;

    Ok(client_major == server_major && client_minor >= server_minor)
}

fn parse_version(version: &str) -> Result<(u16, u16)> {
    let invalid = |reason: &str| {
        PeerError::HandshakeFailed(format!("invalid version '{version}': {reason}"))
    };

    let mut parts = version.split('.');
    let major = parts.next().ok_or_else(|| invalid("missing major"))?;
    let minor = parts.next().ok_or_else(|| invalid("missing minor"))?;
    if parts.next().is_some() {
        return Err(invalid("expected '<major>.<minor>'"));
    }

    let major = major
        .parse::<u16>()
        .map_err(|_| invalid("non-numeric major"))?;
    let minor = minor
        .parse::<u16>()
        .map_err(|_| invalid("non-numeric minor"))?;

    Ok((major, minor))
}

#[cfg(test)]
mod tests {
    use tokio::io::DuplexStream;
    use untie_frame::CALL;

    use super::*;

    fn pair() -> (Connection<DuplexStream>, Connection<DuplexStream>) {
        let (left, right) = tokio::io::duplex(4096);
        (
            Framed::new(left, UntieCodec::new()),
            Framed::new(right, UntieCodec::new()),
        )
    }

    #[tokio::test]
    async fn successful_handshake_carries_credential() {
        let (mut client, mut server) = pair();
        let config = HandshakeConfig::default();

        let server_config = config.clone();
        let server_task = tokio::spawn(async move {
            handshake_server(&mut server, "session-1", &server_config).await
        });
        let client_result = handshake_client(&mut client, "s3cret", &config)
            .await
            .unwrap();
        let server_result = server_task.await.unwrap().unwrap();

        assert_eq!(client_result.session_id, "session-1");
        assert_eq!(client_result.protocol_version, "1.0");
        assert!(client_result.credential.is_none());
        assert_eq!(server_result.credential.as_deref(), Some("s3cret"));
    }

    #[tokio::test]
    async fn empty_credential_passes_handshake() {
        let (mut client, mut server) = pair();
        let config = HandshakeConfig::default();

        let server_config = config.clone();
        let server_task =
            tokio::spawn(async move { handshake_server(&mut server, "s", &server_config).await });
        handshake_client(&mut client, "", &config).await.unwrap();
        let server_result = server_task.await.unwrap().unwrap();
        assert_eq!(server_result.credential.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn wrong_protocol_name_rejected() {
        let (mut client, mut server) = pair();

        let server_task = tokio::spawn(async move {
            let result = handshake_server(&mut server, "s", &HandshakeConfig::default()).await;
            drop(server);
            result
        });
        let config = HandshakeConfig {
            protocol_name: "foobar".to_string(),
            ..HandshakeConfig::default()
        };
        let client_result = handshake_client(&mut client, "secret", &config).await;

        assert!(matches!(client_result, Err(PeerError::Disconnected(_))));
        assert!(matches!(
            server_task.await.unwrap(),
            Err(PeerError::HandshakeFailed(_))
        ));
    }

    #[tokio::test]
    async fn version_mismatch() {
        let (mut client, mut server) = pair();

        let server_task = tokio::spawn(async move {
            let config = HandshakeConfig {
                protocol_version: "2.0".to_string(),
                ..HandshakeConfig::default()
            };
            let result = handshake_server(&mut server, "s", &config).await;
            drop(server);
            result
        });
        let result = handshake_client(&mut client, "secret", &HandshakeConfig::default()).await;

        assert!(matches!(result, Err(PeerError::Disconnected(_))));
        assert!(matches!(
            server_task.await.unwrap(),
            Err(PeerError::HandshakeFailed(_))
        ));
    }

    #[tokio::test]
    async fn newer_client_minor_is_compatible() {
        let (mut client, mut server) = pair();

        let server_task = tokio::spawn(async move {
            handshake_server(&mut server, "s", &HandshakeConfig::default()).await
        });
        let config = HandshakeConfig {
            protocol_version: "1.3".to_string(),
            ..HandshakeConfig::default()
        };
        let result = handshake_client(&mut client, "secret", &config).await.unwrap();
        assert_eq!(result.protocol_version, "1.0");
        server_task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn invalid_json_rejected() {
        let (mut client, mut server) = pair();
        client
            .send(Frame::new(HELLO, b"{not-json".to_vec()))
            .await
            .unwrap();

        let result = handshake_server(&mut server, "s", &HandshakeConfig::default()).await;
        assert!(matches!(result, Err(PeerError::Json(_))));
    }

    #[tokio::test]
    async fn call_before_hello_rejected() {
        let (mut client, mut server) = pair();
        client.send(Frame::new(CALL, b"{}".to_vec())).await.unwrap();

        let result = handshake_server(&mut server, "s", &HandshakeConfig::default()).await;
        assert!(matches!(result, Err(PeerError::UnexpectedFrame(CALL))));
    }

    #[tokio::test]
    async fn handshake_timeout() {
        let (mut client, _server) = pair();
        let config = HandshakeConfig {
            timeout: Duration::from_millis(25),
            ..HandshakeConfig::default()
        };

        let result = handshake_client(&mut client, "secret", &config).await;
        assert!(matches!(result, Err(PeerError::Timeout(_))));
    }

    #[tokio::test]
    async fn oversized_credential_rejected_locally() {
        let (mut client, _server) = pair();
        let credential = "x".repeat(MAX_CREDENTIAL_LEN + 1);

        let result = handshake_client(&mut client, &credential, &HandshakeConfig::default()).await;
        match result {
            Err(PeerError::HandshakeFailed(message)) => {
                assert!(message.contains("limit is 4096"), "{message}");
            }
            other => panic!("expected handshake failure, got {other:?}"),
        }
    }

    #[test]
    fn debug_redacts_credential() {
        let hello = Hello {
            protocol: "untie".to_string(),
            version: "1.0".to_string(),
            credential: "token-123".to_string(),
        };
        let debug = format!("{hello:?}");
        assert!(!debug.contains("token-123"));
        assert!(debug.contains("<redacted:9 bytes>"));

        let result = HandshakeResult {
            session_id: "s".to_string(),
            protocol_version: "1.0".to_string(),
            credential: Some("token-123".to_string()),
        };
        assert!(!format!("{result:?}").contains("token-123"));
    }

    #[test]
    fn version_parsing() {
        assert_eq!(parse_version("1.0").unwrap(), (1, 0));
        assert!(parse_version("1").is_err());
        assert!(parse_version("1.0.0").is_err());
        assert!(parse_version("a.b").is_err());
        assert!(is_version_compatible("1.2", "1.1").unwrap());
        assert!(!is_version_compatible("1.0", "1.1").unwrap());
        assert!(!is_version_compatible("2.0", "1.0").unwrap());
    }
}
