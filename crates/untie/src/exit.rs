use std::fmt;
use std::io;

use untie::frame::FrameError;
use untie::peer::{PeerError, RejectionKind};
use untie::transport::TransportError;
use untie::UntieError;

// Process exit codes. 124 mirrors timeout(1).
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::PathTooLong { .. } => CliError::new(USAGE, format!("{context}: {err}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        FrameError::InvalidMagic => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
    }
}

pub fn peer_error(context: &str, err: PeerError) -> CliError {
    match err {
        PeerError::Transport(err) => transport_error(context, err),
        PeerError::Frame(err) => frame_error(context, err),
        PeerError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        PeerError::Json(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        PeerError::Disconnected(_) => CliError::new(FAILURE, format!("{context}: {err}")),
        PeerError::Rejected(ref rejection) => {
            let code = match rejection.kind {
                RejectionKind::Authentication => PERMISSION_DENIED,
                RejectionKind::Serialization | RejectionKind::BadRequest => DATA_INVALID,
                RejectionKind::NotFound => FAILURE,
                RejectionKind::Internal => INTERNAL,
            };
            CliError::new(code, format!("{context}: {}", rejection.message))
        }
        PeerError::HandshakeFailed(_) | PeerError::UnexpectedFrame(_) => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
    }
}

pub fn untie_error(context: &str, err: UntieError) -> CliError {
    match err {
        UntieError::Transport(source) => match source.downcast::<PeerError>() {
            Ok(peer) => peer_error(context, *peer),
            Err(other) => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
        },
        UntieError::Authentication => {
            CliError::new(PERMISSION_DENIED, format!("{context}: {err}"))
        }
        UntieError::Serialization | UntieError::Decode(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        UntieError::Config(_) => CliError::new(USAGE, format!("{context}: {err}")),
        UntieError::Call(_) | UntieError::FunctionNotFound(_) => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        UntieError::IdentityInference | UntieError::DuplicateKey(_) => {
            CliError::new(INTERNAL, format!("{context}: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use untie::peer::Rejection;

    use super::*;

    #[test]
    fn rejected_credentials_map_to_permission_denied() {
        let err = UntieError::from(PeerError::Rejected(Rejection::new(
            RejectionKind::Authentication,
            "Invalid credentials",
        )));
        let cli = untie_error("call failed", err);
        assert_eq!(cli.code, PERMISSION_DENIED);
        assert_eq!(cli.message, "call failed: Invalid credentials");
    }

    #[test]
    fn missing_socket_is_a_transport_failure() {
        let err = PeerError::Transport(TransportError::Connect {
            path: "/tmp/none.sock".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        });
        assert_eq!(peer_error("connect", err).code, TRANSPORT_ERROR);
    }

    #[test]
    fn guard_failures_are_invalid_data() {
        assert_eq!(
            untie_error("call", UntieError::Serialization).code,
            DATA_INVALID
        );
    }

    #[test]
    fn implementation_failures_are_plain_failures() {
        let cli = untie_error("call", UntieError::Call("boom".to_string()));
        assert_eq!(cli.code, FAILURE);
        assert_eq!(cli.message, "call: boom");
    }
}
