use std::fmt;

use serde::Deserialize;

/// Environment variable enabling network dispatch.
pub const ENV_REMOTE_ENABLED: &str = "UNTIE_REMOTE_ENABLED";
/// Environment variable marking the instance as a receiver.
pub const ENV_RECEIVER: &str = "UNTIE_RECEIVER";
/// Environment variable holding the shared secret.
pub const ENV_SECRET: &str = "UNTIE_SECRET";

/// Routing role of an instance, derived from [`UntieConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Every call runs in-process.
    Local,
    /// Every call is forwarded through the transporter.
    RemoteInitiator,
    /// Calls arriving through the ingest gate run in-process.
    RemoteReceiver,
}

impl Mode {
    /// Stable lowercase name for logs and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Local => "local",
            Mode::RemoteInitiator => "remote-initiator",
            Mode::RemoteReceiver => "remote-receiver",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for one [`Untie`](crate::Untie) instance.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UntieConfig {
    /// Enable network dispatch.
    pub remote_mode: bool,
    /// Execute calls locally when contacted remotely instead of forwarding them.
    pub receiver: bool,
    /// Shared credential. Required when `remote_mode` is set.
    /// Treated as opaque credential material and redacted in debug output.
    pub secret: Option<String>,
}

impl UntieConfig {
    /// Local-only configuration.
    pub fn local() -> Self {
        Self::default()
    }

    /// Remote configuration that forwards every call.
    pub fn initiator(secret: impl Into<String>) -> Self {
        Self {
            remote_mode: true,
            receiver: false,
            secret: Some(secret.into()),
        }
    }

    /// Remote configuration that executes calls arriving through ingest.
    pub fn receiver(secret: impl Into<String>) -> Self {
        Self {
            remote_mode: true,
            receiver: true,
            secret: Some(secret.into()),
        }
    }

    /// Read settings from `UNTIE_REMOTE_ENABLED`, `UNTIE_RECEIVER` and `UNTIE_SECRET`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            remote_mode: lookup(ENV_REMOTE_ENABLED).is_some_and(|v| parse_flag(&v)),
            receiver: lookup(ENV_RECEIVER).is_some_and(|v| parse_flag(&v)),
            secret: lookup(ENV_SECRET).filter(|secret| !secret.is_empty()),
        }
    }

    /// Routing role implied by the two flags.
    ///
    /// `receiver` only matters once `remote_mode` is enabled.
    pub fn mode(&self) -> Mode {
        match (self.remote_mode, self.receiver) {
            (false, _) => Mode::Local,
            (true, true) => Mode::RemoteReceiver,
            (true, false) => Mode::RemoteInitiator,
        }
    }
}

impl fmt::Debug for UntieConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("UntieConfig");
        dbg.field("remote_mode", &self.remote_mode)
            .field("receiver", &self.receiver);
        if let Some(secret) = &self.secret {
            dbg.field("secret", &format_args!("<redacted:{} bytes>", secret.len()));
        } else {
            dbg.field("secret", &Option::<String>::None);
        }
        dbg.finish()
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
