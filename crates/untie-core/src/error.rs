/// Errors that can occur while registering or routing untied calls.
#[derive(Debug, thiserror::Error)]
pub enum UntieError {
    /// No key was given and none could be derived from the implementation.
    #[error("could not infer a key for this function; provide one explicitly")]
    IdentityInference,

    /// The identity is already registered on this instance.
    #[error("function '{0}' is already registered")]
    DuplicateKey(String),

    /// The call arguments cannot round-trip through JSON.
    #[error("Arguments are not safely serializable")]
    Serialization,

    /// No implementation is registered under the identity.
    #[error("function '{0}' not found")]
    FunctionNotFound(String),

    /// The inbound credential did not match the configured secret.
    #[error("Invalid credentials")]
    Authentication,

    /// The instance settings are inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The implementation failed; carries its message unchanged.
    #[error("{0}")]
    Call(String),

    /// The returned value does not match the caller's declared return type.
    #[error("failed to decode call result: {0}")]
    Decode(#[source] serde_json::Error),

    /// Failure reported by a transporter, passed through untranslated.
    #[error(transparent)]
    Transport(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl UntieError {
    /// Wrap a transporter failure without translating it.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, UntieError>;
