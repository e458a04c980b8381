use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::{debug, info, warn};

use crate::config::{Mode, UntieConfig};
use crate::credential;
use crate::error::{Result, UntieError};
use crate::guard;
use crate::handler::{boxed, Handler, IntoArgs};
use crate::identity::{self, RegisterOptions};
use crate::payload::{CallPayload, CallResult};
use crate::registry::Registry;
use crate::transporter::Transporter;
use crate::untied::Untied;

/// One configured endpoint: local-only, remote initiator or remote receiver.
///
/// Cloning is cheap and every clone shares the same registry.
#[derive(Clone)]
pub struct Untie {
    inner: Arc<Inner>,
}

struct Inner {
    config: UntieConfig,
    transporter: Option<Arc<dyn Transporter>>,
    registry: Registry,
}

impl Untie {
    /// Create an instance.
    ///
    /// In remote mode a non-receiver needs a transporter and every instance needs a
    /// non-empty secret; violations fail here with [`UntieError::Config`].
    pub fn new(config: UntieConfig, transporter: Option<Arc<dyn Transporter>>) -> Result<Self> {
        if config.remote_mode {
            if transporter.is_none() && !config.receiver {
                return Err(UntieError::Config(
                    "remote mode requires a transporter unless the instance is a receiver"
                        .to_string(),
                ));
            }
            if config.secret.as_deref().is_none_or(str::is_empty) {
                return Err(UntieError::Config(
                    "remote mode requires a secret".to_string(),
                ));
            }
        }

        debug!(mode = %config.mode(), "untie instance created");

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                transporter,
                registry: Registry::new(),
            }),
        })
    }

    /// Local-only instance.
    pub fn local() -> Self {
        Self {
            inner: Arc::new(Inner {
                config: UntieConfig::local(),
                transporter: None,
                registry: Registry::new(),
            }),
        }
    }

    /// Remote instance that executes inbound calls.
    pub fn receiver(secret: impl Into<String>) -> Result<Self> {
        Self::new(UntieConfig::receiver(secret), None)
    }

    /// Remote instance that forwards every call through `transporter`.
    pub fn initiator(
        secret: impl Into<String>,
        transporter: impl Transporter,
    ) -> Result<Self> {
        Self::new(UntieConfig::initiator(secret), Some(Arc::new(transporter)))
    }

    pub fn config(&self) -> &UntieConfig {
        &self.inner.config
    }

    pub fn mode(&self) -> Mode {
        self.inner.config.mode()
    }

    /// Shared secret used to authenticate both directions.
    pub fn secret(&self) -> Option<&str> {
        self.inner.config.secret.as_deref()
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Register `handler` and return a callable that routes through [`Untie::invoke`].
    pub fn register<H, Args>(
        &self,
        handler: H,
        options: RegisterOptions,
    ) -> Result<Untied<Args, H::Output>>
    where
        H: Handler<Args>,
        Args: IntoArgs,
    {
        let identity = identity::resolve::<H>(&options)?;
        self.inner.registry.insert(&identity, boxed(handler))?;
        info!(identity = %identity, mode = %self.mode(), "function registered");
        Ok(Untied::new(self.clone(), identity))
    }

    /// Route one call.
    ///
    /// Arguments are guarded first. A remote initiator forwards the payload and
    /// returns the transporter's answer unchanged; every other instance executes the
    /// registered implementation, whose failures come back as [`CallResult::Error`].
    pub async fn invoke(&self, payload: CallPayload) -> Result<CallResult> {
        if !guard::is_safe(&payload.args) {
            debug!(identity = %payload.identity, "rejecting unsafe arguments");
            return Err(UntieError::Serialization);
        }

        match self.mode() {
            Mode::RemoteInitiator => self.invoke_remotely(payload).await,
            Mode::Local | Mode::RemoteReceiver => self.invoke_locally(payload).await,
        }
    }

    /// Entry point for inbound remote calls.
    ///
    /// The credential is checked against the configured secret before anything else
    /// happens; on mismatch the implementation is never reached.
    pub async fn ingest(&self, credential: &str, payload: CallPayload) -> Result<CallResult> {
        if !credential::verify(self.secret(), credential) {
            warn!(
                identity = %payload.identity,
                credential_len = credential.len(),
                "rejecting call with invalid credentials"
            );
            return Err(UntieError::Authentication);
        }

        debug!(identity = %payload.identity, "ingesting remote call");
        self.invoke(payload).await
    }

    async fn invoke_remotely(&self, payload: CallPayload) -> Result<CallResult> {
        let transporter = self.inner.transporter.as_ref().ok_or_else(|| {
            UntieError::Config("remote mode requires a transporter".to_string())
        })?;
        debug!(identity = %payload.identity, args = payload.args.len(), "forwarding call");
        transporter.send(self, payload).await
    }

    async fn invoke_locally(&self, payload: CallPayload) -> Result<CallResult> {
        let handler = self
            .inner
            .registry
            .get(&payload.identity)
            .ok_or_else(|| UntieError::FunctionNotFound(payload.identity.clone()))?;

        debug!(identity = %payload.identity, args = payload.args.len(), "invoking locally");

        let result = match AssertUnwindSafe(handler(payload.args)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(identity = %payload.identity, %message, "implementation panicked");
                CallResult::error(message)
            }
        };

        if let CallResult::Error(descriptor) = &result {
            debug!(identity = %payload.identity, error = %descriptor.message, "implementation failed");
        }
        Ok(result)
    }
}

impl fmt::Debug for Untie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Untie")
            .field("config", &self.inner.config)
            .field("has_transporter", &self.inner.transporter.is_some())
            .field("registry", &self.inner.registry)
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "implementation panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::transporter::LoopbackTransporter;

    struct Recording {
        sent: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Transporter for Recording {
        async fn send(&self, _origin: &Untie, _payload: CallPayload) -> Result<CallResult> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(CallResult::ok(json!("forwarded")))
        }
    }

    #[test]
    fn remote_initiator_requires_transporter() {
        let err = Untie::new(UntieConfig::initiator("secret"), None).unwrap_err();
        assert!(matches!(err, UntieError::Config(_)));
    }

    #[test]
    fn remote_mode_requires_secret() {
        let config = UntieConfig {
            remote_mode: true,
            receiver: true,
            secret: None,
        };
        assert!(matches!(
            Untie::new(config, None),
            Err(UntieError::Config(_))
        ));

        assert!(matches!(
            Untie::receiver(""),
            Err(UntieError::Config(_))
        ));
    }

    #[test]
    fn local_mode_skips_remote_validation() {
        let config = UntieConfig {
            remote_mode: false,
            receiver: false,
            secret: None,
        };
        let untie = Untie::new(config, None).unwrap();
        assert_eq!(untie.mode(), Mode::Local);
    }

    #[tokio::test]
    async fn initiator_forwards_without_touching_registry() {
        let sent = Arc::new(AtomicUsize::new(0));
        let untie = Untie::initiator("secret", Recording { sent: sent.clone() }).unwrap();

        let result = untie
            .invoke(CallPayload::new("unregistered", vec![json!(1)]))
            .await
            .unwrap();

        assert_eq!(result, CallResult::ok(json!("forwarded")));
        assert_eq!(sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unsafe_arguments_never_reach_the_transporter() {
        let sent = Arc::new(AtomicUsize::new(0));
        let untie = Untie::initiator("secret", Recording { sent: sent.clone() }).unwrap();

        let mut deep = json!(null);
        for _ in 0..200 {
            deep = json!([deep]);
        }
        let err = untie
            .invoke(CallPayload::new("any", vec![deep]))
            .await
            .unwrap_err();

        assert!(matches!(err, UntieError::Serialization));
        assert_eq!(sent.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn local_invoke_reports_missing_function() {
        let untie = Untie::local();
        let err = untie
            .invoke(CallPayload::new("missing", Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, UntieError::FunctionNotFound(ref id) if id == "missing"));
    }

    #[tokio::test]
    async fn panics_are_captured_as_error_results() {
        let untie = Untie::local();
        untie
            .register(
                || async {
                    if true {
                        panic!("kaboom");
                    }
                    Ok::<(), Infallible>(())
                },
                RegisterOptions::key("explode"),
            )
            .unwrap();

        let result = untie
            .invoke(CallPayload::new("explode", Vec::new()))
            .await
            .unwrap();
        assert_eq!(result, CallResult::error("kaboom"));

        // The instance stays usable after a failed call.
        assert!(untie.registry().contains("explode"));
    }

    #[tokio::test]
    async fn ingest_rejects_wrong_credentials() {
        let calls = Arc::new(AtomicUsize::new(0));
        let receiver = Untie::receiver("secret").unwrap();
        let counter = calls.clone();
        receiver
            .register(
                move || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, Infallible>(())
                    }
                },
                RegisterOptions::key("count"),
            )
            .unwrap();

        let err = receiver
            .ingest("wrong", CallPayload::new("count", Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, UntieError::Authentication));
        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        receiver
            .ingest("secret", CallPayload::new("count", Vec::new()))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn local_instance_rejects_every_ingest() {
        let untie = Untie::local();
        let err = untie
            .ingest("", CallPayload::new("anything", Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, UntieError::Authentication));
    }

    #[tokio::test]
    async fn loopback_delivers_sender_secret() {
        let receiver = Untie::receiver("other").unwrap();
        receiver
            .register(|| async { Ok::<_, Infallible>(1) }, RegisterOptions::key("one"))
            .unwrap();
        let sender = Untie::initiator("secret", LoopbackTransporter::new(receiver)).unwrap();

        let err = sender
            .invoke(CallPayload::new("one", Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, UntieError::Authentication));
    }

    #[test]
    fn debug_output_redacts_secret() {
        let untie = Untie::receiver("top-secret").unwrap();
        let debug = format!("{untie:?}");
        assert!(!debug.contains("top-secret"));
        assert!(debug.contains("remote_mode: true"));
    }
}
