use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::{Result, UntieError};
use crate::handler::IntoArgs;
use crate::instance::Untie;
use crate::payload::CallPayload;

/// Callable returned by [`Untie::register`].
///
/// `Args` is the implementation's parameter tuple and `R` its success type, so a
/// function `add(a: i64, b: i64)` is called as `add.call((1, 2)).await`. Whether the
/// call runs in-process or on a peer depends only on the owning instance's mode.
pub struct Untied<Args, R> {
    untie: Untie,
    identity: Arc<str>,
    _signature: PhantomData<fn(Args) -> R>,
}

impl<Args, R> Untied<Args, R> {
    pub(crate) fn new(untie: Untie, identity: String) -> Self {
        Self {
            untie,
            identity: identity.into(),
            _signature: PhantomData,
        }
    }

    /// Identity the implementation is registered under.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Instance the call is routed through.
    pub fn instance(&self) -> &Untie {
        &self.untie
    }
}

impl<Args, R> Untied<Args, R>
where
    Args: IntoArgs,
    R: DeserializeOwned,
{
    /// Call the implementation.
    ///
    /// An implementation failure, local or remote, comes back as
    /// [`UntieError::Call`] carrying the implementation's message.
    pub async fn call(&self, args: Args) -> Result<R> {
        let args = args.into_args()?;
        let payload = CallPayload::new(self.identity.as_ref(), args);
        let value = self.untie.invoke(payload).await?.into_result()?;
        serde_json::from_value(value).map_err(UntieError::Decode)
    }
}

impl<Args, R> Clone for Untied<Args, R> {
    fn clone(&self) -> Self {
        Self {
            untie: self.untie.clone(),
            identity: self.identity.clone(),
            _signature: PhantomData,
        }
    }
}

impl<Args, R> fmt::Debug for Untied<Args, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Untied")
            .field("identity", &self.identity)
            .field("mode", &self.untie.mode())
            .finish()
    }
}
