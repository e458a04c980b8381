//! Typed implementations behind an untyped call boundary.
//!
//! A [`Handler`] is any async function or closure taking up to eight positional
//! parameters that deserialize from JSON and returning `Result<T, E>` with a
//! serializable `T` and a displayable `E`. The parameter tuple doubles as the
//! argument type of the wrapped callable, see [`IntoArgs`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::guard::to_arg;
use crate::payload::CallResult;

/// Type-erased implementation stored in the registry.
pub type BoxedHandler = Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, CallResult> + Send + Sync>;

/// An implementation that can be registered under an identity.
pub trait Handler<Args>: Clone + Send + Sync + 'static {
    /// Success type returned to the caller.
    type Output;

    /// Run the implementation against positional JSON arguments.
    ///
    /// Argument decoding failures and implementation errors come back as
    /// [`CallResult::Error`].
    fn call(&self, args: Vec<Value>) -> BoxFuture<'static, CallResult>;
}

/// Erase a handler's parameter types.
pub fn boxed<H, Args>(handler: H) -> BoxedHandler
where
    H: Handler<Args>,
{
    Arc::new(move |args| handler.call(args))
}

/// Positional arguments that can be lowered to JSON values.
pub trait IntoArgs {
    /// Convert into JSON values, failing with
    /// [`UntieError::Serialization`](crate::UntieError::Serialization).
    fn into_args(self) -> Result<Vec<Value>>;
}

fn finish<T, E>(outcome: std::result::Result<T, E>) -> CallResult
where
    T: Serialize,
    E: fmt::Display,
{
    match outcome {
        Ok(value) => match serde_json::to_value(value) {
            Ok(value) => CallResult::Ok(value),
            Err(err) => CallResult::error(format!("return value is not serializable: {err}")),
        },
        Err(err) => CallResult::error(err.to_string()),
    }
}

macro_rules! count {
    () => { 0usize };
    ($head:ident $($tail:ident)*) => { 1usize + count!($($tail)*) };
}

macro_rules! impl_handler {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, Fut, T, E, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
            T: Serialize + Send + 'static,
            E: fmt::Display + Send + 'static,
            $($ty: DeserializeOwned + Send + 'static,)*
        {
            type Output = T;

            fn call(&self, args: Vec<Value>) -> BoxFuture<'static, CallResult> {
                let handler = self.clone();
                Box::pin(async move {
                    let expected = count!($($ty)*);
                    if args.len() != expected {
                        return CallResult::error(format!(
                            "expected {expected} argument(s), got {}",
                            args.len()
                        ));
                    }

                    let mut args = args.into_iter().enumerate();
                    $(
                        let $ty: $ty = match args.next() {
                            Some((index, value)) => match serde_json::from_value(value) {
                                Ok(decoded) => decoded,
                                Err(err) => {
                                    return CallResult::error(format!(
                                        "invalid argument {index}: {err}"
                                    ));
                                }
                            },
                            None => return CallResult::error("missing argument"),
                        };
                    )*

                    finish(handler($($ty),*).await)
                })
            }
        }

        #[allow(non_snake_case)]
        impl<$($ty,)*> IntoArgs for ($($ty,)*)
        where
            $($ty: Serialize,)*
        {
            fn into_args(self) -> Result<Vec<Value>> {
                let ($($ty,)*) = self;
                Ok(vec![$(to_arg(&$ty)?),*])
            }
        }
    };
}

impl_handler!();
impl_handler!(A1);
impl_handler!(A1, A2);
impl_handler!(A1, A2, A3);
impl_handler!(A1, A2, A3, A4);
impl_handler!(A1, A2, A3, A4, A5);
impl_handler!(A1, A2, A3, A4, A5, A6);
impl_handler!(A1, A2, A3, A4, A5, A6, A7);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8);
