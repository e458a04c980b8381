use crate::error::{Result, UntieError};

/// Options accepted by [`Untie::register`](crate::Untie::register).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterOptions {
    /// Explicit identity. An empty key counts as absent.
    pub key: Option<String>,
}

impl RegisterOptions {
    /// Register under an explicit key.
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
        }
    }
}

/// Resolve the identity for implementation type `H`.
///
/// An explicit key wins. Otherwise a fn item is named by its own name, the last
/// segment of its path, so `math::add` registers as `"add"` in every binary.
/// Closures are anonymous and cannot be named.
pub fn resolve<H>(options: &RegisterOptions) -> Result<String> {
    if let Some(key) = options.key.as_deref().filter(|key| !key.is_empty()) {
        return Ok(key.to_string());
    }
    infer::<H>()
}

fn infer<H>() -> Result<String> {
    let full = std::any::type_name::<H>();
    if full.contains("{{closure}}") {
        return Err(UntieError::IdentityInference);
    }
    // Generic arguments carry their own paths; name the item before them.
    let path = full.split('<').next().unwrap_or(full);
    let name = path.rsplit("::").next().unwrap_or(path);
    if name.is_empty() {
        return Err(UntieError::IdentityInference);
    }
    Ok(name.to_string())
}

/// Register a named function under its declaration-site path text.
///
/// `untie!(instance, math::add)` registers `math::add` with the key `"math::add"`,
/// which stays identical across every binary that spells the path the same way.
#[macro_export]
macro_rules! untie {
    ($instance:expr, $($path:ident)::+) => {
        $instance.register(
            $($path)::+,
            $crate::RegisterOptions::key(stringify!($($path)::+)),
        )
    };
}
