use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::{Result, UntieError};
use crate::handler::BoxedHandler;

/// Identity-keyed registry of callable implementations.
///
/// Grows monotonically: entries are never replaced or removed.
#[derive(Default)]
pub struct Registry {
    functions: RwLock<HashMap<String, BoxedHandler>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `handler` under `identity`.
    ///
    /// Fails with [`UntieError::DuplicateKey`] and leaves the existing entry in
    /// place if the identity is taken.
    pub fn insert(&self, identity: &str, handler: BoxedHandler) -> Result<()> {
        let mut functions = self
            .functions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if functions.contains_key(identity) {
            return Err(UntieError::DuplicateKey(identity.to_string()));
        }
        functions.insert(identity.to_string(), handler);
        Ok(())
    }

    /// Look up the implementation registered under `identity`.
    pub fn get(&self, identity: &str) -> Option<BoxedHandler> {
        self.functions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identity)
            .cloned()
    }

    /// Check if an identity is registered.
    pub fn contains(&self, identity: &str) -> bool {
        self.functions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(identity)
    }

    /// Registered identities, sorted.
    pub fn identities(&self) -> Vec<String> {
        let mut identities: Vec<String> = self
            .functions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        identities.sort_unstable();
        identities
    }

    pub fn len(&self) -> usize {
        self.functions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("identities", &self.identities())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use serde_json::json;

    use super::*;
    use crate::handler::boxed;
    use crate::payload::CallResult;

    #[test]
    fn insert_and_lookup() {
        let registry = Registry::new();
        assert!(registry.is_empty());

        registry
            .insert("one", boxed(|| async { Ok::<_, Infallible>(1) }))
            .unwrap();

        assert!(registry.contains("one"));
        assert!(registry.get("one").is_some());
        assert!(registry.get("two").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_insert_keeps_first_entry() {
        let registry = Registry::new();
        registry
            .insert("value", boxed(|| async { Ok::<_, Infallible>("first") }))
            .unwrap();

        let err = registry
            .insert("value", boxed(|| async { Ok::<_, Infallible>("second") }))
            .unwrap_err();
        assert!(matches!(err, UntieError::DuplicateKey(ref key) if key == "value"));

        let handler = registry.get("value").unwrap();
        assert_eq!(handler(Vec::new()).await, CallResult::ok(json!("first")));
    }

    #[test]
    fn identities_are_sorted() {
        let registry = Registry::new();
        for key in ["b", "c", "a"] {
            registry
                .insert(key, boxed(|| async { Ok::<_, Infallible>(()) }))
                .unwrap();
        }
        assert_eq!(registry.identities(), vec!["a", "b", "c"]);
    }
}
