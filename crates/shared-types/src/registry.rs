//! # Handler Registry
//!
//! Maps stable `HandlerId`s to function values.
//!
//! Tasks, retry records and delegation requests carry only identifiers.
//! Each process populates its registries at start-up, so an identifier read
//! back from the durable store (or received from the master) resolves to the
//! same behaviour it was created with.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let registry: HandlerRegistry<dyn TaskFunction> = HandlerRegistry::new();
//! registry.register("process_message", Arc::new(ProcessMessage::new()));
//!
//! let f = registry.resolve(&HandlerId::from("process_message"));
//! ```

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Stable name of a registered function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerId(pub String);

impl HandlerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HandlerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Registry of handlers of one kind.
pub struct HandlerRegistry<T: ?Sized> {
    handlers: RwLock<HashMap<HandlerId, Arc<T>>>,
}

impl<T: ?Sized> HandlerRegistry<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a handler under `id`, replacing any previous one.
    pub fn register(&self, id: impl Into<HandlerId>, handler: Arc<T>) {
        let id = id.into();
        if self.handlers.write().insert(id.clone(), handler).is_some() {
            warn!("[registry] Handler {} already registered, replacing", id);
        }
    }

    /// Resolve a handler by id.
    pub fn resolve(&self, id: &HandlerId) -> Option<Arc<T>> {
        self.handlers.read().get(id).cloned()
    }

    /// Check whether a handler is registered.
    pub fn contains(&self, id: &HandlerId) -> bool {
        self.handlers.read().contains_key(id)
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// All registered ids, sorted.
    pub fn ids(&self) -> Vec<HandlerId> {
        let mut ids: Vec<_> = self.handlers.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl<T: ?Sized> Default for HandlerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct Hello;

    impl Greeter for Hello {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let registry: HandlerRegistry<dyn Greeter> = HandlerRegistry::new();
        registry.register("hello", Arc::new(Hello));

        let handler = registry.resolve(&HandlerId::from("hello")).unwrap();
        assert_eq!(handler.greet(), "hello");
        assert!(registry.contains(&HandlerId::from("hello")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_resolve_unknown() {
        let registry: HandlerRegistry<dyn Greeter> = HandlerRegistry::default();
        assert!(registry.resolve(&HandlerId::from("missing")).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_ids_sorted() {
        let registry: HandlerRegistry<dyn Greeter> = HandlerRegistry::new();
        registry.register("b", Arc::new(Hello));
        registry.register("a", Arc::new(Hello));
        assert_eq!(
            registry.ids(),
            vec![HandlerId::from("a"), HandlerId::from("b")]
        );
    }
}
