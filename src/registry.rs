//! Keyed handler registry with a fallback.
//!
//! Backends register one handler per key. Registration is first-wins, so a
//! handler registered early (for example from configuration) cannot be
//! replaced by a later default. Lookups for keys without a handler get the
//! fallback.

use log::debug;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct HandlerRegistry<K, H> {
    handlers: HashMap<K, H>,
    fallback: H,
}

impl<K, H> HandlerRegistry<K, H>
where
    K: Eq + Hash + Debug,
{
    pub fn new(fallback: H) -> Self {
        Self {
            handlers: HashMap::new(),
            fallback,
        }
    }

    /// Register `handler` for `key` unless one is already present.
    ///
    /// Returns true if the handler was stored.
    pub fn register_if_absent(&mut self, key: K, handler: H) -> bool {
        if self.handlers.contains_key(&key) {
            debug!("handler for {:?} already registered, keeping the first", key);
            return false;
        }
        self.handlers.insert(key, handler);
        true
    }

    /// Handler for `key`, or the fallback
    pub fn get(&self, key: &K) -> &H {
        self.handlers.get(key).unwrap_or(&self.fallback)
    }

    /// Handler for `key` if one was registered
    pub fn get_registered(&self, key: &K) -> Option<&H> {
        self.handlers.get(key)
    }

    pub fn fallback(&self) -> &H {
        &self.fallback
    }

    pub fn contains(&self, key: &K) -> bool {
        self.handlers.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
