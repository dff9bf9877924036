//! Name to function lookup used by the query parser.

use crate::expression::FunctionKind;
use log::debug;
use std::collections::HashMap;
use std::sync::OnceLock;

static GLOBAL_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// Maps function names to their kinds.
///
/// Registration never overwrites: the first definition of a name wins and
/// later conflicting definitions are ignored.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionKind>,
}

impl FunctionRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding every built-in function under its canonical name
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for kind in FunctionKind::ALL {
            registry.register_if_absent(kind.name(), *kind);
        }
        registry
    }

    /// Process-wide standard registry, built on first use
    pub fn global() -> &'static FunctionRegistry {
        GLOBAL_REGISTRY.get_or_init(Self::standard)
    }

    /// Register `kind` under `name` unless the name is taken.
    ///
    /// Returns true if the name was newly registered.
    pub fn register_if_absent(&mut self, name: &str, kind: FunctionKind) -> bool {
        let key = name.to_ascii_lowercase();
        match self.functions.get(&key) {
            Some(existing) => {
                if *existing != kind {
                    debug!(
                        "function {} already registered as {:?}, ignoring {:?}",
                        key, existing, kind
                    );
                }
                false
            }
            None => {
                self.functions.insert(key, kind);
                true
            }
        }
    }

    /// Case-insensitive lookup
    pub fn lookup(&self, name: &str) -> Option<FunctionKind> {
        self.functions.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry() {
        let registry = FunctionRegistry::standard();
        assert_eq!(registry.len(), FunctionKind::ALL.len());
        assert_eq!(registry.lookup("floor"), Some(FunctionKind::Floor));
        assert_eq!(registry.lookup("SubstringOf"), Some(FunctionKind::SubstringOf));
        assert_eq!(registry.lookup("nosuch"), None);
    }

    #[test]
    fn test_first_registration_wins() {
        let mut registry = FunctionRegistry::empty();
        assert!(registry.register_if_absent("ceil", FunctionKind::Ceiling));
        assert!(!registry.register_if_absent("CEIL", FunctionKind::Floor));
        assert_eq!(registry.lookup("ceil"), Some(FunctionKind::Ceiling));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_global_is_shared() {
        let a = FunctionRegistry::global() as *const FunctionRegistry;
        let b = FunctionRegistry::global() as *const FunctionRegistry;
        assert_eq!(a, b);
        assert!(FunctionRegistry::global().contains("st_equals"));
    }
}
