//! Subscription matching for change events.
//!
//! Each subscription pairs a topic with a compiled `$filter`. Compiled
//! filters are shared between subscriptions through a cache keyed by
//! canonical text, so many subscribers with the same filter compile it once.

use crate::config::EngineConfig;
use crate::expression::{fold, ExpressionResult, Expression, TypeChecker};
use crate::filter::{self, Entity};
use crate::model::EntityModel;
use crate::query::parse_filter;
use dashmap::DashMap;
use log::{debug, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub type SubscriptionId = u64;

#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub topic: String,
    pub filter: Arc<Expression>,
}

pub struct SubscriptionSet {
    subscriptions: DashMap<SubscriptionId, Subscription>,
    compiled: DashMap<String, Arc<Expression>>,
    next_id: AtomicU64,
    model: Option<EntityModel>,
    config: EngineConfig,
}

impl SubscriptionSet {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            subscriptions: DashMap::new(),
            compiled: DashMap::new(),
            next_id: AtomicU64::new(1),
            model: None,
            config,
        }
    }

    /// Validate filters against `model` when subscribing
    pub fn with_model(mut self, model: EntityModel) -> Self {
        self.model = Some(model);
        self
    }

    /// Register a filter for `topic`, returning the new subscription's id.
    ///
    /// Fails if the filter does not parse or type check; nothing is
    /// registered in that case.
    pub fn subscribe(&self, topic: &str, filter_text: &str) -> ExpressionResult<SubscriptionId> {
        let filter = self.compile(filter_text)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscriptions.insert(
            id,
            Subscription {
                id,
                topic: topic.to_string(),
                filter,
            },
        );
        debug!("subscription {} on {} registered", id, topic);
        Ok(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscriptions.remove(&id).is_some()
    }

    pub fn get(&self, id: SubscriptionId) -> Option<Subscription> {
        self.subscriptions.get(&id).map(|entry| entry.value().clone())
    }

    /// Ids of the subscriptions on `topic` whose filter matches `entity`, sorted
    pub fn matching<E: Entity + ?Sized>(&self, topic: &str, entity: &E) -> Vec<SubscriptionId> {
        let mut ids: Vec<SubscriptionId> = self
            .subscriptions
            .iter()
            .filter(|entry| entry.topic == topic)
            .filter_map(|entry| match filter::matches(&entry.filter, entity) {
                Ok(true) => Some(entry.id),
                Ok(false) => None,
                Err(err) => {
                    warn!("subscription {} filter failed: {}", entry.id, err);
                    None
                }
            })
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Number of distinct compiled filters held in the cache
    pub fn compiled_count(&self) -> usize {
        self.compiled.len()
    }

    fn compile(&self, filter_text: &str) -> ExpressionResult<Arc<Expression>> {
        let parsed = parse_filter(filter_text)?;
        let key = parsed.to_canonical_text();
        if let Some(cached) = self.compiled.get(&key) {
            return Ok(Arc::clone(cached.value()));
        }

        let checker = match &self.model {
            Some(model) => TypeChecker::with_model(model).strict_paths(self.config.strict_paths),
            None => TypeChecker::new(),
        };
        checker.check_filter_predicate(&parsed)?;

        let compiled = if self.config.fold_constants {
            Arc::new(fold(&parsed)?)
        } else {
            Arc::new(parsed)
        };

        if self.compiled.len() < self.config.compile_cache_capacity {
            self.compiled.insert(key, Arc::clone(&compiled));
        } else {
            debug!("compile cache full, not caching {}", key);
        }
        Ok(compiled)
    }
}

impl Default for SubscriptionSet {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::ConstantKind;
    use crate::expression::ExpressionError;
    use serde_json::json;

    #[test]
    fn test_matching() {
        let set = SubscriptionSet::default();
        let warm = set.subscribe("Observations", "result gt 20").unwrap();
        let cold = set.subscribe("Observations", "result lt 5").unwrap();
        let other = set.subscribe("Things", "result gt 20").unwrap();

        assert_eq!(set.matching("Observations", &json!({"result": 21.5})), vec![warm]);
        assert_eq!(set.matching("Observations", &json!({"result": 1})), vec![cold]);
        assert_eq!(set.matching("Things", &json!({"result": 30})), vec![other]);
        assert!(set.matching("Observations", &json!({})).is_empty());

        assert!(set.unsubscribe(warm));
        assert!(!set.unsubscribe(warm));
        assert!(set.matching("Observations", &json!({"result": 21.5})).is_empty());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_compile_cache_shares_filters() {
        let set = SubscriptionSet::default();
        let a = set.subscribe("t", "result gt 20").unwrap();
        let b = set.subscribe("t", "(result gt 20)").unwrap();
        assert_eq!(set.compiled_count(), 1);
        assert!(Arc::ptr_eq(&set.get(a).unwrap().filter, &set.get(b).unwrap().filter));
    }

    #[test]
    fn test_cache_capacity() {
        let config = EngineConfig {
            compile_cache_capacity: 1,
            ..EngineConfig::default()
        };
        let set = SubscriptionSet::new(config);
        set.subscribe("t", "a eq 1").unwrap();
        set.subscribe("t", "a eq 2").unwrap();
        assert_eq!(set.compiled_count(), 1);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_invalid_filters_rejected() {
        let model = EntityModel::new("Observation").with_property("result", ConstantKind::Double);
        let set = SubscriptionSet::default().with_model(model);

        assert!(matches!(
            set.subscribe("t", "missing eq 1"),
            Err(ExpressionError::UnknownPath { .. })
        ));
        assert!(matches!(
            set.subscribe("t", "result le 'a'"),
            Err(ExpressionError::IncompatibleTypes { .. })
        ));
        assert!(matches!(
            set.subscribe("t", "result add 1"),
            Err(ExpressionError::IncompatibleTypes { .. })
        ));
        assert!(set.is_empty());
    }

    #[test]
    fn test_concurrent_matching() {
        let set = SubscriptionSet::default();
        for threshold in 0..10 {
            set.subscribe("t", &format!("result ge {}", threshold)).unwrap();
        }

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let set = &set;
                    scope.spawn(move || set.matching("t", &json!({"result": i * 3})).len())
                })
                .collect();
            let counts: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            assert_eq!(counts, vec![1, 4, 7, 10]);
        });
    }
}
