//! Strategy container: type-safe registration and resolution keyed by
//! strategy-id, with duplicate detection and introspection (spec §4.9).

use crate::error::LockmanError;
use crate::id::StrategyId;
use crate::strategies::ErasedStrategy;
use crate::strategy::Strategy;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

struct Entry {
    strategy: Arc<dyn ErasedStrategy>,
    registered_at: Instant,
}

/// Introspection record for one registered strategy.
#[derive(Debug, Clone, Copy)]
pub struct StrategyRegistrationInfo {
    pub registered_at: Instant,
}

/// Registration and resolution of strategies by [`StrategyId`].
///
/// Reads (`resolve`, `is_registered`, introspection) are cheap and frequent;
/// mutations (`register`, `unregister`) are rare, so the container uses a
/// reader/writer lock rather than a plain mutex (spec §4.9: "internal
/// reader/writer discipline; reads are cheap; mutations are rare and
/// serialized").
pub struct StrategyContainer {
    entries: RwLock<HashMap<StrategyId, Entry>>,
}

impl Default for StrategyContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl StrategyContainer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `strategy` under its own [`Strategy::strategy_id`].
    /// Rejects duplicates with [`LockmanError::StrategyAlreadyRegistered`].
    pub fn register<S>(&self, strategy: S) -> Result<(), LockmanError>
    where
        S: Strategy<Error = LockmanError> + 'static,
        S::Info: 'static,
    {
        self.register_erased(Arc::new(strategy))
    }

    /// Registers an already-erased strategy handle directly; used when the
    /// caller already has an `Arc<dyn ErasedStrategy>` (e.g. a composite's
    /// children).
    pub fn register_erased(&self, strategy: Arc<dyn ErasedStrategy>) -> Result<(), LockmanError> {
        let id = strategy.strategy_id_erased();
        let mut entries = self.entries.write().expect("container lock poisoned");
        if entries.contains_key(&id) {
            return Err(LockmanError::StrategyAlreadyRegistered { id });
        }
        entries.insert(
            id,
            Entry {
                strategy,
                registered_at: Instant::now(),
            },
        );
        Ok(())
    }

    /// Registers every strategy in `strategies`, atomically with respect to
    /// duplicate detection: if any id conflicts with an already-registered
    /// strategy or with another entry in the same batch, no entry in the
    /// batch is registered.
    pub fn register_all(
        &self,
        strategies: Vec<Arc<dyn ErasedStrategy>>,
    ) -> Result<(), LockmanError> {
        let mut entries = self.entries.write().expect("container lock poisoned");
        let mut seen = std::collections::HashSet::new();
        for strategy in &strategies {
            let id = strategy.strategy_id_erased();
            if entries.contains_key(&id) {
                return Err(LockmanError::StrategyAlreadyRegistered { id });
            }
            if !seen.insert(id.clone()) {
                return Err(LockmanError::StrategyAlreadyRegistered { id });
            }
        }
        let now = Instant::now();
        for strategy in strategies {
            let id = strategy.strategy_id_erased();
            entries.insert(
                id,
                Entry {
                    strategy,
                    registered_at: now,
                },
            );
        }
        Ok(())
    }

    /// Resolves the strategy registered under `id`, or
    /// [`LockmanError::StrategyNotRegistered`].
    pub fn resolve(&self, id: &StrategyId) -> Result<Arc<dyn ErasedStrategy>, LockmanError> {
        let entries = self.entries.read().expect("container lock poisoned");
        entries
            .get(id)
            .map(|e| e.strategy.clone())
            .ok_or_else(|| LockmanError::StrategyNotRegistered { id: id.clone() })
    }

    #[must_use]
    pub fn is_registered(&self, id: &StrategyId) -> bool {
        self.entries
            .read()
            .expect("container lock poisoned")
            .contains_key(id)
    }

    /// Sorted list of registered strategy ids.
    #[must_use]
    pub fn registered_strategy_ids(&self) -> Vec<StrategyId> {
        let entries = self.entries.read().expect("container lock poisoned");
        let mut ids: Vec<StrategyId> = entries.keys().cloned().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    #[must_use]
    pub fn registered_strategy_info(&self) -> HashMap<StrategyId, StrategyRegistrationInfo> {
        let entries = self.entries.read().expect("container lock poisoned");
        entries
            .iter()
            .map(|(id, e)| {
                (
                    id.clone(),
                    StrategyRegistrationInfo {
                        registered_at: e.registered_at,
                    },
                )
            })
            .collect()
    }

    #[must_use]
    pub fn strategy_count(&self) -> usize {
        self.entries.read().expect("container lock poisoned").len()
    }

    #[must_use]
    pub fn get_all_strategies(&self) -> Vec<Arc<dyn ErasedStrategy>> {
        self.entries
            .read()
            .expect("container lock poisoned")
            .values()
            .map(|e| e.strategy.clone())
            .collect()
    }

    /// Removes the strategy registered under `id`. Returns whether one was
    /// removed.
    pub fn unregister(&self, id: &StrategyId) -> bool {
        self.entries
            .write()
            .expect("container lock poisoned")
            .remove(id)
            .is_some()
    }

    pub fn remove_all_strategies(&self) {
        self.entries.write().expect("container lock poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::SingleExecutionStrategy;

    #[test]
    fn duplicate_registration_is_rejected() {
        let container = StrategyContainer::new();
        container.register(SingleExecutionStrategy::new()).unwrap();
        let err = container.register(SingleExecutionStrategy::new()).unwrap_err();
        assert!(matches!(err, LockmanError::StrategyAlreadyRegistered { .. }));
    }

    #[test]
    fn register_all_is_atomic_on_conflict() {
        let container = StrategyContainer::new();
        container.register(SingleExecutionStrategy::new()).unwrap();

        let batch: Vec<Arc<dyn ErasedStrategy>> = vec![
            Arc::new(crate::strategies::PriorityBasedStrategy::new()),
            Arc::new(SingleExecutionStrategy::new()),
        ];
        let err = container.register_all(batch).unwrap_err();
        assert!(matches!(err, LockmanError::StrategyAlreadyRegistered { .. }));
        assert!(!container.is_registered(&StrategyId::from("priorityBased")));
    }

    #[test]
    fn resolve_unknown_id_errors() {
        let container = StrategyContainer::new();
        let err = container.resolve(&StrategyId::from("nope")).unwrap_err();
        assert!(matches!(err, LockmanError::StrategyNotRegistered { .. }));
    }

    #[test]
    fn unregister_reports_whether_something_was_removed() {
        let container = StrategyContainer::new();
        container.register(SingleExecutionStrategy::new()).unwrap();
        assert!(container.unregister(&StrategyId::from("singleExecution")));
        assert!(!container.unregister(&StrategyId::from("singleExecution")));
    }
}
