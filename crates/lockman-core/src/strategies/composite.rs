//! Composite strategy: serial AND-composition of 2-5 child strategies with
//! early abort and LIFO release (spec §4.8).
//!
//! Children may have different `Info` types, so composition goes through a
//! small type-erasure layer (`ErasedStrategy`) rather than a generic tuple:
//! Rust has no first-class way to store "the 2nd of these N differently-typed
//! strategies" without either an enum closed over a fixed strategy set or
//! erasure. Erasure was chosen so composites can wrap any `Strategy`,
//! including another composite.

use crate::error::LockmanError;
use crate::id::{ActionId, BoundaryId, StrategyId, UniqueId};
use crate::info::{LockInfo, LockInfoBase};
use crate::strategy::{Strategy, Verdict};
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Object-safe, type-erased view of a [`Strategy`] whose error type is
/// [`LockmanError`]. Every concrete strategy in this crate gets this for
/// free via the blanket impl below.
pub trait ErasedStrategy: Send + Sync {
    fn can_lock_erased(
        &self,
        boundary: &BoundaryId,
        info: &(dyn Any + Send + Sync),
    ) -> Verdict<LockmanError>;
    fn lock_erased(&self, boundary: &BoundaryId, info: &(dyn Any + Send + Sync));
    fn unlock_erased(&self, boundary: &BoundaryId, info: &(dyn Any + Send + Sync));
    fn unlock_by_unique_id_erased(&self, boundary: &BoundaryId, unique_id: UniqueId);
    fn clean_up_erased(&self);
    fn clean_up_boundary_erased(&self, boundary: &BoundaryId);
    fn strategy_id_erased(&self) -> StrategyId;
}

impl<S> ErasedStrategy for S
where
    S: Strategy<Error = LockmanError>,
    S::Info: 'static,
{
    fn can_lock_erased(
        &self,
        boundary: &BoundaryId,
        info: &(dyn Any + Send + Sync),
    ) -> Verdict<LockmanError> {
        let info = info
            .downcast_ref::<S::Info>()
            .expect("composite info/strategy type mismatch");
        self.can_lock(boundary, info)
    }

    fn lock_erased(&self, boundary: &BoundaryId, info: &(dyn Any + Send + Sync)) {
        let info = info
            .downcast_ref::<S::Info>()
            .expect("composite info/strategy type mismatch");
        self.lock(boundary, info);
    }

    fn unlock_erased(&self, boundary: &BoundaryId, info: &(dyn Any + Send + Sync)) {
        let info = info
            .downcast_ref::<S::Info>()
            .expect("composite info/strategy type mismatch");
        self.unlock(boundary, info);
    }

    fn unlock_by_unique_id_erased(&self, boundary: &BoundaryId, unique_id: UniqueId) {
        Strategy::unlock_by_unique_id(self, boundary, unique_id);
    }

    fn clean_up_erased(&self) {
        Strategy::clean_up(self);
    }

    fn clean_up_boundary_erased(&self, boundary: &BoundaryId) {
        Strategy::clean_up_boundary(self, boundary);
    }

    fn strategy_id_erased(&self) -> StrategyId {
        Strategy::strategy_id(self)
    }
}

/// One composite acquisition: a common identity plus one erased payload per
/// child strategy, in child order.
#[derive(Clone)]
pub struct CompositeInfo {
    pub base: LockInfoBase,
    payloads: Vec<Arc<dyn Any + Send + Sync>>,
}

impl PartialEq for CompositeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base
    }
}
impl Eq for CompositeInfo {}

impl CompositeInfo {
    #[must_use]
    pub fn new(
        action_id: impl Into<ActionId>,
        child_strategy_ids: &[StrategyId],
        payloads: Vec<Arc<dyn Any + Send + Sync>>,
    ) -> Self {
        debug_assert_eq!(child_strategy_ids.len(), payloads.len());
        Self {
            base: LockInfoBase::new(StrategyId::composite(child_strategy_ids), action_id),
            payloads,
        }
    }
}

impl LockInfo for CompositeInfo {
    fn strategy_id(&self) -> StrategyId {
        self.base.strategy_id.clone()
    }
    fn action_id(&self) -> &ActionId {
        &self.base.action_id
    }
    fn unique_id(&self) -> UniqueId {
        self.base.unique_id
    }
    fn is_cancellable(&self) -> bool {
        self.base.cancellable
    }
}

/// Serial AND-composition of 2-5 child strategies (spec §4.8).
pub struct CompositeStrategy {
    children: Vec<Arc<dyn ErasedStrategy>>,
    strategy_id: StrategyId,
    /// Bookkeeping of full composite acquisitions per boundary, used only
    /// for `current_locks`' debug snapshot (spec §4.8: "merge per-boundary
    /// entry lists across children"); children already keep their own
    /// authoritative per-child state.
    own_order: Mutex<HashMap<BoundaryId, Vec<CompositeInfo>>>,
}

impl CompositeStrategy {
    #[must_use]
    pub fn new(children: Vec<Arc<dyn ErasedStrategy>>) -> Self {
        debug_assert!(
            (2..=5).contains(&children.len()),
            "composite strategies take 2-5 children, got {}",
            children.len()
        );
        let ids: Vec<StrategyId> = children.iter().map(|c| c.strategy_id_erased()).collect();
        Self {
            children,
            strategy_id: StrategyId::composite(&ids),
            own_order: Mutex::new(HashMap::new()),
        }
    }
}

impl CompositeStrategy {
    /// The AND-across-children evaluation, stopping at the first `Cancel`
    /// and remembering the first preceding-cancellation victim. Shared by
    /// `can_lock` and `acquire`.
    fn evaluate_children(&self, boundary: &BoundaryId, info: &CompositeInfo) -> Verdict<LockmanError> {
        debug_assert_eq!(self.children.len(), info.payloads.len());
        let mut preceding: Option<LockmanError> = None;
        for (child, payload) in self.children.iter().zip(info.payloads.iter()) {
            match child.can_lock_erased(boundary, payload.as_ref()) {
                Verdict::Cancel(e) => return Verdict::Cancel(e),
                Verdict::SuccessWithPrecedingCancellation(e) => {
                    if preceding.is_none() {
                        preceding = Some(e);
                    }
                }
                Verdict::Success => {}
            }
        }
        match preceding {
            Some(e) => Verdict::SuccessWithPrecedingCancellation(e),
            None => Verdict::Success,
        }
    }

    /// Commits `info` into every child, in child order. Does not touch
    /// `own_order`; callers append the composite-level bookkeeping entry
    /// themselves.
    fn commit_children(&self, boundary: &BoundaryId, info: &CompositeInfo) {
        for (child, payload) in self.children.iter().zip(info.payloads.iter()) {
            child.lock_erased(boundary, payload.as_ref());
        }
    }
}

impl Strategy for CompositeStrategy {
    type Info = CompositeInfo;
    type Error = LockmanError;

    fn can_lock(&self, boundary: &BoundaryId, info: &Self::Info) -> Verdict<Self::Error> {
        self.evaluate_children(boundary, info)
    }

    fn lock(&self, boundary: &BoundaryId, info: &Self::Info) {
        self.commit_children(boundary, info);
        self.own_order
            .lock()
            .expect("composite mutex poisoned")
            .entry(boundary.clone())
            .or_default()
            .push(info.clone());
    }

    /// Holds `own_order`'s guard for the whole evaluate→victim-release→
    /// commit sequence, serializing concurrent `acquire` calls against this
    /// composite instance even though `own_order` is otherwise just a
    /// bookkeeping structure.
    fn acquire(&self, boundary: &BoundaryId, info: &Self::Info) -> Verdict<Self::Error> {
        let mut guard = self.own_order.lock().expect("composite mutex poisoned");
        let verdict = self.evaluate_children(boundary, info);

        if let Verdict::SuccessWithPrecedingCancellation(err) = &verdict {
            if let Some(victim) = err.victim() {
                for child in &self.children {
                    child.unlock_by_unique_id_erased(&victim.boundary, victim.unique_id);
                }
                if let Some(entries) = guard.get_mut(&victim.boundary) {
                    entries.retain(|e| e.unique_id() != victim.unique_id);
                    if entries.is_empty() {
                        guard.remove(&victim.boundary);
                    }
                }
            }
        }
        if verdict.is_success() {
            self.commit_children(boundary, info);
            guard.entry(boundary.clone()).or_default().push(info.clone());
        }
        verdict
    }

    fn unlock(&self, boundary: &BoundaryId, info: &Self::Info) {
        for (child, payload) in self.children.iter().zip(info.payloads.iter()).rev() {
            child.unlock_erased(boundary, payload.as_ref());
        }
        let mut guard = self.own_order.lock().expect("composite mutex poisoned");
        if let Some(entries) = guard.get_mut(boundary) {
            entries.retain(|e| e.unique_id() != info.unique_id());
            if entries.is_empty() {
                guard.remove(boundary);
            }
        }
    }

    /// Overridden so a victim named by any child strategy is released
    /// through that child directly; `remove` is a no-op wherever the
    /// unique-id isn't present, so broadcasting is safe.
    fn unlock_by_unique_id(&self, boundary: &BoundaryId, unique_id: UniqueId) {
        for child in &self.children {
            child.unlock_by_unique_id_erased(boundary, unique_id);
        }
        let mut guard = self.own_order.lock().expect("composite mutex poisoned");
        if let Some(entries) = guard.get_mut(boundary) {
            entries.retain(|e| e.unique_id() != unique_id);
            if entries.is_empty() {
                guard.remove(boundary);
            }
        }
    }

    fn clean_up(&self) {
        for child in &self.children {
            child.clean_up_erased();
        }
        self.own_order.lock().expect("composite mutex poisoned").clear();
    }

    fn clean_up_boundary(&self, boundary: &BoundaryId) {
        for child in &self.children {
            child.clean_up_boundary_erased(boundary);
        }
        self.own_order
            .lock()
            .expect("composite mutex poisoned")
            .remove(boundary);
    }

    fn current_locks(&self) -> Vec<(BoundaryId, Vec<Self::Info>)> {
        self.own_order
            .lock()
            .expect("composite mutex poisoned")
            .iter()
            .map(|(b, v)| (b.clone(), v.clone()))
            .collect()
    }

    fn strategy_id(&self) -> StrategyId {
        self.strategy_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::single_execution::{ExecutionMode, SingleExecutionInfo, SingleExecutionStrategy};
    use crate::strategies::priority::{ConcurrencyBehavior, Priority, PriorityBasedInfo, PriorityBasedStrategy};

    fn composite_of_single_and_priority() -> (CompositeStrategy, StrategyId, StrategyId) {
        let single = Arc::new(SingleExecutionStrategy::new());
        let priority = Arc::new(PriorityBasedStrategy::new());
        let single_id = single.strategy_id();
        let priority_id = priority.strategy_id();
        let composite = CompositeStrategy::new(vec![single, priority]);
        (composite, single_id, priority_id)
    }

    #[test]
    fn early_abort_never_queries_second_child() {
        let (composite, _single_id, _priority_id) = composite_of_single_and_priority();
        let b = BoundaryId::from_str("main");

        let first_single = SingleExecutionInfo::new("first", ExecutionMode::Boundary);
        let first_priority = PriorityBasedInfo::new("first", Priority::Low(ConcurrencyBehavior::Exclusive));
        let first = CompositeInfo::new(
            "first",
            &[StrategyId::from("singleExecution"), StrategyId::from("priorityBased")],
            vec![Arc::new(first_single), Arc::new(first_priority)],
        );
        assert_eq!(composite.can_lock(&b, &first), Verdict::Success);
        composite.lock(&b, &first);

        // second child would admit (different priority tier), but the first
        // child must already refuse and short-circuit.
        let second_single = SingleExecutionInfo::new("second", ExecutionMode::Boundary);
        let second_priority =
            PriorityBasedInfo::new("second", Priority::Exclusive);
        let second = CompositeInfo::new(
            "second",
            &[StrategyId::from("singleExecution"), StrategyId::from("priorityBased")],
            vec![Arc::new(second_single), Arc::new(second_priority)],
        );
        assert!(matches!(
            composite.can_lock(&b, &second),
            Verdict::Cancel(LockmanError::BoundaryAlreadyLocked { .. })
        ));
    }

    #[test]
    fn unlock_releases_children_in_reverse_order() {
        let (composite, _s, _p) = composite_of_single_and_priority();
        let b = BoundaryId::from_str("main");
        let single_info = SingleExecutionInfo::new("a", ExecutionMode::Action);
        let priority_info = PriorityBasedInfo::new("a", Priority::Low(ConcurrencyBehavior::Exclusive));
        let info = CompositeInfo::new(
            "a",
            &[StrategyId::from("singleExecution"), StrategyId::from("priorityBased")],
            vec![Arc::new(single_info), Arc::new(priority_info)],
        );
        composite.lock(&b, &info);
        composite.unlock(&b, &info);
        assert!(composite.current_locks().is_empty());
    }

    #[test]
    fn composite_id_concatenates_children() {
        let (composite, single_id, priority_id) = composite_of_single_and_priority();
        assert_eq!(
            composite.strategy_id().as_str(),
            format!("Composite2:{}+{}", single_id.as_str(), priority_id.as_str())
        );
    }
}
