//! Dynamic-condition: not a container-registered strategy but a pair of
//! predicate closures evaluated by the integration layer (spec §4.7).
//!
//! The core defines only the interface and the evaluation order
//! (reducer-level first, then action-level); it never stores per-boundary
//! state on their behalf, unlike the five container-registered strategies.

use crate::error::LockmanError;
use crate::strategy::Verdict;
use std::sync::Arc;

/// A synchronous, pure predicate over an immutable state snapshot and the
/// action being evaluated.
pub type DynamicPredicate<State, Action> =
    dyn Fn(&State, &Action) -> Verdict<LockmanError> + Send + Sync;

/// Evaluates the reducer-level predicate (if any) before the action-level
/// one (if any), short-circuiting on the first `Cancel`.
pub struct DynamicConditionEvaluator<State, Action> {
    reducer_level: Option<Arc<DynamicPredicate<State, Action>>>,
}

impl<State, Action> Default for DynamicConditionEvaluator<State, Action> {
    fn default() -> Self {
        Self {
            reducer_level: None,
        }
    }
}

impl<State, Action> Clone for DynamicConditionEvaluator<State, Action> {
    fn clone(&self) -> Self {
        Self {
            reducer_level: self.reducer_level.clone(),
        }
    }
}

impl<State, Action> DynamicConditionEvaluator<State, Action> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_reducer_level(predicate: Arc<DynamicPredicate<State, Action>>) -> Self {
        Self {
            reducer_level: Some(predicate),
        }
    }

    /// Evaluate reducer-level then (if still admitted) action-level,
    /// per spec §4.7's fixed evaluation order.
    pub fn evaluate(
        &self,
        state: &State,
        action: &Action,
        action_level: Option<&DynamicPredicate<State, Action>>,
    ) -> Verdict<LockmanError> {
        if let Some(reducer) = &self.reducer_level {
            let verdict = reducer(state, action);
            if verdict.is_cancel() {
                return verdict;
            }
        }
        match action_level {
            Some(predicate) => predicate(state, action),
            None => Verdict::Success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reducer_level_short_circuits_action_level() {
        let evaluator: DynamicConditionEvaluator<(), ()> =
            DynamicConditionEvaluator::with_reducer_level(Arc::new(|_, _| {
                Verdict::Cancel(LockmanError::DynamicConditionFailed {
                    reason: "reducer says no".into(),
                })
            }));

        let action_level_called = std::sync::atomic::AtomicBool::new(false);
        let verdict = evaluator.evaluate(&(), &(), Some(&|_, _| {
            action_level_called.store(true, std::sync::atomic::Ordering::SeqCst);
            Verdict::Success
        }));

        assert!(verdict.is_cancel());
        assert!(!action_level_called.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn action_level_runs_when_reducer_admits() {
        let evaluator: DynamicConditionEvaluator<(), ()> = DynamicConditionEvaluator::new();
        let verdict = evaluator.evaluate(&(), &(), Some(&|_, _| {
            Verdict::Cancel(LockmanError::DynamicConditionFailed {
                reason: "action says no".into(),
            })
        }));
        assert!(verdict.is_cancel());
    }

    #[test]
    fn no_predicates_admits() {
        let evaluator: DynamicConditionEvaluator<(), ()> = DynamicConditionEvaluator::new();
        assert_eq!(evaluator.evaluate(&(), &(), None), Verdict::Success);
    }
}
