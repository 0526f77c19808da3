//! Single-execution strategy: forbid concurrent executions of a given
//! action (spec §4.3).

use super::summarize;
use crate::error::LockmanError;
use crate::id::{ActionId, BoundaryId, StrategyId, UniqueId};
use crate::info::{LockInfo, LockInfoBase};
use crate::state::IndexedLockState;
use crate::strategy::{Strategy, Verdict};

/// The granularity at which a single-execution lock-info forbids
/// concurrent executions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Always admits; recorded for symmetry and diagnostics only.
    None,
    /// Admits iff the boundary currently holds no entry at all.
    Boundary,
    /// Admits iff the boundary holds no entry with the same action-id.
    Action,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleExecutionInfo {
    pub base: LockInfoBase,
    pub mode: ExecutionMode,
}

impl SingleExecutionInfo {
    #[must_use]
    pub fn new(action_id: impl Into<ActionId>, mode: ExecutionMode) -> Self {
        Self {
            base: LockInfoBase::new(StrategyId::from("singleExecution"), action_id),
            mode,
        }
    }
}

impl LockInfo for SingleExecutionInfo {
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

pub struct SingleExecutionStrategy {
    state: IndexedLockState<SingleExecutionInfo, ActionId, fn(&SingleExecutionInfo) -> ActionId>,
}

impl Default for SingleExecutionStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl SingleExecutionStrategy {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: IndexedLockState::new(|info| info.base.action_id.clone()),
        }
    }
}

impl SingleExecutionStrategy {
    /// Pure decision given whichever existing entry is relevant to `info`'s
    /// mode (the boundary's oldest entry, or the oldest entry sharing its
    /// action-id). Shared by `can_lock` (reads a snapshot) and `acquire`
    /// (reads the live index inside its own transaction).
    fn decide(
        existing: Option<&SingleExecutionInfo>,
        boundary: &BoundaryId,
        info: &SingleExecutionInfo,
    ) -> Verdict<LockmanError> {
        match info.mode {
            ExecutionMode::None => Verdict::Success,
            ExecutionMode::Boundary => match existing {
                Some(oldest) => Verdict::Cancel(LockmanError::BoundaryAlreadyLocked {
                    existing: summarize(boundary, oldest),
                }),
                None => Verdict::Success,
            },
            ExecutionMode::Action => match existing {
                Some(oldest) => Verdict::Cancel(LockmanError::ActionAlreadyRunning {
                    existing: summarize(boundary, oldest),
                }),
                None => Verdict::Success,
            },
        }
    }
}

impl Strategy for SingleExecutionStrategy {
    type Info = SingleExecutionInfo;
    type Error = LockmanError;

    fn can_lock(&self, boundary: &BoundaryId, info: &Self::Info) -> Verdict<Self::Error> {
        let existing = match info.mode {
            ExecutionMode::None => None,
            ExecutionMode::Boundary => self.state.current_locks(boundary).into_iter().next(),
            ExecutionMode::Action => self
                .state
                .current_locks_matching(boundary, &info.base.action_id)
                .into_iter()
                .next(),
        };
        Self::decide(existing.as_ref(), boundary, info)
    }

    fn lock(&self, boundary: &BoundaryId, info: &Self::Info) {
        self.state.add(boundary, info.clone());
    }

    fn acquire(&self, boundary: &BoundaryId, info: &Self::Info) -> Verdict<Self::Error> {
        self.state.transact(boundary, |index| {
            let existing = match info.mode {
                ExecutionMode::None => None,
                ExecutionMode::Boundary => index.order.first(),
                ExecutionMode::Action => index
                    .by_key
                    .get(&info.base.action_id)
                    .and_then(|bucket| bucket.first()),
            };
            let verdict = Self::decide(existing, boundary, info);
            if verdict.is_success() {
                index.insert(info.base.action_id.clone(), info.clone());
            }
            verdict
        })
    }

    fn unlock(&self, boundary: &BoundaryId, info: &Self::Info) {
        self.state.remove(boundary, info);
    }

    fn clean_up(&self) {
        self.state.remove_all();
    }

    fn clean_up_boundary(&self, boundary: &BoundaryId) {
        self.state.remove_all_boundary(boundary);
    }

    fn current_locks(&self) -> Vec<(BoundaryId, Vec<Self::Info>)> {
        self.state.all_active_locks().into_iter().collect()
    }

    fn strategy_id(&self) -> StrategyId {
        StrategyId::from("singleExecution")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_mode_blocks_any_second_entry() {
        let strategy = SingleExecutionStrategy::new();
        let b = BoundaryId::from_str("main");
        let nav = SingleExecutionInfo::new("nav", ExecutionMode::Boundary);
        assert_eq!(strategy.can_lock(&b, &nav), Verdict::Success);
        strategy.lock(&b, &nav);

        let refresh = SingleExecutionInfo::new("refresh", ExecutionMode::Boundary);
        let verdict = strategy.can_lock(&b, &refresh);
        assert!(verdict.is_cancel());
        assert!(matches!(
            verdict.error(),
            Some(LockmanError::BoundaryAlreadyLocked { .. })
        ));

        strategy.unlock(&b, &nav);
        assert_eq!(strategy.can_lock(&b, &refresh), Verdict::Success);
    }

    #[test]
    fn action_mode_only_blocks_same_action_id() {
        let strategy = SingleExecutionStrategy::new();
        let b = BoundaryId::from_str("main");
        let login = SingleExecutionInfo::new("login", ExecutionMode::Action);
        strategy.lock(&b, &login);

        let login2 = SingleExecutionInfo::new("login", ExecutionMode::Action);
        assert!(strategy.can_lock(&b, &login2).is_cancel());

        let logout = SingleExecutionInfo::new("logout", ExecutionMode::Action);
        assert_eq!(strategy.can_lock(&b, &logout), Verdict::Success);
    }

    #[test]
    fn none_mode_never_blocks_and_is_still_recorded() {
        let strategy = SingleExecutionStrategy::new();
        let b = BoundaryId::from_str("main");
        let a = SingleExecutionInfo::new("a", ExecutionMode::None);
        let c = SingleExecutionInfo::new("a", ExecutionMode::None);
        strategy.lock(&b, &a);
        assert_eq!(strategy.can_lock(&b, &c), Verdict::Success);
        strategy.lock(&b, &c);
        assert_eq!(strategy.state.total_active_lock_count(), 2);
    }

    #[test]
    fn round_trip_restores_state() {
        let strategy = SingleExecutionStrategy::new();
        let b = BoundaryId::from_str("main");
        let info = SingleExecutionInfo::new("nav", ExecutionMode::Boundary);
        assert_eq!(strategy.can_lock(&b, &info), Verdict::Success);
        strategy.lock(&b, &info);
        strategy.unlock(&b, &info);
        assert_eq!(strategy.state.total_active_lock_count(), 0);
    }
}
