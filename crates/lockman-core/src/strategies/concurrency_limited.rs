//! Concurrency-limited strategy: admit up to a fixed count per
//! concurrency-group, no preemption (spec §4.6).

use crate::error::{ConcurrencyLimit, LockmanError};
use crate::id::{ActionId, BoundaryId, GroupId, StrategyId, UniqueId};
use crate::info::{LockInfo, LockInfoBase};
use crate::state::IndexedLockState;
use crate::strategy::{Strategy, Verdict};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcurrencyLimitedInfo {
    pub base: LockInfoBase,
    pub concurrency_group_id: GroupId,
    pub limit: ConcurrencyLimit,
}

impl ConcurrencyLimitedInfo {
    #[must_use]
    pub fn new(
        action_id: impl Into<ActionId>,
        concurrency_group_id: GroupId,
        limit: ConcurrencyLimit,
    ) -> Self {
        Self {
            base: LockInfoBase::new(StrategyId::from("concurrencyLimited"), action_id),
            concurrency_group_id,
            limit,
        }
    }
}

impl LockInfo for ConcurrencyLimitedInfo {
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

pub struct ConcurrencyLimitedStrategy {
    state:
        IndexedLockState<ConcurrencyLimitedInfo, GroupId, fn(&ConcurrencyLimitedInfo) -> GroupId>,
}

impl Default for ConcurrencyLimitedStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcurrencyLimitedStrategy {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: IndexedLockState::new(|info| info.concurrency_group_id.clone()),
        }
    }
}

impl ConcurrencyLimitedStrategy {
    /// Pure decision given the group's current occupant count. Shared by
    /// `can_lock` (reads a snapshot count) and `acquire` (reads the live
    /// count inside its own transaction).
    fn evaluate_with_count(info: &ConcurrencyLimitedInfo, count: usize) -> Verdict<LockmanError> {
        match info.limit {
            ConcurrencyLimit::Unlimited => Verdict::Success,
            ConcurrencyLimit::Limited(n) => {
                if count < n as usize {
                    Verdict::Success
                } else {
                    Verdict::Cancel(LockmanError::ConcurrencyLimitReached {
                        group: info.concurrency_group_id.clone(),
                        limit: ConcurrencyLimit::Limited(n),
                        count: count as u32,
                    })
                }
            }
        }
    }
}

impl Strategy for ConcurrencyLimitedStrategy {
    type Info = ConcurrencyLimitedInfo;
    type Error = LockmanError;

    fn can_lock(&self, boundary: &BoundaryId, info: &Self::Info) -> Verdict<Self::Error> {
        let count = self
            .state
            .active_lock_count(boundary, &info.concurrency_group_id);
        Self::evaluate_with_count(info, count)
    }

    fn lock(&self, boundary: &BoundaryId, info: &Self::Info) {
        self.state.add(boundary, info.clone());
    }

    fn acquire(&self, boundary: &BoundaryId, info: &Self::Info) -> Verdict<Self::Error> {
        self.state.transact(boundary, |index| {
            let count = index
                .by_key
                .get(&info.concurrency_group_id)
                .map_or(0, Vec::len);
            let verdict = Self::evaluate_with_count(info, count);
            if verdict.is_success() {
                index.insert(info.concurrency_group_id.clone(), info.clone());
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
        StrategyId::from("concurrencyLimited")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_the_limit_then_refuses() {
        let strategy = ConcurrencyLimitedStrategy::new();
        let b = BoundaryId::from_str("main");
        let group = GroupId::from_str("downloads");
        let make = || ConcurrencyLimitedInfo::new("dl", group.clone(), ConcurrencyLimit::Limited(2));

        let a = make();
        assert_eq!(strategy.can_lock(&b, &a), Verdict::Success);
        strategy.lock(&b, &a);

        let c = make();
        assert_eq!(strategy.can_lock(&b, &c), Verdict::Success);
        strategy.lock(&b, &c);

        let d = make();
        assert!(matches!(
            strategy.can_lock(&b, &d),
            Verdict::Cancel(LockmanError::ConcurrencyLimitReached { count: 2, .. })
        ));

        strategy.unlock(&b, &a);
        assert_eq!(strategy.can_lock(&b, &d), Verdict::Success);
    }

    #[test]
    fn unlimited_never_refuses() {
        let strategy = ConcurrencyLimitedStrategy::new();
        let b = BoundaryId::from_str("main");
        let group = GroupId::from_str("downloads");
        for _ in 0..50 {
            let info = ConcurrencyLimitedInfo::new("dl", group.clone(), ConcurrencyLimit::Unlimited);
            assert_eq!(strategy.can_lock(&b, &info), Verdict::Success);
            strategy.lock(&b, &info);
        }
    }
}
