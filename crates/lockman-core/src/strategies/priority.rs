//! Priority-based strategy: higher-priority acquisitions preempt
//! lower-priority ones; equal-priority conflicts are resolved by the
//! incoming entry's concurrency behavior (spec §4.4).

use super::summarize;
use crate::error::LockmanError;
use crate::id::{ActionId, BoundaryId, StrategyId, UniqueId};
use crate::info::{LockInfo, LockInfoBase};
use crate::strategy::{Strategy, Verdict};
use std::sync::Mutex;

/// How an entry behaves against another entry at the same priority tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyBehavior {
    /// Equal-priority collisions are refused.
    Exclusive,
    /// Equal-priority collisions preempt the existing entry.
    Replaceable,
}

/// Priority tier of an acquisition. `None` never blocks and is never
/// blocked; `Exclusive` is the top tier and conflicts with itself as if it
/// carried `ConcurrencyBehavior::Exclusive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    None,
    Low(ConcurrencyBehavior),
    High(ConcurrencyBehavior),
    Exclusive,
}

impl Priority {
    fn rank(self) -> u8 {
        match self {
            Priority::None => 0,
            Priority::Low(_) => 1,
            Priority::High(_) => 2,
            Priority::Exclusive => 3,
        }
    }

    fn behavior(self) -> ConcurrencyBehavior {
        match self {
            Priority::Low(b) | Priority::High(b) => b,
            Priority::Exclusive => ConcurrencyBehavior::Exclusive,
            Priority::None => ConcurrencyBehavior::Exclusive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityBasedInfo {
    pub base: LockInfoBase,
    pub priority: Priority,
}

impl PriorityBasedInfo {
    #[must_use]
    pub fn new(action_id: impl Into<ActionId>, priority: Priority) -> Self {
        Self {
            base: LockInfoBase::new(StrategyId::from("priorityBased"), action_id),
            priority,
        }
    }
}

impl LockInfo for PriorityBasedInfo {
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

/// `current_locks` per boundary, insertion-ordered. Priority's victim
/// selection needs to scan all entries for the current highest tier, which
/// doesn't fit `IndexedLockState`'s single-key model, so this strategy
/// keeps its own ordered store directly.
pub struct PriorityBasedStrategy {
    boundaries: Mutex<std::collections::HashMap<BoundaryId, Vec<PriorityBasedInfo>>>,
}

impl Default for PriorityBasedStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl PriorityBasedStrategy {
    #[must_use]
    pub fn new() -> Self {
        Self {
            boundaries: Mutex::new(std::collections::HashMap::new()),
        }
    }

    /// The boundary's current highest-priority holder, excluding `None`
    /// entries (which never hold the position). Ties broken by recency:
    /// the most recently acquired entry among those sharing the max rank.
    fn current_holder(&self, boundary: &BoundaryId) -> Option<PriorityBasedInfo> {
        let guard = self.boundaries.lock().expect("priority mutex poisoned");
        Self::holder_in(guard.get(boundary).map(Vec::as_slice).unwrap_or(&[]))
    }

    /// Pure version of [`Self::current_holder`] over an already-borrowed
    /// slice, so `acquire` can decide without a second mutex acquisition.
    fn holder_in(entries: &[PriorityBasedInfo]) -> Option<PriorityBasedInfo> {
        let max_rank = entries
            .iter()
            .filter(|e| !matches!(e.priority, Priority::None))
            .map(|e| e.priority.rank())
            .max()?;
        entries
            .iter()
            .filter(|e| e.priority.rank() == max_rank)
            .next_back()
            .cloned()
    }

    /// Pure decision against an already-determined holder. Shared by
    /// `can_lock` and `acquire`.
    fn evaluate(
        holder: Option<&PriorityBasedInfo>,
        boundary: &BoundaryId,
        info: &PriorityBasedInfo,
    ) -> Verdict<LockmanError> {
        if matches!(info.priority, Priority::None) {
            return Verdict::Success;
        }
        let Some(holder) = holder else {
            return Verdict::Success;
        };

        let (incoming_rank, holder_rank) = (info.priority.rank(), holder.priority.rank());
        if incoming_rank > holder_rank {
            Verdict::SuccessWithPrecedingCancellation(LockmanError::HigherPriorityPreempts {
                victim: summarize(boundary, holder),
            })
        } else if incoming_rank < holder_rank {
            Verdict::Cancel(LockmanError::LowerPriorityBlocked {
                blocker: summarize(boundary, holder),
            })
        } else {
            match info.priority.behavior() {
                ConcurrencyBehavior::Exclusive => Verdict::Cancel(LockmanError::SamePriorityConflict {
                    existing: summarize(boundary, holder),
                }),
                ConcurrencyBehavior::Replaceable => {
                    Verdict::SuccessWithPrecedingCancellation(LockmanError::ReplacedByEqualPriority {
                        victim: summarize(boundary, holder),
                    })
                }
            }
        }
    }
}

impl Strategy for PriorityBasedStrategy {
    type Info = PriorityBasedInfo;
    type Error = LockmanError;

    fn can_lock(&self, boundary: &BoundaryId, info: &Self::Info) -> Verdict<Self::Error> {
        let holder = self.current_holder(boundary);
        Self::evaluate(holder.as_ref(), boundary, info)
    }

    fn lock(&self, boundary: &BoundaryId, info: &Self::Info) {
        let mut guard = self.boundaries.lock().expect("priority mutex poisoned");
        guard.entry(boundary.clone()).or_default().push(info.clone());
    }

    fn acquire(&self, boundary: &BoundaryId, info: &Self::Info) -> Verdict<Self::Error> {
        let mut guard = self.boundaries.lock().expect("priority mutex poisoned");
        let entries = guard.entry(boundary.clone()).or_default();
        let holder = Self::holder_in(entries.as_slice());
        let verdict = Self::evaluate(holder.as_ref(), boundary, info);

        if let Verdict::SuccessWithPrecedingCancellation(err) = &verdict {
            if let Some(victim) = err.victim() {
                entries.retain(|e| e.unique_id() != victim.unique_id);
            }
        }
        if verdict.is_success() {
            entries.push(info.clone());
        }
        if entries.is_empty() {
            guard.remove(boundary);
        }
        verdict
    }

    fn unlock(&self, boundary: &BoundaryId, info: &Self::Info) {
        let mut guard = self.boundaries.lock().expect("priority mutex poisoned");
        if let Some(entries) = guard.get_mut(boundary) {
            entries.retain(|e| e.unique_id() != info.unique_id());
            if entries.is_empty() {
                guard.remove(boundary);
            }
        }
    }

    fn clean_up(&self) {
        self.boundaries.lock().expect("priority mutex poisoned").clear();
    }

    fn clean_up_boundary(&self, boundary: &BoundaryId) {
        self.boundaries
            .lock()
            .expect("priority mutex poisoned")
            .remove(boundary);
    }

    fn current_locks(&self) -> Vec<(BoundaryId, Vec<Self::Info>)> {
        self.boundaries
            .lock()
            .expect("priority mutex poisoned")
            .iter()
            .map(|(b, v)| (b.clone(), v.clone()))
            .collect()
    }

    fn strategy_id(&self) -> StrategyId {
        StrategyId::from("priorityBased")
    }
}
