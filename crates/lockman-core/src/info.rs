//! The lock-info contract: the record a strategy stores per acquisition
//! (spec §3, "Lock-info (polymorphic over strategy)").

use crate::id::{ActionId, StrategyId, UniqueId};

/// Every strategy's info payload implements this so the generic
/// [`crate::state::IndexedLockState`] can order, key, and release entries
/// without knowing the strategy-specific fields.
pub trait LockInfo: Clone {
    /// The strategy this entry belongs to.
    fn strategy_id(&self) -> StrategyId;

    /// The action kind this acquisition names. Not unique.
    fn action_id(&self) -> &ActionId;

    /// The sole identity used to target a specific acquisition for release.
    fn unique_id(&self) -> UniqueId;

    /// Whether the caller has opted this acquisition into being named as a
    /// preceding-cancellation victim. Defaults to `true` per spec §3.
    fn is_cancellable(&self) -> bool {
        true
    }
}

/// Fields common to every strategy's lock-info (spec §3). Strategies embed
/// this and add their own payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockInfoBase {
    pub strategy_id: StrategyId,
    pub action_id: ActionId,
    pub unique_id: UniqueId,
    pub cancellable: bool,
}

impl LockInfoBase {
    #[must_use]
    pub fn new(strategy_id: StrategyId, action_id: impl Into<ActionId>) -> Self {
        Self {
            strategy_id,
            action_id: action_id.into(),
            unique_id: UniqueId::generate(),
            cancellable: true,
        }
    }

    #[must_use]
    pub fn cancellable(mut self, value: bool) -> Self {
        self.cancellable = value;
        self
    }
}
