//! The error taxonomy every strategy and the container draws from.
//!
//! Errors are values, never exceptions: they travel inside a [`crate::strategy::Verdict`]
//! or as the direct `Err` of a registration call. See spec §7.

use crate::id::{ActionId, BoundaryId, GroupId, StrategyId, UniqueId};
use std::fmt;

/// Enough information to identify one live acquisition without exposing the
/// strategy-specific payload it carries. Carried by every error variant that
/// references "the existing" or "the victim" entry.
#[derive(Clone, PartialEq, Eq)]
pub struct LockInfoSummary {
    pub boundary: BoundaryId,
    pub action_id: ActionId,
    pub unique_id: UniqueId,
}

impl fmt::Debug for LockInfoSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockInfoSummary")
            .field("boundary", &self.boundary)
            .field("action_id", &self.action_id)
            .field("unique_id", &self.unique_id)
            .finish()
    }
}

/// Upper limit for a concurrency-limited group, or no limit at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyLimit {
    Unlimited,
    Limited(u32),
}

/// A leader's admission policy within a coordination group (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupPolicy {
    /// Admit only if the group has no active participants at all.
    EmptyGroup,
    /// Admit only if the group has no active members (other leaders ok).
    WithoutMembers,
    /// Admit only if the group has no active leader (members ok).
    WithoutLeader,
}

/// The full error taxonomy of the lock-coordination engine (spec §7).
///
/// Registration errors are returned directly from `register`/`register_all`.
/// Cancellation and preceding-cancellation errors are carried inside a
/// [`crate::strategy::Verdict`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LockmanError {
    #[error("strategy already registered: {id}")]
    StrategyAlreadyRegistered { id: StrategyId },

    #[error("strategy not registered: {id}")]
    StrategyNotRegistered { id: StrategyId },

    #[error("boundary already locked by {existing:?}")]
    BoundaryAlreadyLocked { existing: LockInfoSummary },

    #[error("action already running: {existing:?}")]
    ActionAlreadyRunning { existing: LockInfoSummary },

    #[error("blocked by lower priority request against {blocker:?}")]
    LowerPriorityBlocked { blocker: LockInfoSummary },

    #[error("same-priority conflict with {existing:?}")]
    SamePriorityConflict { existing: LockInfoSummary },

    #[error("higher priority request preempts {victim:?}")]
    HigherPriorityPreempts { victim: LockInfoSummary },

    #[error("replaced by equal-priority request, victim {victim:?}")]
    ReplacedByEqualPriority { victim: LockInfoSummary },

    #[error("leaders must be first to join a coordination group: {groups:?}")]
    LeaderCannotJoinNonEmptyGroup { groups: Vec<GroupId> },

    #[error("members cannot join an empty coordination group: {groups:?}")]
    MemberCannotJoinEmptyGroup { groups: Vec<GroupId> },

    #[error("action already participates in group {groups:?}: {existing:?}")]
    ActionAlreadyInGroup {
        existing: LockInfoSummary,
        groups: Vec<GroupId>,
    },

    #[error("blocked by exclusive leader policy {policy:?} in group {group:?}: {leader:?}")]
    BlockedByExclusiveLeader {
        leader: LockInfoSummary,
        group: GroupId,
        policy: GroupPolicy,
    },

    #[error("concurrency limit reached for group {group:?}: {count}/{limit:?}")]
    ConcurrencyLimitReached {
        group: GroupId,
        limit: ConcurrencyLimit,
        count: u32,
    },

    #[error("dynamic condition failed: {reason}")]
    DynamicConditionFailed { reason: String },
}

impl LockmanError {
    /// The preceding acquisition this error names for release, if this
    /// variant is one the coordinator (spec §4.10) must act on.
    #[must_use]
    pub fn victim(&self) -> Option<&LockInfoSummary> {
        match self {
            LockmanError::HigherPriorityPreempts { victim }
            | LockmanError::ReplacedByEqualPriority { victim } => Some(victim),
            _ => None,
        }
    }
}
