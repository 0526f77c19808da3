//! The concrete strategies (spec §4.3-4.7) plus their serial composition
//! (spec §4.8).

pub mod composite;
pub mod concurrency_limited;
pub mod dynamic_condition;
pub mod group_coordination;
pub mod priority;
pub mod single_execution;

pub use composite::{CompositeInfo, CompositeStrategy, ErasedStrategy};
pub use concurrency_limited::{ConcurrencyLimitedInfo, ConcurrencyLimitedStrategy};
pub use dynamic_condition::{DynamicConditionEvaluator, DynamicPredicate};
pub use group_coordination::{GroupCoordinationInfo, GroupCoordinationStrategy, GroupRole};
pub use priority::{ConcurrencyBehavior, Priority, PriorityBasedInfo, PriorityBasedStrategy};
pub use single_execution::{ExecutionMode, SingleExecutionInfo, SingleExecutionStrategy};

use crate::error::LockInfoSummary;
use crate::id::BoundaryId;
use crate::info::LockInfo;

/// Build the [`LockInfoSummary`] carried by a cancellation error for `info`
/// inside `boundary`.
pub(crate) fn summarize<Info: LockInfo>(boundary: &BoundaryId, info: &Info) -> LockInfoSummary {
    LockInfoSummary {
        boundary: boundary.clone(),
        action_id: info.action_id().clone(),
        unique_id: info.unique_id(),
    }
}
