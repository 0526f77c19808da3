//! # lockman-core
//!
//! A process-local lock-coordination engine: admission-control strategies
//! that decide, for a given boundary and action, whether a new unit of work
//! may start, must wait its turn behind the answer to someone else's
//! in-flight work, or must first force that work to stop.
//!
//! The engine is strategy-pluggable. Five concrete strategies ship with this
//! crate ([`SingleExecutionStrategy`], [`PriorityBasedStrategy`],
//! [`GroupCoordinationStrategy`], [`ConcurrencyLimitedStrategy`], and the
//! non-registered [`DynamicConditionEvaluator`]), plus a serial
//! AND-composition of up to five strategies via [`CompositeStrategy`].
//!
//! ## Usage
//!
//! ```rust
//! use lockman_core::{acquire, BoundaryId, SingleExecutionInfo, ExecutionMode, SingleExecutionStrategy};
//!
//! let strategy = SingleExecutionStrategy::new();
//! let boundary = BoundaryId::from_str("screen.login");
//! let info = SingleExecutionInfo::new("submit", ExecutionMode::Boundary);
//!
//! let verdict = acquire(&strategy, &boundary, &info);
//! assert!(verdict.is_success());
//! ```
//!
//! Strategies are registered once in a [`StrategyContainer`] and resolved by
//! [`StrategyId`] thereafter; [`facade`] exposes a process-wide default
//! container plus a thread-scoped override for test isolation.

pub mod container;
pub mod coordinator;
pub mod error;
pub mod facade;
pub mod id;
pub mod info;
pub mod invariants;
pub mod property;
pub mod state;
pub mod strategies;
pub mod strategy;

pub use container::{StrategyContainer, StrategyRegistrationInfo};
pub use coordinator::acquire;
pub use error::{ConcurrencyLimit, GroupPolicy, LockInfoSummary, LockmanError};
pub use facade::{clean_up_all, current_container, with_test_container};
pub use id::{ActionId, BoundaryId, GroupId, StrategyId, UniqueId};
pub use info::{LockInfo, LockInfoBase};
pub use state::IndexedLockState;
pub use strategy::{Strategy, Verdict};

pub use strategies::{
    CompositeInfo, CompositeStrategy, ConcurrencyBehavior, ConcurrencyLimitedInfo,
    ConcurrencyLimitedStrategy, DynamicConditionEvaluator, DynamicPredicate, ErasedStrategy,
    ExecutionMode, GroupCoordinationInfo, GroupCoordinationStrategy, GroupRole, Priority,
    PriorityBasedInfo, PriorityBasedStrategy, SingleExecutionInfo, SingleExecutionStrategy,
};
