//! Identifiers and value types used throughout the lock-coordination engine.
//!
//! See spec §3 for the authoritative semantics of each identifier kind.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// An opaque, hashable, thread-shareable scope tag supplied by the caller.
///
/// Two boundaries with the same printed value but different concrete types
/// are distinct: equality and hashing go through the erased inner value,
/// which preserves the original `TypeId` as part of its identity.
#[derive(Clone)]
pub struct BoundaryId(Arc<dyn ErasedKey>);

/// A hashable, thread-shareable group tag. Shares the same erasure strategy
/// as `BoundaryId`.
#[derive(Clone)]
pub struct GroupId(Arc<dyn ErasedKey>);

trait ErasedKey: Any + Send + Sync + fmt::Debug {
    fn eq_erased(&self, other: &dyn ErasedKey) -> bool;
    fn hash_erased(&self, state: &mut dyn Hasher);
    fn as_any(&self) -> &dyn Any;
}

impl<T> ErasedKey for T
where
    T: Any + Eq + Hash + Send + Sync + fmt::Debug,
{
    fn eq_erased(&self, other: &dyn ErasedKey) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|o| self == o)
    }

    fn hash_erased(&self, mut state: &mut dyn Hasher) {
        self.hash(&mut state);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

macro_rules! erased_key_wrapper {
    ($name:ident) => {
        impl $name {
            /// Wrap any hashable, thread-shareable value as an identifier.
            pub fn new<T>(value: T) -> Self
            where
                T: Any + Eq + Hash + Send + Sync + fmt::Debug + 'static,
            {
                Self(Arc::new(value))
            }

            /// Convenience constructor from a string literal or `String`.
            pub fn from_str(value: impl Into<String>) -> Self {
                Self::new(value.into())
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.0.eq_erased(other.0.as_ref())
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.hash_erased(state);
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", stringify!($name), self.0)
            }
        }
    };
}

erased_key_wrapper!(BoundaryId);
erased_key_wrapper!(GroupId);

/// A short string naming the kind of an action. Not unique: two concurrent
/// invocations of the same action kind share an `ActionId`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ActionId(Arc<str>);

impl ActionId {
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActionId({:?})", self.0)
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ActionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ActionId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A freshly minted, globally unique token stamped on every lock-info at
/// construction time. Equality of lock-infos is defined solely by equality
/// of their `UniqueId`; it is the only handle used to release a specific
/// acquisition.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniqueId(u64);

static UNIQUE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

impl UniqueId {
    /// Mint a fresh, process-unique id.
    #[must_use]
    pub fn generate() -> Self {
        Self(UNIQUE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Build a `UniqueId` from a raw value. Exposed for deterministic tests
    /// that need to construct lock-infos with a predictable identity.
    #[must_use]
    pub fn from_raw(value: u64) -> Self {
        debug_assert!(value != 0, "0 is not a valid UniqueId");
        Self(value)
    }

    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UniqueId({})", self.0)
    }
}

/// `name[:configuration]`. Built-in strategy names are reserved; composites
/// compose child ids as `CompositeN:id1+id2+...`. Equality is textual.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct StrategyId(Arc<str>);

impl StrategyId {
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build the composite id for an ordered tuple of child ids:
    /// `CompositeN:id1+id2+...+idn`.
    #[must_use]
    pub fn composite(children: &[StrategyId]) -> Self {
        debug_assert!(
            (2..=5).contains(&children.len()),
            "composite strategies take 2-5 children, got {}",
            children.len()
        );
        let joined = children
            .iter()
            .map(StrategyId::as_str)
            .collect::<Vec<_>>()
            .join("+");
        Self::new(format!("Composite{}:{}", children.len(), joined))
    }
}

impl fmt::Debug for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StrategyId({:?})", self.0)
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StrategyId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_ids_compare_by_erased_value() {
        let a = BoundaryId::from_str("main");
        let b = BoundaryId::from_str("main");
        let c = BoundaryId::from_str("other");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn boundary_ids_of_different_types_are_distinct() {
        let a = BoundaryId::new(1u32);
        let b = BoundaryId::new(1u64);
        assert_ne!(a, b);
    }

    #[test]
    fn unique_ids_are_distinct_per_generation() {
        let a = UniqueId::generate();
        let b = UniqueId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn composite_strategy_id_format() {
        let id = StrategyId::composite(&[
            StrategyId::from("singleExecution"),
            StrategyId::from("priorityBased"),
        ]);
        assert_eq!(id.as_str(), "Composite2:singleExecution+priorityBased");
    }

    #[test]
    fn action_id_display() {
        let id = ActionId::from("login");
        assert_eq!(id.to_string(), "login");
        assert_eq!(id, ActionId::from("login".to_string()));
    }
}
