//! Universal invariants every strategy must uphold, independent of its own
//! admission rules (spec §8).
//!
//! Unlike a single data structure's invariants, these apply across a
//! sequence of `can_lock`/`lock`/`unlock` calls, so they're expressed as
//! free functions over snapshots the caller collects at the relevant
//! points, rather than a single `PropertyChecker` over one object's state.

use crate::id::UniqueId;
use crate::info::LockInfo;
use crate::property::PropertyResult;
use std::collections::HashSet;

/// Index consistency: no boundary's entry list contains the same
/// `unique_id` twice.
#[must_use]
pub fn check_index_consistency<Info: LockInfo>(entries: &[Info]) -> PropertyResult {
    let mut seen = HashSet::new();
    for entry in entries {
        if !seen.insert(entry.unique_id()) {
            return PropertyResult::fail(
                "IndexConsistency",
                format!("unique id {:?} appears twice in one boundary's entries", entry.unique_id()),
            );
        }
    }
    PropertyResult::pass("IndexConsistency")
}

/// Order preservation: appending a new entry never disturbs the relative
/// order of the entries that were already present.
#[must_use]
pub fn check_order_preservation<Info: LockInfo>(before: &[Info], after: &[Info]) -> PropertyResult {
    let before_ids: Vec<UniqueId> = before.iter().map(LockInfo::unique_id).collect();
    let after_ids: Vec<UniqueId> = after.iter().map(LockInfo::unique_id).collect();
    let preserved: Vec<UniqueId> = after_ids
        .iter()
        .filter(|id| before_ids.contains(id))
        .copied()
        .collect();

    if preserved == before_ids {
        PropertyResult::pass("OrderPreservation")
    } else {
        PropertyResult::fail(
            "OrderPreservation",
            format!("expected prefix order {before_ids:?}, observed {preserved:?}"),
        )
    }
}

/// Bulk idempotence: running the same bulk cleanup twice produces the same
/// observable result as running it once (the second run is a no-op).
#[must_use]
pub fn check_bulk_idempotence(after_first: usize, after_second: usize) -> PropertyResult {
    if after_first == 0 && after_second == 0 {
        PropertyResult::pass("BulkIdempotence")
    } else {
        PropertyResult::fail(
            "BulkIdempotence",
            format!("expected 0 entries after both cleanups, got {after_first} then {after_second}"),
        )
    }
}

/// Round-trip: locking then unlocking the same entry restores the prior
/// entry count exactly.
#[must_use]
pub fn check_round_trip(before_count: usize, after_lock_count: usize, after_unlock_count: usize) -> PropertyResult {
    if after_lock_count == before_count + 1 && after_unlock_count == before_count {
        PropertyResult::pass("RoundTrip")
    } else {
        PropertyResult::fail(
            "RoundTrip",
            format!(
                "expected {before_count} -> {} -> {before_count}, observed {before_count} -> {after_lock_count} -> {after_unlock_count}",
                before_count + 1
            ),
        )
    }
}

/// Composite reverse release: the order children were unlocked in is the
/// exact reverse of the order they were locked in (spec §4.8's LIFO
/// release guarantee).
#[must_use]
pub fn check_composite_reverse_release(lock_order: &[UniqueId], unlock_order: &[UniqueId]) -> PropertyResult {
    let expected: Vec<UniqueId> = lock_order.iter().rev().copied().collect();
    if unlock_order == expected.as_slice() {
        PropertyResult::pass("CompositeReverseRelease")
    } else {
        PropertyResult::fail(
            "CompositeReverseRelease",
            format!("expected release order {expected:?}, observed {unlock_order:?}"),
        )
    }
}

/// No leak on preceding cancellation: after a `SuccessWithPrecedingCancellation`
/// verdict is acted on, exactly one entry holds the boundary — the new
/// acquisition — never both the victim and the new holder at once.
#[must_use]
pub fn check_no_leak_on_preceding_cancellation<Info: LockInfo>(
    entries_after: &[Info],
    victim: UniqueId,
    new_holder: UniqueId,
) -> PropertyResult {
    let ids: Vec<UniqueId> = entries_after.iter().map(LockInfo::unique_id).collect();
    if ids.contains(&victim) {
        return PropertyResult::fail(
            "NoLeakOnPrecedingCancellation",
            format!("victim {victim:?} is still present after preceding cancellation"),
        );
    }
    if !ids.contains(&new_holder) {
        return PropertyResult::fail(
            "NoLeakOnPrecedingCancellation",
            format!("new holder {new_holder:?} is missing after preceding cancellation"),
        );
    }
    PropertyResult::pass("NoLeakOnPrecedingCancellation")
}

/// Exclusivity of commit: at most one entry per mutual-exclusion `key`
/// is active at a time, for strategies whose admission rule claims
/// exclusivity over that key (e.g. single-execution's boundary/action
/// modes, concurrency-limited at `limit == 1`).
#[must_use]
pub fn check_exclusivity_of_commit<Info: LockInfo, K: Eq + std::hash::Hash>(
    entries: &[Info],
    key_of: impl Fn(&Info) -> K,
) -> PropertyResult {
    let mut seen = HashSet::new();
    for entry in entries {
        if !seen.insert(key_of(entry)) {
            return PropertyResult::fail(
                "ExclusivityOfCommit",
                "more than one active entry shares an exclusivity key".to_string(),
            );
        }
    }
    PropertyResult::pass("ExclusivityOfCommit")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{ActionId, StrategyId};
    use crate::info::LockInfoBase;

    #[derive(Clone)]
    struct Entry(LockInfoBase);
    impl LockInfo for Entry {
        fn strategy_id(&self) -> StrategyId {
            self.0.strategy_id.clone()
        }
        fn action_id(&self) -> &ActionId {
            &self.0.action_id
        }
        fn unique_id(&self) -> UniqueId {
            self.0.unique_id
        }
    }

    fn entry(raw: u64, action: &str) -> Entry {
        Entry(LockInfoBase {
            strategy_id: StrategyId::from("test"),
            action_id: ActionId::from(action),
            unique_id: UniqueId::from_raw(raw),
            cancellable: true,
        })
    }

    #[test]
    fn index_consistency_rejects_duplicate_unique_ids() {
        let entries = vec![entry(1, "a"), entry(1, "b")];
        assert!(!check_index_consistency(&entries).holds);
        let entries = vec![entry(1, "a"), entry(2, "b")];
        assert!(check_index_consistency(&entries).holds);
    }

    #[test]
    fn order_preservation_detects_reordering() {
        let before = vec![entry(1, "a"), entry(2, "b")];
        let after = vec![entry(1, "a"), entry(2, "b"), entry(3, "c")];
        assert!(check_order_preservation(&before, &after).holds);

        let reordered = vec![entry(2, "b"), entry(1, "a"), entry(3, "c")];
        assert!(!check_order_preservation(&before, &reordered).holds);
    }

    #[test]
    fn round_trip_expects_exact_count_sequence() {
        assert!(check_round_trip(0, 1, 0).holds);
        assert!(!check_round_trip(0, 1, 1).holds);
    }

    #[test]
    fn composite_reverse_release_checks_exact_reversal() {
        let lock_order = vec![UniqueId::from_raw(1), UniqueId::from_raw(2)];
        let unlock_order = vec![UniqueId::from_raw(2), UniqueId::from_raw(1)];
        assert!(check_composite_reverse_release(&lock_order, &unlock_order).holds);
        assert!(!check_composite_reverse_release(&lock_order, &lock_order).holds);
    }

    #[test]
    fn no_leak_detects_stale_victim() {
        let victim = UniqueId::from_raw(1);
        let new_holder = UniqueId::from_raw(2);
        let clean = vec![entry(2, "b")];
        assert!(check_no_leak_on_preceding_cancellation(&clean, victim, new_holder).holds);

        let leaked = vec![entry(1, "a"), entry(2, "b")];
        assert!(!check_no_leak_on_preceding_cancellation(&leaked, victim, new_holder).holds);
    }

    #[test]
    fn exclusivity_of_commit_rejects_shared_keys() {
        let entries = vec![entry(1, "a"), entry(2, "a")];
        assert!(!check_exclusivity_of_commit(&entries, |e: &Entry| e.action_id().clone()).holds);
        let entries = vec![entry(1, "a"), entry(2, "b")];
        assert!(check_exclusivity_of_commit(&entries, |e: &Entry| e.action_id().clone()).holds);
    }
}
