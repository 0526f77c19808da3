//! Randomized property checks for the two universal obligations that hold
//! for every strategy (spec §8, "Property-based obligations"):
//!
//! 1. `can_lock` is pure: it never mutates state observable via
//!    `current_locks`.
//! 2. If `can_lock` returns `Success`, then `lock; unlock` is a no-op on the
//!    pre-call snapshot.
//!
//! Sequences are generated by a seeded `DeterministicRng` so a failure is
//! reproducible with `DST_SEED=<seed>`.

use lockman_core::{
    ActionId, BoundaryId, ExecutionMode, LockInfo, SingleExecutionInfo, SingleExecutionStrategy,
    Strategy,
};
use lockman_dst::{get_or_generate_seed, DeterministicRng};

fn random_action_id(rng: &mut DeterministicRng) -> ActionId {
    let n: u32 = rng.gen_range(0..1_000_000);
    ActionId::from(format!("action-{n}"))
}

#[test]
fn can_lock_never_mutates_observable_state() {
    let seed = get_or_generate_seed();
    let mut rng = DeterministicRng::new(seed);
    let strategy = SingleExecutionStrategy::new();
    let boundary = BoundaryId::from_str("main");

    for _ in 0..200 {
        let before = strategy.current_locks();
        let probe = SingleExecutionInfo::new(random_action_id(&mut rng), ExecutionMode::Action);
        let _ = strategy.can_lock(&boundary, &probe);
        let after = strategy.current_locks();
        assert_eq!(before, after, "can_lock observably mutated state (seed={seed})");

        // Occasionally commit a real entry so later probes see nonempty state.
        if rng.gen_bool(0.3) {
            let entry = SingleExecutionInfo::new(random_action_id(&mut rng), ExecutionMode::Action);
            if strategy.can_lock(&boundary, &entry) == lockman_core::Verdict::Success {
                strategy.lock(&boundary, &entry);
            }
        }
    }
}

#[test]
fn success_then_lock_unlock_round_trips_to_the_prior_snapshot() {
    let seed = get_or_generate_seed();
    let mut rng = DeterministicRng::new(seed);
    let strategy = SingleExecutionStrategy::new();
    let boundary = BoundaryId::from_str("main");

    for _ in 0..200 {
        let candidate = SingleExecutionInfo::new(random_action_id(&mut rng), ExecutionMode::Action);
        if strategy.can_lock(&boundary, &candidate) != lockman_core::Verdict::Success {
            continue;
        }

        let mut before: Vec<String> = strategy
            .current_locks()
            .into_iter()
            .find(|(b, _)| b == &boundary)
            .map(|(_, entries)| entries.iter().map(|e| e.action_id().as_str().to_string()).collect())
            .unwrap_or_default();
        before.sort();

        strategy.lock(&boundary, &candidate);
        strategy.unlock(&boundary, &candidate);

        let mut after: Vec<String> = strategy
            .current_locks()
            .into_iter()
            .find(|(b, _)| b == &boundary)
            .map(|(_, entries)| entries.iter().map(|e| e.action_id().as_str().to_string()).collect())
            .unwrap_or_default();
        after.sort();

        assert_eq!(before, after, "lock; unlock was not a no-op (seed={seed})");
    }
}
