//! The universal invariants every strategy must uphold (spec §8), expressed
//! as checkable functions over snapshots rather than a single data
//! structure's state.

pub mod engine;

pub use engine::{
    check_bulk_idempotence, check_composite_reverse_release, check_exclusivity_of_commit,
    check_index_consistency, check_no_leak_on_preceding_cancellation, check_order_preservation,
    check_round_trip,
};
