//! Immediate-unlock coordinator: enforces victim-unlock-before-new-lock
//! ordering on `SuccessWithPrecedingCancellation` verdicts (spec §4.10).

use crate::error::LockmanError;
use crate::id::BoundaryId;
use crate::strategy::{Strategy, Verdict};

/// Runs the full acquisition sequence against `strategy`: evaluate, release
/// any preceding victim, then record the new lock — as a single critical
/// section of the strategy's own lock, so a caller can never observe the
/// victim and the new holder both locked at once, and two concurrent callers
/// can never both commit against a conflicting state.
///
/// A thin delegator: the atomicity is `Strategy::acquire`'s to provide, each
/// strategy built around whatever single mutex guard it already holds
/// internally for this boundary.
pub fn acquire<S>(strategy: &S, boundary: &BoundaryId, info: &S::Info) -> Verdict<S::Error>
where
    S: Strategy<Error = LockmanError>,
{
    strategy.acquire(boundary, info)
}
