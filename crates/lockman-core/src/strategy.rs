//! The four-verb strategy contract every lock policy implements (spec §4.2).

use crate::id::{BoundaryId, StrategyId, UniqueId};
use crate::info::LockInfo;

/// The three-valued result of `can_lock`.
///
/// `Success` and `SuccessWithPrecedingCancellation` both admit the new
/// acquisition; only `Cancel` refuses it. `SuccessWithPrecedingCancellation`
/// is not an error to the caller, it is a success that also names a prior
/// acquisition the [`crate::coordinator`] must release first.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict<E> {
    Success,
    SuccessWithPrecedingCancellation(E),
    Cancel(E),
}

impl<E> Verdict<E> {
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Verdict::Cancel(_))
    }

    #[must_use]
    pub fn is_cancel(&self) -> bool {
        matches!(self, Verdict::Cancel(_))
    }

    /// The error carried by `SuccessWithPrecedingCancellation` or `Cancel`,
    /// if any.
    #[must_use]
    pub fn error(&self) -> Option<&E> {
        match self {
            Verdict::Success => None,
            Verdict::SuccessWithPrecedingCancellation(e) | Verdict::Cancel(e) => Some(e),
        }
    }
}

/// A policy governing which acquisitions may proceed concurrently within a
/// boundary. Every strategy owns its own internal state and its own mutex;
/// see spec §4.2 and §5 for the concurrency contract.
///
/// `Info` is the strategy's own lock-info payload type (spec §3); strategies
/// are not generic over arbitrary info, each strategy defines its own.
pub trait Strategy: Send + Sync {
    type Info: LockInfo + Send + Sync;
    type Error: Send + Sync;

    /// Pure query: must not mutate state. Returns the verdict for admitting
    /// `info` into `boundary` given currently committed entries.
    fn can_lock(&self, boundary: &BoundaryId, info: &Self::Info) -> Verdict<Self::Error>;

    /// Commits `info` to state. Only legal after a non-`Cancel` verdict was
    /// returned for the same `info`.
    fn lock(&self, boundary: &BoundaryId, info: &Self::Info);

    /// Atomically decides and, if admitted, commits `info` against
    /// `boundary`: the evaluate step, any preceding-cancellation victim's
    /// release, and the new entry's commit all happen inside one critical
    /// section of this strategy's own internal lock.
    ///
    /// This is the method [`crate::coordinator::acquire`] calls. Composing
    /// `can_lock`/`unlock_by_unique_id`/`lock` as three separate calls (each
    /// its own critical section) lets two concurrent callers both observe
    /// "no conflict" before either commits, double-admitting into what is
    /// supposed to be a mutually exclusive boundary; `acquire` is the only
    /// entry point that closes that window. There is no default
    /// implementation: a default body would need to call `.victim()` on
    /// `Self::Error`, which isn't bounded to [`crate::error::LockmanError`]
    /// at this trait's level, so every strategy provides its own, built
    /// around whatever single mutex guard it already holds internally.
    fn acquire(&self, boundary: &BoundaryId, info: &Self::Info) -> Verdict<Self::Error>;

    /// Releases the exact entry matching `info`'s unique-id. Idempotent
    /// after removal.
    fn unlock(&self, boundary: &BoundaryId, info: &Self::Info);

    /// Drops every entry across every boundary.
    fn clean_up(&self);

    /// Drops every entry for one boundary.
    fn clean_up_boundary(&self, boundary: &BoundaryId);

    /// Debug snapshot: boundary -> committed entries, insertion order.
    fn current_locks(&self) -> Vec<(BoundaryId, Vec<Self::Info>)>;

    /// This strategy's self-identification.
    fn strategy_id(&self) -> StrategyId;

    /// Releases whichever entry in `boundary` carries `unique_id`, if any.
    ///
    /// Used by [`crate::coordinator`] to release a preceding-cancellation
    /// victim without needing to reconstruct its concrete `Info` value.
    /// The default implementation is correct for any strategy whose
    /// `current_locks` reflects everything `lock` has committed; strategies
    /// with cheaper lookups may override it.
    fn unlock_by_unique_id(&self, boundary: &BoundaryId, unique_id: UniqueId) {
        let found = self.current_locks().into_iter().find_map(|(b, entries)| {
            if &b == boundary {
                entries.into_iter().find(|i| i.unique_id() == unique_id)
            } else {
                None
            }
        });
        if let Some(info) = found {
            self.unlock(boundary, &info);
        }
    }
}
