//! Process-wide facade: a default strategy container plus a thread-scoped
//! override for tests, so unrelated test bodies never see each other's
//! registrations (spec §4.9's container is process-wide by default, but
//! tests need isolation).

use crate::container::StrategyContainer;
use std::cell::RefCell;
use std::sync::{Arc, OnceLock};

static DEFAULT_CONTAINER: OnceLock<Arc<StrategyContainer>> = OnceLock::new();

thread_local! {
    static OVERRIDE: RefCell<Option<Arc<StrategyContainer>>> = const { RefCell::new(None) };
}

fn default_container() -> Arc<StrategyContainer> {
    DEFAULT_CONTAINER
        .get_or_init(|| Arc::new(StrategyContainer::new()))
        .clone()
}

/// The container the current thread should use: the thread-local test
/// override if one is active, otherwise the process-wide default.
#[must_use]
pub fn current_container() -> Arc<StrategyContainer> {
    OVERRIDE.with(|cell| cell.borrow().clone()).unwrap_or_else(default_container)
}

/// Runs `body` with `container` installed as this thread's override,
/// restoring whatever was installed before on every exit path, including
/// panics.
pub fn with_test_container<R>(container: Arc<StrategyContainer>, body: impl FnOnce() -> R) -> R {
    struct Guard(Option<Arc<StrategyContainer>>);
    impl Drop for Guard {
        fn drop(&mut self) {
            OVERRIDE.with(|cell| *cell.borrow_mut() = self.0.take());
        }
    }

    let previous = OVERRIDE.with(|cell| cell.borrow_mut().replace(container));
    let _guard = Guard(previous);
    body()
}

/// Clears every lock held by every strategy registered in the current
/// thread's container. Intended for test teardown.
pub fn clean_up_all() {
    let container = current_container();
    for strategy in container.get_all_strategies() {
        strategy.clean_up_erased();
    }
}
