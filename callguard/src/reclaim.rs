/// Cleanup run after every instrumented call, whatever its outcome.
///
/// Meant for releasing memory held on behalf of the call, typically cached
/// accelerator allocations. Implementations must not assume the call
/// succeeded.
pub trait MemoryReclaimer: Send + Sync {
    /// Releases what the finished call left behind.
    ///
    /// A panic in here is caught and logged as a warning; it never changes the
    /// outcome of the call.
    fn reclaim(&self);

    /// A no-op reclaimer is skipped entirely, including its log line.
    fn is_noop(&self) -> bool {
        false
    }
}

/// Reclaimer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReclaimer;

impl MemoryReclaimer for NoopReclaimer {
    fn reclaim(&self) {}

    fn is_noop(&self) -> bool {
        true
    }
}

/// Reclaimer backed by a closure, e.g. one calling into an accelerator
/// runtime to empty its allocation cache.
pub struct FnReclaimer<F>(F);

impl<F> FnReclaimer<F>
where
    F: Fn() + Send + Sync,
{
    /// Runs `reclaim` on every [`MemoryReclaimer::reclaim`] call.
    pub fn new(reclaim: F) -> Self {
        Self(reclaim)
    }
}

impl<F> MemoryReclaimer for FnReclaimer<F>
where
    F: Fn() + Send + Sync,
{
    fn reclaim(&self) {
        (self.0)()
    }
}

/// Runs both reclaimers, first then second.
impl<A, B> MemoryReclaimer for (A, B)
where
    A: MemoryReclaimer,
    B: MemoryReclaimer,
{
    fn reclaim(&self) {
        self.0.reclaim();
        self.1.reclaim();
    }

    fn is_noop(&self) -> bool {
        self.0.is_noop() && self.1.is_noop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn fn_reclaimer_runs_the_closure() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let reclaimer = FnReclaimer::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        reclaimer.reclaim();
        reclaimer.reclaim();

        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(!reclaimer.is_noop());
    }

    #[test]
    fn pair_runs_in_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let first = order.clone();
        let second = order.clone();
        let pair = (
            FnReclaimer::new(move || first.lock().unwrap().push("collect")),
            FnReclaimer::new(move || second.lock().unwrap().push("empty cache")),
        );

        pair.reclaim();

        assert_eq!(*order.lock().unwrap(), vec!["collect", "empty cache"]);
        assert!((NoopReclaimer, NoopReclaimer).is_noop());
        assert!(!(NoopReclaimer, pair).is_noop());
    }
}
