use portable_atomic::{AtomicU64, Ordering};

/// A thread-safe monotonic counter.
///
/// Serves both as the submission ID sequence and as the accumulator for
/// cumulative request latency. Every update is a single atomic
/// read-modify-write, so concurrent callers never lose increments and always
/// observe the value their own update produced.
#[derive(Debug, Default)]
pub struct AtomicCounter {
    value: AtomicU64,
}

impl AtomicCounter {
    /// Creates a counter starting at `initial`.
    pub const fn new(initial: u64) -> Self {
        Self {
            value: AtomicU64::new(initial),
        }
    }

    /// Adds `delta` and returns the updated value.
    ///
    /// When used as an ID sequence starting at `0` with `delta == 1`, the
    /// first returned value is `1`.
    pub fn add(&self, delta: u64) -> u64 {
        self.value.fetch_add(delta, Ordering::AcqRel) + delta
    }

    /// Returns the current value.
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }
}
