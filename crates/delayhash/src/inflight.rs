//! In-flight work accounting.
//!
//! [`InFlightTracker`] is a counting join barrier shared by request handlers
//! and the deferred computations they schedule. Every unit of work holds an
//! [`InFlightGuard`] for its whole lifetime; the ledger drops when the guard
//! does, including during a panic unwind, so it can never be released twice or
//! go negative.
//!
//! Draining closes the tracker and waits for the ledger to reach zero. Closing
//! does not refuse new units: work admitted before shutdown may still register
//! the computation it spawns. Refusing new work is the job of
//! [`ShutdownCoordinator`](crate::ShutdownCoordinator).

use core::{future::Future, time::Duration};
use tokio::task::JoinHandle;
use tokio_util::task::{TaskTracker, task_tracker::TaskTrackerToken};

/// Shared ledger of executing units of work.
///
/// Cloning is cheap and every clone observes the same ledger.
#[derive(Clone, Debug, Default)]
pub struct InFlightTracker {
    tracker: TaskTracker,
}

/// Registration of one unit of work. Dropping it releases the unit.
#[derive(Debug)]
#[must_use = "the unit is released as soon as the guard is dropped"]
pub struct InFlightGuard {
    _token: TaskTrackerToken,
}

impl InFlightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a unit of work and returns the guard that releases it.
    pub fn enter(&self) -> InFlightGuard {
        InFlightGuard {
            _token: self.tracker.token(),
        }
    }

    /// Registers `future` as a unit of work and spawns it on the runtime.
    ///
    /// Registration happens before the task is scheduled, so a concurrent
    /// drain can never observe an empty ledger while the task is pending.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tracker.spawn(future)
    }

    /// Number of units currently registered.
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }

    /// Waits until the ledger reaches zero or `timeout` elapses.
    ///
    /// Returns `true` if every unit finished in time. Units that are still
    /// running when the timeout fires are left alone.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tracker.close();
        tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::time::{Instant, sleep};

    #[tokio::test]
    async fn guard_scopes_the_ledger() {
        let tracker = InFlightTracker::new();
        assert!(tracker.is_empty());

        let first = tracker.enter();
        let second = tracker.enter();
        assert_eq!(tracker.len(), 2);

        drop(first);
        assert_eq!(tracker.len(), 1);
        drop(second);
        assert!(tracker.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_ledger_drains_immediately() {
        let tracker = InFlightTracker::new();
        let start = Instant::now();
        assert!(tracker.drain(Duration::from_secs(60)).await);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_waits_for_spawned_units() {
        let tracker = InFlightTracker::new();
        let finished = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&finished);
        tracker.spawn(async move {
            sleep(Duration::from_secs(5)).await;
            flag.store(true, Ordering::SeqCst);
        });
        assert_eq!(tracker.len(), 1);

        let start = Instant::now();
        assert!(tracker.drain(Duration::from_secs(60)).await);
        assert!(finished.load(Ordering::SeqCst));
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn drain_times_out_on_slow_units() {
        let tracker = InFlightTracker::new();
        tracker.spawn(sleep(Duration::from_secs(30)));

        let start = Instant::now();
        assert!(!tracker.drain(Duration::from_secs(2)).await);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
        assert_eq!(tracker.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn enter_after_drain_started_is_honored() {
        let tracker = InFlightTracker::new();
        let handler = tracker.enter();

        let draining = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.drain(Duration::from_secs(60)).await })
        };
        tokio::task::yield_now().await;

        // An admitted handler registers its deferred work after the drain
        // began; the drain must wait for it too.
        let deferred_done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&deferred_done);
        tracker.spawn(async move {
            sleep(Duration::from_secs(3)).await;
            flag.store(true, Ordering::SeqCst);
        });
        drop(handler);

        assert!(draining.await.unwrap());
        assert!(deferred_done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn panicking_unit_still_releases() {
        let tracker = InFlightTracker::new();
        let handle = tracker.spawn(async {
            panic!("unit of work failed");
        });
        assert!(handle.await.is_err());
        assert!(tracker.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_releases_reach_zero_once() {
        let tracker = InFlightTracker::new();
        for _ in 0..512 {
            let guard = tracker.enter();
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                drop(guard);
            });
        }
        assert!(tracker.drain(Duration::from_secs(10)).await);
        assert!(tracker.is_empty());
        // A second drain on an already-empty ledger returns straight away.
        assert!(tracker.drain(Duration::from_millis(1)).await);
    }
}
