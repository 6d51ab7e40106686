//! Shutdown coordination.
//!
//! [`ShutdownCoordinator`] owns the `Running -> Draining -> Terminated` state
//! machine. The first trigger, either an explicit [`request_shutdown`] or the
//! first OS interrupt, closes admission and starts the drain race. A second
//! interrupt escalates and wins the race regardless of how far the drain got.
//!
//! [`request_shutdown`]: ShutdownCoordinator::request_shutdown

use crate::InFlightTracker;
use core::time::Duration;
use portable_atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Shared handle to a shutdown coordinator.
pub type SharedShutdown = Arc<ShutdownCoordinator>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownState {
    /// Accepting new submissions.
    Running,
    /// Admission closed; waiting for in-flight work.
    Draining,
    /// The drain race finished. Final.
    Terminated,
}

/// What an OS interrupt should do, decided by how many came before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterruptAction {
    /// First interrupt: drain gracefully.
    Drain,
    /// Repeated interrupt: terminate immediately.
    Escalate,
}

/// How the drain race ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every in-flight unit finished before the timeout.
    Drained,
    /// The timeout elapsed first; remaining work is abandoned.
    TimedOut,
    /// A repeated interrupt cut the drain short.
    Forced,
}

pub struct ShutdownCoordinator {
    state: watch::Sender<ShutdownState>,
    interrupts: AtomicUsize,
    admission: CancellationToken,
    escalation: CancellationToken,
    inflight: InFlightTracker,
    timeout: Duration,
}

impl ShutdownCoordinator {
    /// Creates a coordinator draining `inflight` for at most `timeout`.
    pub fn new(inflight: InFlightTracker, timeout: Duration) -> Self {
        let (state, _) = watch::channel(ShutdownState::Running);
        Self {
            state,
            interrupts: AtomicUsize::new(0),
            admission: CancellationToken::new(),
            escalation: CancellationToken::new(),
            inflight,
            timeout,
        }
    }

    /// Creates a new shared coordinator wrapped in [`Arc`].
    pub fn shared(inflight: InFlightTracker, timeout: Duration) -> SharedShutdown {
        Arc::new(Self::new(inflight, timeout))
    }

    pub fn state(&self) -> ShutdownState {
        *self.state.borrow()
    }

    /// Receiver notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<ShutdownState> {
        self.state.subscribe()
    }

    /// Token cancelled when the first shutdown trigger arrives.
    ///
    /// Hand it to anything that must stop admitting work: the listener and
    /// the submission service.
    pub fn admission_token(&self) -> CancellationToken {
        self.admission.clone()
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Moves `Running -> Draining`. Returns `true` only for the call that made
    /// the transition; later calls are no-ops.
    pub fn request_shutdown(&self) -> bool {
        let started = self.state.send_if_modified(|state| {
            if *state == ShutdownState::Running {
                *state = ShutdownState::Draining;
                true
            } else {
                false
            }
        });
        if started {
            tracing::info!("Shutdown requested, refusing new submissions");
            self.admission.cancel();
        }
        started
    }

    /// Records an OS interrupt.
    ///
    /// The first one triggers a graceful drain; every later one escalates.
    /// Explicit [`request_shutdown`](Self::request_shutdown) calls are not
    /// counted, so an operator still gets one graceful interrupt after an
    /// administrative shutdown.
    pub fn interrupt(&self) -> InterruptAction {
        let seen = self.interrupts.fetch_add(1, Ordering::AcqRel);
        if seen == 0 {
            tracing::info!("Interrupt received, shutting down...");
            self.request_shutdown();
            InterruptAction::Drain
        } else {
            tracing::warn!("Repeated interrupt, terminating...");
            self.escalation.cancel();
            InterruptAction::Escalate
        }
    }

    /// Waits for the first trigger, then races the in-flight drain against
    /// the timeout and escalation.
    ///
    /// Escalation wins ties. On return the state is
    /// [`ShutdownState::Terminated`].
    pub async fn run(&self) -> ShutdownOutcome {
        self.admission.cancelled().await;
        tracing::info!(
            inflight = self.inflight.len(),
            timeout_ms = self.timeout.as_millis() as u64,
            "Draining in-flight work"
        );

        let outcome = tokio::select! {
            biased;
            () = self.escalation.cancelled() => ShutdownOutcome::Forced,
            drained = self.inflight.drain(self.timeout) => {
                if drained {
                    ShutdownOutcome::Drained
                } else {
                    ShutdownOutcome::TimedOut
                }
            }
        };

        match outcome {
            ShutdownOutcome::Drained => tracing::info!("All in-flight work completed"),
            ShutdownOutcome::TimedOut => tracing::warn!(
                abandoned = self.inflight.len(),
                "Shutdown timeout exceeded"
            ),
            ShutdownOutcome::Forced => tracing::warn!(
                abandoned = self.inflight.len(),
                "Drain interrupted, forcing exit"
            ),
        }

        self.state.send_replace(ShutdownState::Terminated);
        outcome
    }
}
