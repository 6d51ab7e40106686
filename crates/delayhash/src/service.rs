//! Submission handling for the deferred hashing service.
//!
//! [`SubmissionService`] is the entry point the transport layer calls into. It
//! acknowledges every submission synchronously with a fresh
//! [`SubmissionId`] and publishes the digest later, from a deferred
//! computation tracked by the shared [`InFlightTracker`].
//!
//! ## Responsibilities
//!
//! - Ignore empty submissions without allocating an ID or registering work.
//! - Refuse new submissions once the admission token is cancelled.
//! - Register the deferred computation before scheduling it.
//! - Record synchronous submit latency for [`StatsSnapshot`].
//! - Serve lookups, which report pending and unknown IDs alike as not found.

use crate::{
    AtomicCounter, Error, InFlightTracker, Result, ResultStore, Sha512Base64, StatsSnapshot,
    SubmissionId, Transform,
};
use bytes::Bytes;
use core::time::Duration;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// One accepted submission, owned by its deferred computation.
#[derive(Clone, Debug)]
pub struct Submission {
    pub id: SubmissionId,
    pub value: Bytes,
    pub submitted_at: Instant,
}

/// Accepts values, hands out IDs, and publishes digests after a delay.
///
/// Cloning shares every component, so clones can be handed to each request
/// handler. Separately constructed services share nothing unless components
/// are injected explicitly.
#[derive(Clone)]
pub struct SubmissionService {
    delay: Duration,
    ids: Arc<AtomicCounter>,
    elapsed_micros: Arc<AtomicCounter>,
    store: Arc<ResultStore>,
    inflight: InFlightTracker,
    transform: Arc<dyn Transform>,
    admission: CancellationToken,
}

impl SubmissionService {
    /// Creates a service with its own counters, an empty store and the
    /// [`Sha512Base64`] transform.
    ///
    /// - `delay`: how long each deferred computation waits before running.
    /// - `inflight`: ledger shared with the shutdown coordinator.
    /// - `admission`: cancelled when shutdown begins; submissions are refused
    ///   from then on.
    pub fn new(delay: Duration, inflight: InFlightTracker, admission: CancellationToken) -> Self {
        Self {
            delay,
            ids: Arc::new(AtomicCounter::default()),
            elapsed_micros: Arc::new(AtomicCounter::default()),
            store: Arc::new(ResultStore::new()),
            inflight,
            transform: Arc::new(Sha512Base64),
            admission,
        }
    }

    /// Replaces the digest transform.
    pub fn with_transform(mut self, transform: impl Transform) -> Self {
        self.transform = Arc::new(transform);
        self
    }

    /// Replaces the result store.
    pub fn with_store(mut self, store: Arc<ResultStore>) -> Self {
        self.store = store;
        self
    }

    /// Replaces the ID sequence and the latency accumulator.
    pub fn with_counters(
        mut self,
        ids: Arc<AtomicCounter>,
        elapsed_micros: Arc<AtomicCounter>,
    ) -> Self {
        self.ids = ids;
        self.elapsed_micros = elapsed_micros;
        self
    }

    pub const fn delay(&self) -> Duration {
        self.delay
    }

    pub fn inflight(&self) -> &InFlightTracker {
        &self.inflight
    }

    pub fn store(&self) -> &Arc<ResultStore> {
        &self.store
    }

    /// Accepts `value` and returns its ID without waiting for the digest.
    ///
    /// Returns `Ok(None)` for an empty value: nothing is allocated, registered
    /// or recorded. Returns [`Error::ServiceShutdown`] once admission is
    /// closed.
    ///
    /// The digest is published by a deferred computation registered with the
    /// in-flight tracker before it is scheduled, so a concurrent drain always
    /// waits for it.
    pub fn submit(&self, value: impl Into<Bytes>) -> Result<Option<SubmissionId>> {
        self.submit_since(value, Instant::now())
    }

    /// Like [`submit`](Self::submit), with latency measured from `started`
    /// instead of from entry. Transports pass the instant the request
    /// arrived.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn submit_since(
        &self,
        value: impl Into<Bytes>,
        started: Instant,
    ) -> Result<Option<SubmissionId>> {
        let value = value.into();
        if value.is_empty() {
            tracing::debug!("Ignoring empty submission");
            return Ok(None);
        }

        // Registered before admission is checked: a drain that starts after
        // this point always sees the unit.
        let _handling = self.inflight.enter();
        if self.admission.is_cancelled() {
            return Err(Error::ServiceShutdown);
        }

        let id = SubmissionId::new(self.ids.add(1));
        self.schedule(Submission {
            id,
            value,
            submitted_at: started,
        });

        let elapsed = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        self.elapsed_micros.add(elapsed);
        tracing::info!(%id, elapsed_us = elapsed, "Accepted submission");

        Ok(Some(id))
    }

    fn schedule(&self, submission: Submission) {
        let delay = self.delay;
        let store = Arc::clone(&self.store);
        let transform = Arc::clone(&self.transform);

        self.inflight.spawn(async move {
            tokio::time::sleep(delay).await;
            let digest = transform.digest(&submission.value);
            store.put(submission.id, digest);
            tracing::debug!(
                id = %submission.id,
                after_ms = submission.submitted_at.elapsed().as_millis() as u64,
                "Published digest"
            );
        });
    }

    /// Returns the published digest for `id`.
    ///
    /// A submission whose computation is still pending is reported exactly
    /// like an ID that was never handed out.
    pub fn lookup(&self, id: SubmissionId) -> Result<String> {
        self.store.get(id).ok_or_else(|| Error::NotFound {
            id: id.to_string(),
        })
    }

    /// Like [`lookup`](Self::lookup), for an ID taken straight from a request
    /// path. Only the exact decimal form handed out by `submit` matches;
    /// `01` or `+1` were never issued and are not found.
    pub fn lookup_raw(&self, raw: &str) -> Result<String> {
        match raw.parse::<SubmissionId>() {
            Ok(id) if id.to_string() == raw => self.lookup(id),
            _ => Err(Error::NotFound { id: raw.to_string() }),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot::from_totals(self.ids.get(), self.elapsed_micros.get())
    }
}
