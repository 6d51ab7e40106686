use core::fmt;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Identifier handed back to the caller of a submission.
///
/// Assigned once from a monotonically increasing sequence starting at `1` and
/// never reused within a process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(u64);

impl SubmissionId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubmissionId {
    type Err = core::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Concurrent map from [`SubmissionId`] to its encoded digest.
///
/// Each key is written once by the deferred computation of its submission and
/// read any number of times afterwards. The map is sharded, so a lookup only
/// contends with a write that lands in the same shard.
#[derive(Debug, Default)]
pub struct ResultStore {
    digests: DashMap<SubmissionId, String>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes the digest for `id`.
    ///
    /// IDs are unique, so a second write for the same key means the ID
    /// sequence is broken. That panics in debug builds; release builds log it
    /// and keep the latest digest.
    ///
    /// When the write comes from a deferred computation, the panic ends that
    /// task only: the runtime catches it and the process keeps running with
    /// the latest digest stored and the error logged.
    pub fn put(&self, id: SubmissionId, digest: String) {
        if let Some(previous) = self.digests.insert(id, digest) {
            debug_assert!(false, "duplicate digest write for id {id}");
            tracing::error!(%id, %previous, "Duplicate digest write, keeping latest");
        }
    }

    /// Returns the digest for `id`, or `None` if it has not been published.
    pub fn get(&self, id: SubmissionId) -> Option<String> {
        self.digests.get(&id).map(|entry| entry.value().clone())
    }

    /// Number of published digests.
    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}
