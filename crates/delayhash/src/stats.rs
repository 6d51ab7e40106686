use serde::{Deserialize, Serialize};

/// Aggregate submission statistics, derived on demand.
///
/// Serializes as `{"total": <int>, "average": <int>}` where `average` is the
/// mean synchronous submit latency in whole microseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total: u64,
    pub average: u64,
}

impl StatsSnapshot {
    /// Builds a snapshot from the request count and the cumulative elapsed
    /// microseconds. The average is floor division, and zero when no request
    /// has been recorded.
    pub const fn from_totals(total: u64, total_micros: u64) -> Self {
        let average = match total {
            0 => 0,
            n => total_micros / n,
        };
        Self { total, average }
    }
}
