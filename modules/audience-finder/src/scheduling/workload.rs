use tracing::{info, warn};

use crate::discovery::SearchDepths;
use crate::error::{Result, ScanError};

/// Heuristic ceiling on estimated API expense. Not derived from Reddit's
/// actual rate limits; override with `WORKLOAD_CEILING`.
pub const DEFAULT_WORKLOAD_CEILING: f64 = 5000.0;

/// Estimated API expense of a scan.
///
/// Comment depth scales post cost instead of adding to it: comments are only
/// fetched for posts that were already retrieved. Direct search is one
/// shallow call per query, so `direct` does not contribute.
pub fn estimate(query_count: usize, _direct: u32, post: u32, comment: u32) -> f64 {
    query_count as f64 * post as f64 * (1.0 + comment as f64 / 10.0)
}

/// Rejects scans whose estimated cost exceeds a fixed ceiling, before any
/// API call is made.
#[derive(Debug, Clone, Copy)]
pub struct WorkloadPolicy {
    ceiling: f64,
}

impl Default for WorkloadPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_WORKLOAD_CEILING)
    }
}

impl WorkloadPolicy {
    pub fn new(ceiling: f64) -> Self {
        Self { ceiling }
    }

    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }

    /// Returns the estimated cost if the scan is allowed.
    pub fn check(&self, query_count: usize, depths: SearchDepths) -> Result<f64> {
        let cost = estimate(query_count, depths.direct, depths.post, depths.comment);
        if cost > self.ceiling {
            warn!(
                cost,
                ceiling = self.ceiling,
                queries = query_count,
                post_depth = depths.post,
                comment_depth = depths.comment,
                "Scan rejected: workload too high"
            );
            return Err(ScanError::WorkloadExceeded {
                cost,
                ceiling: self.ceiling,
            });
        }
        info!(cost, ceiling = self.ceiling, "Workload approved");
        Ok(cost)
    }
}
