use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::discovery::SearchDepths;
use crate::error::Result;
use crate::pipeline::scan::ScanOutcome;
use crate::query::QuerySet;
use crate::report::RankedTable;

/// How long a completed scan is served from memory.
pub const DEFAULT_CACHE_TTL: StdDuration = StdDuration::from_secs(3600);

/// Identifies one scan configuration for one user. Built only from plain
/// values; the API handle never takes part.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub identity: String,
    pub queries: QuerySet,
    pub depths: SearchDepths,
}

impl CacheKey {
    pub fn new(identity: &str, queries: &QuerySet, depths: SearchDepths) -> Self {
        Self {
            identity: identity.to_string(),
            queries: queries.clone(),
            depths,
        }
    }

    /// Hex SHA-256 over length-prefixed fields.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        let mut field = |bytes: &[u8]| {
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        };

        field(self.identity.as_bytes());
        for query in self.queries.iter() {
            field(query.as_bytes());
        }
        field(&self.depths.direct.to_le_bytes());
        field(&self.depths.post.to_le_bytes());
        field(&self.depths.comment.to_le_bytes());

        hex::encode(hasher.finalize())
    }
}

#[derive(Debug, Clone)]
struct CachedScan {
    table: RankedTable,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    hit_count: u32,
}

/// Memoizes completed scans for a bounded time window.
pub struct ResultCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedScan>>,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl ResultCache {
    pub fn new(ttl: StdDuration) -> Self {
        Self {
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::days(36_500)),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a cached table. Returns None if missing or expired.
    pub fn get(&self, key: &CacheKey) -> Option<RankedTable> {
        let digest = key.digest();
        let mut entries = self.lock();
        let entry = entries.get_mut(&digest)?;
        if entry.expires_at <= Utc::now() {
            return None;
        }
        entry.hit_count += 1;
        debug!(
            key = digest.as_str(),
            hit_count = entry.hit_count,
            cached_at = %entry.created_at,
            "Result cache hit"
        );
        Some(entry.table.clone())
    }

    /// Store a table (upsert), restarting its TTL.
    pub fn set(&self, key: &CacheKey, table: RankedTable) {
        let now = Utc::now();
        let expires_at = now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.lock().insert(
            key.digest(),
            CachedScan {
                table,
                created_at: now,
                expires_at,
                hit_count: 0,
            },
        );
    }

    /// Cached table on a hit; otherwise run `scan` and remember a completed result.
    /// Cancelled and failed scans are never stored.
    pub async fn get_or_scan<F, Fut>(&self, key: &CacheKey, scan: F) -> Result<ScanOutcome>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ScanOutcome>>,
    {
        if let Some(table) = self.get(key) {
            info!(
                identity = key.identity.as_str(),
                queries = key.queries.len(),
                rows = table.len(),
                "Serving scan from cache"
            );
            return Ok(ScanOutcome::Completed(table));
        }

        let outcome = scan().await?;
        if let ScanOutcome::Completed(ref table) = outcome {
            self.set(key, table.clone());
        }
        Ok(outcome)
    }

    /// Delete expired entries. Returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CachedScan>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(identity: &str, raw: &str, comment: u32) -> CacheKey {
        CacheKey::new(
            identity,
            &QuerySet::parse(raw).unwrap(),
            SearchDepths {
                direct: 5,
                post: 5,
                comment,
            },
        )
    }

    #[test]
    fn digest_ignores_input_order_but_not_depths_or_identity() {
        assert_eq!(key("alice", "a\nb", 5).digest(), key("alice", "b\na", 5).digest());
        assert_ne!(key("alice", "a\nb", 5).digest(), key("alice", "a\nb", 6).digest());
        assert_ne!(key("alice", "a\nb", 5).digest(), key("bob", "a\nb", 5).digest());
    }

    #[test]
    fn digest_is_not_fooled_by_joined_queries() {
        assert_ne!(key("u", "ab\nc", 0).digest(), key("u", "a\nbc", 0).digest());
    }

    #[test]
    fn hit_within_ttl_returns_stored_table() {
        let cache = ResultCache::default();
        let k = key("alice", "travel", 0);
        assert!(cache.get(&k).is_none());

        cache.set(&k, RankedTable::default());
        assert_eq!(cache.get(&k), Some(RankedTable::default()));
    }

    #[test]
    fn zero_ttl_expires_immediately_and_is_evicted() {
        let cache = ResultCache::new(StdDuration::ZERO);
        let k = key("alice", "travel", 0);
        cache.set(&k, RankedTable::default());

        assert!(cache.get(&k).is_none());
        assert_eq!(cache.evict_expired(), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn cancelled_outcome_is_not_stored() {
        let cache = ResultCache::default();
        let k = key("alice", "travel", 0);

        let outcome = cache
            .get_or_scan(&k, || async { Ok::<_, crate::error::ScanError>(ScanOutcome::Cancelled) })
            .await
            .unwrap();

        assert_eq!(outcome, ScanOutcome::Cancelled);
        assert!(cache.is_empty());
    }
}
