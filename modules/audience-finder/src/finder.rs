//! AudienceFinder: raw keywords in, ranked communities out.
//!
//! normalize → workload gate → cache → ScanController. Each stage can stop
//! the request before anything reaches Reddit.
//!
//! Every identity gets its own controller, so scans from different users
//! run side by side and `AlreadyRunning` only refuses a user's second scan.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::info;

use crate::cache::{CacheKey, ResultCache};
use crate::config::Config;
use crate::discovery::SearchDepths;
use crate::error::Result;
use crate::pipeline::scan::{ScanController, ScanOutcome, ScanSession};
use crate::query::QuerySet;
use crate::scheduling::workload::WorkloadPolicy;
use crate::traits::RedditApi;

pub struct AudienceFinder {
    controllers: Mutex<HashMap<String, Arc<ScanController>>>,
    policy: WorkloadPolicy,
    cache: ResultCache,
}

impl Default for AudienceFinder {
    fn default() -> Self {
        Self::new(WorkloadPolicy::default(), crate::cache::DEFAULT_CACHE_TTL)
    }
}

impl AudienceFinder {
    pub fn new(policy: WorkloadPolicy, cache_ttl: Duration) -> Self {
        Self {
            controllers: Mutex::new(HashMap::new()),
            policy,
            cache: ResultCache::new(cache_ttl),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            WorkloadPolicy::new(config.workload_ceiling),
            config.result_cache_ttl,
        )
    }

    /// Scan for the queries in `raw` (one per line).
    pub async fn find(
        &self,
        api: &dyn RedditApi,
        raw: &str,
        depths: SearchDepths,
        session: &ScanSession,
    ) -> Result<ScanOutcome> {
        let queries = QuerySet::parse(raw)?;
        self.find_queries(api, &queries, depths, session).await
    }

    /// Same as `find` for queries that are already normalized.
    pub async fn find_queries(
        &self,
        api: &dyn RedditApi,
        queries: &QuerySet,
        depths: SearchDepths,
        session: &ScanSession,
    ) -> Result<ScanOutcome> {
        let cost = self.policy.check(queries.len(), depths)?;

        let key = CacheKey::new(&session.identity, queries, depths);
        let evicted = self.cache.evict_expired();
        if evicted > 0 {
            info!(evicted, "Evicted expired scan results");
        }

        info!(
            scan_id = %session.scan_id,
            queries = queries.len(),
            cost,
            "Scan request accepted"
        );

        let controller = self.controller(&session.identity);
        self.cache
            .get_or_scan(&key, || controller.run(api, queries, depths, session))
            .await
    }

    /// The controller that runs scans for `identity`, created on first use.
    pub fn controller(&self, identity: &str) -> Arc<ScanController> {
        let mut controllers = self
            .controllers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        controllers
            .entry(identity.to_string())
            .or_insert_with(|| Arc::new(ScanController::new()))
            .clone()
    }

    pub fn policy(&self) -> WorkloadPolicy {
        self.policy
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanError;
    use crate::testing::{subreddit, test_session, MockReddit};

    fn depths(direct: u32, post: u32, comment: u32) -> SearchDepths {
        SearchDepths {
            direct,
            post,
            comment,
        }
    }

    #[tokio::test]
    async fn blank_input_never_reaches_api() {
        let api = MockReddit::new();
        let finder = AudienceFinder::default();

        let result = finder
            .find(&api, "  \n\n   \n", depths(5, 5, 5), &test_session("u"))
            .await;

        assert!(matches!(result, Err(ScanError::EmptyInput)));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn heavy_scan_is_rejected_before_any_call() {
        let api = MockReddit::new();
        let finder = AudienceFinder::default();
        let raw = (0..10).map(|i| format!("q{i}")).collect::<Vec<_>>().join("\n");

        let result = finder
            .find(&api, &raw, depths(10, 100, 20), &test_session("u"))
            .await;

        match result {
            Err(ScanError::WorkloadExceeded { cost, ceiling }) => {
                assert_eq!(cost, 3000.0 * 10.0);
                assert_eq!(ceiling, 5000.0);
            }
            other => panic!("expected workload rejection, got {other:?}"),
        }
        assert!(api.calls().is_empty());
        assert_eq!(finder.controller("u").last_state(), crate::ScanState::Idle);
    }

    #[tokio::test]
    async fn cache_is_scoped_per_identity() {
        let api = MockReddit::new().on_subreddits("q", vec![subreddit("x", 1)]);
        let finder = AudienceFinder::default();

        finder
            .find(&api, "q", depths(5, 0, 0), &test_session("alice"))
            .await
            .unwrap();
        finder
            .find(&api, "q", depths(5, 0, 0), &test_session("bob"))
            .await
            .unwrap();

        assert_eq!(api.calls().len(), 2);
        assert_eq!(finder.cache().len(), 2);
    }

    #[tokio::test]
    async fn different_identities_scan_concurrently() {
        let api = MockReddit::new()
            .yielding()
            .on_subreddits("a", vec![subreddit("x", 1)])
            .on_subreddits("b", vec![subreddit("y", 2)]);
        let finder = AudienceFinder::default();
        let alice = test_session("alice");
        let bob = test_session("bob");

        let (a, b) = tokio::join!(
            finder.find(&api, "a", depths(5, 5, 0), &alice),
            finder.find(&api, "b", depths(5, 5, 0), &bob),
        );

        assert!(matches!(a, Ok(ScanOutcome::Completed(ref t)) if t.rows()[0].community == "x"));
        assert!(matches!(b, Ok(ScanOutcome::Completed(ref t)) if t.rows()[0].community == "y"));
        assert_eq!(finder.controller("alice").last_state(), crate::ScanState::Completed);
        assert_eq!(finder.controller("bob").last_state(), crate::ScanState::Completed);
    }

    #[tokio::test]
    async fn same_identity_cannot_overlap() {
        let api = MockReddit::new().yielding();
        let finder = AudienceFinder::default();
        let first = test_session("alice");
        let second = test_session("alice");

        let (a, b) = tokio::join!(
            finder.find(&api, "a", depths(5, 5, 0), &first),
            finder.find(&api, "b", depths(5, 5, 0), &second),
        );

        assert!(a.is_ok());
        assert!(matches!(b, Err(ScanError::AlreadyRunning)));
    }
}
