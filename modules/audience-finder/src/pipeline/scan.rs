//! ScanController: runs every strategy for every query and produces the
//! ranked table.
//!
//! State machine: `Idle → Running → {Completed, Cancelled, Failed} → Idle`.
//! Queries run sequentially in submission order, strategies sequentially per
//! query, so the upstream per-caller budget is never hit concurrently.
//! Cancellation is cooperative: the flag is polled before each query and
//! around every strategy unit, and an in-flight call is allowed to finish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{error, info};
use uuid::Uuid;

use crate::discovery::{
    check_cancelled_flag, comments::comment_matches, direct::direct_matches,
    posts::post_matches, Interrupt, SearchDepths,
};
use crate::error::{Result, ScanError};
use crate::pipeline::aggregate::CommunityAggregator;
use crate::pipeline::scoring::rank;
use crate::pipeline::stats::ScanStats;
use crate::query::QuerySet;
use crate::report::RankedTable;
use crate::traits::RedditApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

/// What a scan that was allowed to start ended with.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Completed(RankedTable),
    /// Stopped by the user. Partial evidence is discarded: scoring an
    /// incomplete sweep would rank communities misleadingly.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanProgress {
    /// 0.0 ..= 1.0, monotonic within a scan.
    pub fraction: f32,
    pub label: String,
}

impl ScanProgress {
    pub fn new(fraction: f32, label: impl Into<String>) -> Self {
        Self {
            fraction,
            label: label.into(),
        }
    }
}

/// Where progress updates go (a progress bar, a log, a websocket).
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: &ScanProgress);
}

/// Logs progress through tracing.
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, progress: &ScanProgress) {
        info!(
            percent = (progress.fraction * 100.0).round() as u32,
            label = progress.label.as_str(),
            "Scan progress"
        );
    }
}

/// Per-invocation context: who is scanning, how to stop, where to report.
#[derive(Clone)]
pub struct ScanSession {
    pub scan_id: Uuid,
    /// Stable per-user key from the session layer. Used for cache keys, never the API handle.
    pub identity: String,
    pub cancelled: Arc<AtomicBool>,
    pub progress: Arc<dyn ProgressSink>,
}

impl ScanSession {
    pub fn new(
        identity: impl Into<String>,
        cancelled: Arc<AtomicBool>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            scan_id: Uuid::new_v4(),
            identity: identity.into(),
            cancelled,
            progress,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

pub struct ScanController {
    state: Mutex<ScanState>,
    last_state: Mutex<ScanState>,
    last_stats: Mutex<Option<ScanStats>>,
}

impl Default for ScanController {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanController {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ScanState::Idle),
            last_state: Mutex::new(ScanState::Idle),
            last_stats: Mutex::new(None),
        }
    }

    /// Current state; `Idle` whenever no scan is in flight.
    pub fn state(&self) -> ScanState {
        *lock(&self.state)
    }

    /// Terminal state of the most recent scan (`Idle` if none has run).
    pub fn last_state(&self) -> ScanState {
        *lock(&self.last_state)
    }

    /// Counters from the most recent scan that reached a terminal state.
    pub fn last_stats(&self) -> Option<ScanStats> {
        lock(&self.last_stats).clone()
    }

    /// Run one scan. Queries must already be normalized and workload-approved.
    pub async fn run(
        &self,
        api: &dyn RedditApi,
        queries: &QuerySet,
        depths: SearchDepths,
        session: &ScanSession,
    ) -> Result<ScanOutcome> {
        let mut guard = self.begin(session)?;

        let mut stats = ScanStats::default();
        let result = sweep(api, queries, depths, session, &mut stats).await;

        guard.terminal = match &result {
            Ok(ScanOutcome::Completed(_)) => ScanState::Completed,
            Ok(ScanOutcome::Cancelled) => ScanState::Cancelled,
            Err(_) => ScanState::Failed,
        };
        guard.stats = Some(stats);
        result
    }

    fn begin<'a>(&'a self, session: &'a ScanSession) -> Result<RunGuard<'a>> {
        let mut state = lock(&self.state);
        if *state == ScanState::Running {
            return Err(ScanError::AlreadyRunning);
        }
        *state = ScanState::Running;

        Ok(RunGuard {
            controller: self,
            cancelled: session.cancelled.as_ref(),
            terminal: ScanState::Failed,
            stats: None,
        })
    }
}

/// Returns the controller to `Idle` and clears the cancel flag however the
/// run ends, including when the future is dropped mid-scan.
struct RunGuard<'a> {
    controller: &'a ScanController,
    cancelled: &'a AtomicBool,
    terminal: ScanState,
    stats: Option<ScanStats>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.cancelled.store(false, Ordering::Relaxed);
        *lock(&self.controller.last_state) = self.terminal;
        *lock(&self.controller.last_stats) = self.stats.take();
        *lock(&self.controller.state) = ScanState::Idle;
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn sweep(
    api: &dyn RedditApi,
    queries: &QuerySet,
    depths: SearchDepths,
    session: &ScanSession,
    stats: &mut ScanStats,
) -> Result<ScanOutcome> {
    let total = queries.len().max(1);
    let mut aggregator = CommunityAggregator::new();

    info!(
        scan_id = %session.scan_id,
        identity = session.identity.as_str(),
        queries = queries.len(),
        direct_depth = depths.direct,
        post_depth = depths.post,
        comment_depth = depths.comment,
        "Scan starting"
    );

    for (i, query) in queries.iter().enumerate() {
        session.progress.report(&ScanProgress::new(
            i as f32 / total as f32,
            format!("Scanning \"{query}\" ({}/{})", i + 1, queries.len()),
        ));

        match scan_query(api, query, depths, &session.cancelled, &mut aggregator, stats).await {
            Ok(()) => stats.queries_scanned += 1,
            Err(Interrupt::Cancelled) => {
                info!(
                    scan_id = %session.scan_id,
                    query,
                    queries_scanned = stats.queries_scanned,
                    communities_discarded = aggregator.len(),
                    "Scan cancelled by user, discarding partial results"
                );
                return Ok(ScanOutcome::Cancelled);
            }
            Err(Interrupt::Auth(e)) => {
                error!(scan_id = %session.scan_id, query, error = %e, "Scan failed: API handle rejected");
                return Err(ScanError::UpstreamAuth(e.to_string()));
            }
        }
    }

    session
        .progress
        .report(&ScanProgress::new(1.0, "Finalizing"));

    let ranked = rank(aggregator.into_records());
    stats.communities_found = ranked.len() as u32;
    info!(scan_id = %session.scan_id, "{stats}");

    Ok(ScanOutcome::Completed(RankedTable::from_scored(ranked)))
}

async fn scan_query(
    api: &dyn RedditApi,
    query: &str,
    depths: SearchDepths,
    cancelled: &AtomicBool,
    aggregator: &mut CommunityAggregator,
    stats: &mut ScanStats,
) -> std::result::Result<(), Interrupt> {
    check_cancelled_flag(cancelled)?;

    let direct = direct_matches(api, query, depths.direct, cancelled, stats).await?;
    aggregator.observe_all(direct, query);

    let posts = post_matches(api, query, depths.post, cancelled, stats).await?;
    aggregator.observe_all(posts.sightings, query);

    if depths.comment > 0 {
        let comments =
            comment_matches(api, query, &posts.posts, depths.comment, cancelled, stats).await?;
        aggregator.observe_all(comments, query);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{post, subreddit, test_session, ApiCall, MockReddit, RecordingProgress};
    use crate::types::EvidenceTag;
    use reddit_client::RedditError;

    fn depths(direct: u32, post: u32, comment: u32) -> SearchDepths {
        SearchDepths {
            direct,
            post,
            comment,
        }
    }

    #[tokio::test]
    async fn reports_progress_per_query_then_finalizing() {
        let api = MockReddit::new();
        let progress = Arc::new(RecordingProgress::new());
        let session = test_session("tester").with_progress(progress.clone());
        let queries = QuerySet::parse("a\nb\nc\nd").unwrap();

        let outcome = ScanController::new()
            .run(&api, &queries, depths(1, 1, 0), &session)
            .await
            .unwrap();
        assert!(matches!(outcome, ScanOutcome::Completed(ref t) if t.is_empty()));

        let fractions: Vec<f32> = progress.reports().iter().map(|p| p.fraction).collect();
        assert_eq!(fractions, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(progress.reports().last().unwrap().label, "Finalizing");
    }

    #[tokio::test]
    async fn auth_failure_fails_scan_and_returns_to_idle() {
        let api = MockReddit::new().unauthorized();
        let session = test_session("tester");
        let controller = ScanController::new();
        let queries = QuerySet::parse("a").unwrap();

        let result = controller.run(&api, &queries, depths(5, 5, 5), &session).await;

        assert!(matches!(result, Err(ScanError::UpstreamAuth(_))));
        assert_eq!(controller.last_state(), ScanState::Failed);
        assert_eq!(controller.state(), ScanState::Idle);
    }

    #[tokio::test]
    async fn non_fatal_failures_do_not_stop_other_strategies() {
        let api = MockReddit::new()
            .fail_subreddits(
                "hostels",
                RedditError::Api {
                    status: 503,
                    message: "busy".into(),
                },
            )
            .on_posts("hostels", vec![post("p1", "backpacking", 800)]);
        let session = test_session("tester");
        let controller = ScanController::new();
        let queries = QuerySet::parse("hostels").unwrap();

        let outcome = controller
            .run(&api, &queries, depths(5, 5, 0), &session)
            .await
            .unwrap();

        let ScanOutcome::Completed(table) = outcome else {
            panic!("expected completed scan");
        };
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].found_via, EvidenceTag::PostMatch.name());
        assert_eq!(controller.last_stats().unwrap().direct_failures, 1);
    }

    #[tokio::test]
    async fn comment_strategy_only_expands_accepted_posts() {
        let mut nsfw = post("p2", "afterdark", 10);
        nsfw.over_18 = true;
        let api = MockReddit::new()
            .on_subreddits("q", vec![subreddit("direct_only", 5)])
            .on_posts("q", vec![post("p1", "ok", 1), nsfw]);
        let session = test_session("tester");
        let queries = QuerySet::parse("q").unwrap();

        ScanController::new()
            .run(&api, &queries, depths(5, 5, 3), &session)
            .await
            .unwrap();

        assert_eq!(
            api.calls(),
            vec![
                ApiCall::SearchSubreddits("q".into()),
                ApiCall::SearchPosts("q".into()),
                ApiCall::Comments("p1".into()),
            ]
        );
    }

    #[tokio::test]
    async fn flag_raised_before_start_cancels_without_calls() {
        let api = MockReddit::new().on_subreddits("q", vec![subreddit("x", 1)]);
        let session = test_session("tester");
        session.cancel();
        let controller = ScanController::new();
        let queries = QuerySet::parse("q\nr\ns").unwrap();

        let outcome = controller
            .run(&api, &queries, depths(5, 5, 5), &session)
            .await
            .unwrap();

        assert_eq!(outcome, ScanOutcome::Cancelled);
        assert!(api.calls().is_empty());
        assert_eq!(controller.last_state(), ScanState::Cancelled);
        assert!(!session.is_cancelled());
    }

    #[tokio::test]
    async fn flag_is_cleared_for_the_next_run() {
        let api = MockReddit::new().on_subreddits("q", vec![subreddit("x", 1)]);
        let session = test_session("tester");
        session.cancel();
        let controller = ScanController::new();
        let queries = QuerySet::parse("q").unwrap();

        let first = controller.run(&api, &queries, depths(5, 0, 0), &session).await.unwrap();
        let second = controller.run(&api, &queries, depths(5, 0, 0), &session).await.unwrap();

        assert_eq!(first, ScanOutcome::Cancelled);
        assert!(matches!(second, ScanOutcome::Completed(ref t) if t.len() == 1));
    }
}
