// Test mocks for the scan pipeline.
//
// - MockReddit (RedditApi): HashMap-based query→results, records every call
// - RecordingProgress (ProgressSink): keeps every progress update
//
// Plus helpers for constructing Subreddit, Post, Comment and ScanSession.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use reddit_client::{Comment, Post, RedditError, SearchSort, Subreddit, TimeWindow};

use crate::pipeline::scan::{ProgressSink, ScanProgress, ScanSession, TracingProgress};
use crate::traits::RedditApi;

// ---------------------------------------------------------------------------
// MockReddit
// ---------------------------------------------------------------------------

/// One upstream call, in the order it was made.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ApiCall {
    SearchSubreddits(String),
    SearchPosts(String),
    Comments(String),
}

/// In-memory Reddit. Unregistered queries return empty results.
/// Builder pattern: `.on_subreddits()`, `.on_posts()`, `.on_comments()`,
/// `.fail_*()` for per-key errors, `.cancel_during*()` to raise a cancel
/// flag mid-request, `.unauthorized()` to reject everything.
#[derive(Default)]
pub struct MockReddit {
    subreddits: HashMap<String, Vec<Subreddit>>,
    posts: HashMap<String, Vec<Post>>,
    comments: HashMap<String, Vec<Comment>>,
    subreddit_failures: HashMap<String, RedditError>,
    comment_failures: HashMap<String, RedditError>,
    cancel_on: HashMap<ApiCall, Arc<AtomicBool>>,
    unauthorized: bool,
    yielding: bool,
    calls: Mutex<Vec<ApiCall>>,
}

impl MockReddit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_subreddits(mut self, query: &str, subreddits: Vec<Subreddit>) -> Self {
        self.subreddits.insert(query.to_string(), subreddits);
        self
    }

    pub fn on_posts(mut self, query: &str, posts: Vec<Post>) -> Self {
        self.posts.insert(query.to_string(), posts);
        self
    }

    pub fn on_comments(mut self, post_id: &str, comments: Vec<Comment>) -> Self {
        self.comments.insert(post_id.to_string(), comments);
        self
    }

    pub fn fail_subreddits(mut self, query: &str, error: RedditError) -> Self {
        self.subreddit_failures.insert(query.to_string(), error);
        self
    }

    pub fn fail_comments(mut self, post_id: &str, error: RedditError) -> Self {
        self.comment_failures.insert(post_id.to_string(), error);
        self
    }

    /// Raise `flag` while the subreddit search for `query` is in flight,
    /// like a user pressing cancel mid-request.
    pub fn cancel_during(mut self, query: &str, flag: Arc<AtomicBool>) -> Self {
        self.cancel_on
            .insert(ApiCall::SearchSubreddits(query.to_string()), flag);
        self
    }

    /// Raise `flag` while the post search for `query` is in flight.
    pub fn cancel_during_posts(mut self, query: &str, flag: Arc<AtomicBool>) -> Self {
        self.cancel_on.insert(ApiCall::SearchPosts(query.to_string()), flag);
        self
    }

    /// Raise `flag` while the comments of `post_id` are being fetched.
    pub fn cancel_during_comments(mut self, post_id: &str, flag: Arc<AtomicBool>) -> Self {
        self.cancel_on.insert(ApiCall::Comments(post_id.to_string()), flag);
        self
    }

    /// Yield to the runtime inside every call so concurrent scans interleave.
    pub fn yielding(mut self) -> Self {
        self.yielding = true;
        self
    }

    /// Every call fails as if the access token were revoked.
    pub fn unauthorized(mut self) -> Self {
        self.unauthorized = true;
        self
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Queries that reached any endpoint, first-seen order.
    pub fn queried(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for call in self.calls() {
            let q = match call {
                ApiCall::SearchSubreddits(q) | ApiCall::SearchPosts(q) => q,
                ApiCall::Comments(_) => continue,
            };
            if !seen.contains(&q) {
                seen.push(q);
            }
        }
        seen
    }

    async fn record(&self, call: ApiCall) -> reddit_client::Result<()> {
        if self.yielding {
            tokio::task::yield_now().await;
        }
        if let Some(flag) = self.cancel_on.get(&call) {
            flag.store(true, Ordering::Relaxed);
        }
        self.calls.lock().unwrap().push(call);
        if self.unauthorized {
            return Err(RedditError::Unauthorized { status: 401 });
        }
        Ok(())
    }
}

#[async_trait]
impl RedditApi for MockReddit {
    async fn search_subreddits(
        &self,
        query: &str,
        limit: u32,
    ) -> reddit_client::Result<Vec<Subreddit>> {
        self.record(ApiCall::SearchSubreddits(query.to_string()))
            .await?;
        if let Some(e) = self.subreddit_failures.get(query) {
            return Err(clone_error(e));
        }
        Ok(take(self.subreddits.get(query), limit))
    }

    async fn search_posts(
        &self,
        query: &str,
        limit: u32,
        _sort: SearchSort,
        _window: TimeWindow,
    ) -> reddit_client::Result<Vec<Post>> {
        self.record(ApiCall::SearchPosts(query.to_string())).await?;
        Ok(take(self.posts.get(query), limit))
    }

    async fn top_level_comments(
        &self,
        post_id: &str,
        limit: u32,
    ) -> reddit_client::Result<Vec<Comment>> {
        self.record(ApiCall::Comments(post_id.to_string())).await?;
        if let Some(e) = self.comment_failures.get(post_id) {
            return Err(clone_error(e));
        }
        Ok(take(self.comments.get(post_id), limit))
    }
}

fn take<T: Clone>(items: Option<&Vec<T>>, limit: u32) -> Vec<T> {
    items
        .map(|v| v.iter().take(limit as usize).cloned().collect())
        .unwrap_or_default()
}

/// RedditError carries no source and is cheap to rebuild.
pub fn clone_error(e: &RedditError) -> RedditError {
    match e {
        RedditError::Network(m) => RedditError::Network(m.clone()),
        RedditError::Unauthorized { status } => RedditError::Unauthorized { status: *status },
        RedditError::Api { status, message } => RedditError::Api {
            status: *status,
            message: message.clone(),
        },
        RedditError::Parse(m) => RedditError::Parse(m.clone()),
        RedditError::TokenGrant(m) => RedditError::TokenGrant(m.clone()),
    }
}

// ---------------------------------------------------------------------------
// RecordingProgress
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingProgress {
    reports: Mutex<Vec<ScanProgress>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<ScanProgress> {
        self.reports.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn report(&self, progress: &ScanProgress) {
        self.reports.lock().unwrap().push(progress.clone());
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn subreddit(name: &str, members: u64) -> Subreddit {
    Subreddit {
        display_name: name.to_string(),
        subscribers: Some(members),
        over18: Some(false),
        subreddit_type: Some("public".to_string()),
        public_description: None,
    }
}

/// A fresh, safe-for-work post in `subreddit`.
pub fn post(id: &str, subreddit: &str, members: u64) -> Post {
    Post {
        id: id.to_string(),
        title: format!("Post {id}"),
        selftext: String::new(),
        subreddit: subreddit.to_string(),
        subreddit_name_prefixed: Some(format!("r/{subreddit}")),
        subreddit_subscribers: Some(members),
        over_18: false,
        num_comments: Some(0),
        created_utc: Some(Utc::now().timestamp() as f64),
        permalink: Some(format!("/r/{subreddit}/comments/{id}/")),
    }
}

pub fn comment(id: &str, body: &str) -> Comment {
    Comment {
        id: id.to_string(),
        body: body.to_string(),
        author: Some("someone".to_string()),
        score: Some(1),
    }
}

pub fn test_session(identity: &str) -> ScanSession {
    ScanSession::new(
        identity,
        Arc::new(AtomicBool::new(false)),
        Arc::new(TracingProgress),
    )
}
