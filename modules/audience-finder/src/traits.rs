// The API handle seam.
//
// RedditApi is everything the discovery strategies need from Reddit. The
// production impl forwards to reddit_client::RedditClient; tests use
// testing::MockReddit so no network is touched.

use async_trait::async_trait;
use reddit_client::{Comment, Post, RedditClient, SearchSort, Subreddit, TimeWindow};

#[async_trait]
pub trait RedditApi: Send + Sync {
    /// Search communities by name and description.
    async fn search_subreddits(&self, query: &str, limit: u32)
        -> reddit_client::Result<Vec<Subreddit>>;

    /// Search link posts platform-wide.
    async fn search_posts(
        &self,
        query: &str,
        limit: u32,
        sort: SearchSort,
        window: TimeWindow,
    ) -> reddit_client::Result<Vec<Post>>;

    /// Top-level comments of one post, without "load more" expansion.
    async fn top_level_comments(
        &self,
        post_id: &str,
        limit: u32,
    ) -> reddit_client::Result<Vec<Comment>>;
}

#[async_trait]
impl RedditApi for RedditClient {
    async fn search_subreddits(
        &self,
        query: &str,
        limit: u32,
    ) -> reddit_client::Result<Vec<Subreddit>> {
        self.search_subreddits(query, limit).await
    }

    async fn search_posts(
        &self,
        query: &str,
        limit: u32,
        sort: SearchSort,
        window: TimeWindow,
    ) -> reddit_client::Result<Vec<Post>> {
        self.search_posts(query, limit, sort, window).await
    }

    async fn top_level_comments(
        &self,
        post_id: &str,
        limit: u32,
    ) -> reddit_client::Result<Vec<Comment>> {
        self.top_level_comments(post_id, limit).await
    }
}
