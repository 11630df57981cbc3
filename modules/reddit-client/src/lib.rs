pub mod error;
pub mod types;

pub use error::{RedditError, Result};
pub use types::{
    Comment, CommentChild, Identity, Listing, MoreComments, Post, SearchSort, Subreddit,
    TimeWindow, TokenGrant, PROFILE_PREFIX,
};

use std::time::Duration;

use serde::de::DeserializeOwned;
use types::{CommentThread, Thing, TokenResponse};

const OAUTH_BASE_URL: &str = "https://oauth.reddit.com";
const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Reddit caps `limit` at 100 for every listing endpoint.
const MAX_LIMIT: u32 = 100;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct RedditClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl RedditClient {
    /// Build a client around an already-issued bearer token.
    pub fn new(access_token: &str, user_agent: &str) -> Result<Self> {
        Ok(Self {
            client: http_client(user_agent)?,
            base_url: OAUTH_BASE_URL.to_string(),
            token: access_token.to_string(),
        })
    }

    /// Point the client at a different API host (e.g. a local stub server).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Exchange app credentials for a bearer token and return a ready client.
    pub async fn authenticate(
        client_id: &str,
        client_secret: &str,
        grant: &TokenGrant,
        user_agent: &str,
    ) -> Result<Self> {
        let http = http_client(user_agent)?;

        let form: Vec<(&str, &str)> = match grant {
            TokenGrant::ClientCredentials => vec![("grant_type", "client_credentials")],
            TokenGrant::RefreshToken(token) => vec![
                ("grant_type", "refresh_token"),
                ("refresh_token", token.as_str()),
            ],
        };

        let resp = http
            .post(TOKEN_URL)
            .basic_auth(client_id, Some(client_secret))
            .form(&form)
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(RedditError::Unauthorized {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RedditError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let token: TokenResponse = resp.json().await?;
        if let Some(error) = token.error {
            return Err(RedditError::TokenGrant(error));
        }
        let access_token = token
            .access_token
            .ok_or_else(|| RedditError::TokenGrant("response carried no access_token".into()))?;

        tracing::info!(
            expires_in = token.expires_in.unwrap_or_default(),
            scope = token.scope.as_deref().unwrap_or(""),
            "Obtained Reddit access token"
        );

        Ok(Self {
            client: http,
            base_url: OAUTH_BASE_URL.to_string(),
            token: access_token,
        })
    }

    /// The account behind the token. Fails with `Unauthorized` for app-only tokens.
    pub async fn me(&self) -> Result<Identity> {
        self.get_json("/api/v1/me", &[]).await
    }

    /// Search communities by name and description.
    pub async fn search_subreddits(&self, query: &str, limit: u32) -> Result<Vec<Subreddit>> {
        let limit = limit.min(MAX_LIMIT).to_string();
        let listing: Listing<Thing<Subreddit>> = self
            .get_json(
                "/subreddits/search",
                &[("q", query), ("limit", &limit), ("raw_json", "1")],
            )
            .await?;

        let subs = listing.into_items();
        tracing::debug!(query, count = subs.len(), "Subreddit search returned");
        Ok(subs)
    }

    /// Search link posts across all of Reddit.
    pub async fn search_posts(
        &self,
        query: &str,
        limit: u32,
        sort: SearchSort,
        window: TimeWindow,
    ) -> Result<Vec<Post>> {
        let limit = limit.min(MAX_LIMIT).to_string();
        let listing: Listing<Thing<Post>> = self
            .get_json(
                "/search",
                &[
                    ("q", query),
                    ("limit", &limit),
                    ("sort", sort.as_str()),
                    ("t", window.as_str()),
                    ("type", "link"),
                    ("raw_json", "1"),
                ],
            )
            .await?;

        let posts = listing.into_items();
        tracing::debug!(query, count = posts.len(), "Post search returned");
        Ok(posts)
    }

    /// Top-level comments of a post. "Load more" stubs are dropped, never expanded.
    pub async fn top_level_comments(&self, post_id: &str, limit: u32) -> Result<Vec<Comment>> {
        let path = format!("/comments/{post_id}");
        let limit = limit.min(MAX_LIMIT).to_string();
        let (_post, comments): CommentThread = self
            .get_json(
                &path,
                &[
                    ("limit", &limit),
                    ("depth", "1"),
                    ("sort", "top"),
                    ("raw_json", "1"),
                ],
            )
            .await?;

        Ok(flatten_comments(comments))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(RedditError::Unauthorized {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RedditError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

fn http_client(user_agent: &str) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(REQUEST_TIMEOUT)
        .build()?)
}

fn flatten_comments(listing: Listing<CommentChild>) -> Vec<Comment> {
    listing
        .data
        .children
        .into_iter()
        .filter_map(|child| match child {
            CommentChild::Comment(c) => Some(c),
            CommentChild::More(_) => None,
        })
        .collect()
}
