use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Display-name prefix Reddit gives the pseudo-subreddit behind every user profile.
pub const PROFILE_PREFIX: &str = "u_";

// --- Listing envelope ---

/// Reddit wraps every collection in `{"kind": "Listing", "data": {...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Listing<C> {
    pub data: ListingData<C>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingData<C> {
    pub children: Vec<C>,
    #[serde(default)]
    pub after: Option<String>,
}

/// A single `{"kind": "t5", "data": {...}}` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct Thing<T> {
    pub kind: String,
    pub data: T,
}

impl<T> Listing<Thing<T>> {
    pub fn into_items(self) -> Vec<T> {
        self.data.children.into_iter().map(|c| c.data).collect()
    }
}

// --- Subreddits ---

/// A subreddit as returned by `/subreddits/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct Subreddit {
    pub display_name: String,
    /// Null for quarantined or banned communities.
    #[serde(default)]
    pub subscribers: Option<u64>,
    #[serde(default)]
    pub over18: Option<bool>,
    #[serde(default)]
    pub subreddit_type: Option<String>,
    #[serde(default)]
    pub public_description: Option<String>,
}

impl Subreddit {
    pub fn is_profile(&self) -> bool {
        self.display_name.starts_with(PROFILE_PREFIX)
            || self.subreddit_type.as_deref() == Some("user")
    }

    pub fn member_count(&self) -> u64 {
        self.subscribers.unwrap_or(0)
    }
}

// --- Posts ---

/// Sort order for `/search`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSort {
    Relevance,
    Hot,
    Top,
    New,
    Comments,
}

impl SearchSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchSort::Relevance => "relevance",
            SearchSort::Hot => "hot",
            SearchSort::Top => "top",
            SearchSort::New => "new",
            SearchSort::Comments => "comments",
        }
    }
}

/// Time filter (`t=`) for `/search`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Day,
    Week,
    Month,
    Year,
    All,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
            TimeWindow::Month => "month",
            TimeWindow::Year => "year",
            TimeWindow::All => "all",
        }
    }

    /// Oldest timestamp that still falls inside the window.
    pub fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let span = match self {
            TimeWindow::Day => Duration::days(1),
            TimeWindow::Week => Duration::days(7),
            TimeWindow::Month => Duration::days(30),
            TimeWindow::Year => Duration::days(365),
            TimeWindow::All => return None,
        };
        Some(now - span)
    }
}

/// A link post (`t3`) from `/search` or `/comments/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Post {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    pub subreddit: String,
    #[serde(default)]
    pub subreddit_name_prefixed: Option<String>,
    #[serde(default)]
    pub subreddit_subscribers: Option<u64>,
    #[serde(default)]
    pub over_18: bool,
    #[serde(default)]
    pub num_comments: Option<u64>,
    #[serde(default)]
    pub created_utc: Option<f64>,
    #[serde(default)]
    pub permalink: Option<String>,
}

impl Post {
    /// Posts made on a user's profile page live in a `u_<name>` pseudo-subreddit.
    pub fn is_profile_post(&self) -> bool {
        self.subreddit.starts_with(PROFILE_PREFIX)
            || self
                .subreddit_name_prefixed
                .as_deref()
                .is_some_and(|p| p.starts_with("u/"))
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let secs = self.created_utc?;
        Utc.timestamp_opt(secs as i64, 0).single()
    }

    pub fn community_members(&self) -> u64 {
        self.subreddit_subscribers.unwrap_or(0)
    }
}

// --- Comments ---

/// A child of a comment listing: either a real comment or a "load more" stub.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum CommentChild {
    #[serde(rename = "t1")]
    Comment(Comment),
    #[serde(rename = "more")]
    More(MoreComments),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub score: Option<i64>,
}

/// Placeholder for comments that need a follow-up `/api/morechildren` call.
#[derive(Debug, Clone, Deserialize)]
pub struct MoreComments {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub children: Vec<String>,
}

/// `/comments/{id}` returns `[post listing, comment listing]`.
pub type CommentThread = (Listing<Thing<Post>>, Listing<CommentChild>);

// --- Auth ---

/// Response of `POST /api/v1/access_token`. Reddit reports grant failures
/// with a 200 and an `error` field.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// How to obtain an access token.
#[derive(Debug, Clone)]
pub enum TokenGrant {
    /// App-only access; no user identity.
    ClientCredentials,
    /// Act on behalf of the user who authorized the app.
    RefreshToken(String),
}

/// `GET /api/v1/me`.
#[derive(Debug, Clone, Deserialize)]
pub struct Identity {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_listing_flattens_more_stub() {
        let json = r#"{
            "kind": "Listing",
            "data": {
                "after": null,
                "children": [
                    {"kind": "t1", "data": {"id": "c1", "body": "I love budget travel"}},
                    {"kind": "more", "data": {"count": 42, "children": ["c2", "c3"]}}
                ]
            }
        }"#;
        let listing: Listing<CommentChild> = serde_json::from_str(json).unwrap();
        assert_eq!(listing.data.children.len(), 2);
        assert!(matches!(listing.data.children[0], CommentChild::Comment(ref c) if c.id == "c1"));
        assert!(matches!(listing.data.children[1], CommentChild::More(ref m) if m.count == 42));
    }

    #[test]
    fn subreddit_with_null_subscribers_counts_zero() {
        let json = r#"{"display_name": "quarantined", "subscribers": null}"#;
        let sub: Subreddit = serde_json::from_str(json).unwrap();
        assert_eq!(sub.member_count(), 0);
        assert!(!sub.is_profile());
    }

    #[test]
    fn profile_detection_uses_prefix_and_type() {
        let by_name: Subreddit = serde_json::from_str(r#"{"display_name": "u_someone"}"#).unwrap();
        let by_type: Subreddit =
            serde_json::from_str(r#"{"display_name": "someone", "subreddit_type": "user"}"#)
                .unwrap();
        assert!(by_name.is_profile());
        assert!(by_type.is_profile());
    }

    #[test]
    fn profile_post_detected_from_prefixed_name() {
        let json = r#"{
            "id": "abc",
            "subreddit": "someone",
            "subreddit_name_prefixed": "u/someone"
        }"#;
        let post: Post = serde_json::from_str(json).unwrap();
        assert!(post.is_profile_post());
        assert!(!post.over_18);
    }

    #[test]
    fn month_window_is_thirty_days() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();
        let since = TimeWindow::Month.since(now).unwrap();
        assert_eq!(since, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        assert!(TimeWindow::All.since(now).is_none());
    }
}
