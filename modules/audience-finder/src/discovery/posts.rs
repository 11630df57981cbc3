use std::sync::atomic::AtomicBool;

use chrono::Utc;
use reddit_client::{Post, SearchSort, TimeWindow};
use tracing::{debug, warn};

use super::{absorb, check_cancelled_flag, Interrupt};
use crate::pipeline::stats::ScanStats;
use crate::traits::RedditApi;
use crate::types::{EvidenceTag, Sighting};

/// Only posts from the last 30 days count as evidence.
pub const POST_SEARCH_WINDOW: TimeWindow = TimeWindow::Month;

/// Output of the post strategy. `posts` are the accepted posts, which the
/// comment strategy expands next.
#[derive(Debug, Default)]
pub struct PostMatches {
    pub sightings: Vec<Sighting>,
    pub posts: Vec<Post>,
}

/// Communities hosting recent posts that match the query.
pub async fn post_matches(
    api: &dyn RedditApi,
    query: &str,
    limit: u32,
    cancelled: &AtomicBool,
    stats: &mut ScanStats,
) -> Result<PostMatches, Interrupt> {
    if limit == 0 {
        return Ok(PostMatches::default());
    }
    check_cancelled_flag(cancelled)?;

    let found = match api
        .search_posts(query, limit, SearchSort::Relevance, POST_SEARCH_WINDOW)
        .await
    {
        Ok(posts) => posts,
        Err(e) => {
            let e = absorb(e)?;
            warn!(query, strategy = "post", error = %e, "Post search failed, skipping");
            stats.post_failures += 1;
            return Ok(PostMatches::default());
        }
    };

    let since = POST_SEARCH_WINDOW.since(Utc::now());
    let mut matches = PostMatches::default();

    for post in found.into_iter().take(limit as usize) {
        check_cancelled_flag(cancelled)?;
        stats.posts_seen += 1;

        // Listings carry no community-level adult flag, so the post's own
        // `over_18` stands in for it.
        if post.is_profile_post() || post.over_18 {
            debug!(
                query,
                post_id = post.id.as_str(),
                community = post.subreddit.as_str(),
                over_18 = post.over_18,
                "Skipping post from profile or adult community"
            );
            stats.posts_skipped += 1;
            continue;
        }

        if let (Some(since), Some(created)) = (since, post.created_at()) {
            if created < since {
                debug!(query, post_id = post.id.as_str(), %created, "Skipping post outside search window");
                stats.posts_skipped += 1;
                continue;
            }
        }

        matches.sightings.push(Sighting::new(
            post.subreddit.clone(),
            post.community_members(),
            EvidenceTag::PostMatch,
        ));
        matches.posts.push(post);
    }
    check_cancelled_flag(cancelled)?;

    Ok(matches)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::{post, MockReddit};

    #[tokio::test]
    async fn skips_profile_and_adult_posts() {
        let mut nsfw = post("p2", "afterdark", 900);
        nsfw.over_18 = true;
        let api = MockReddit::new().on_posts(
            "hostels",
            vec![
                post("p1", "backpacking", 1_200),
                nsfw,
                post("p3", "u_wanderer", 3),
            ],
        );
        let cancelled = AtomicBool::new(false);
        let mut stats = ScanStats::default();

        let matches = post_matches(&api, "hostels", 10, &cancelled, &mut stats)
            .await
            .unwrap();

        assert_eq!(
            matches.sightings,
            vec![Sighting::new("backpacking", 1_200, EvidenceTag::PostMatch)]
        );
        assert_eq!(matches.posts.len(), 1);
        assert_eq!(matches.posts[0].id, "p1");
        assert_eq!(stats.posts_seen, 3);
        assert_eq!(stats.posts_skipped, 2);
    }

    #[tokio::test]
    async fn drops_posts_older_than_window() {
        let mut stale = post("old", "archive", 10);
        stale.created_utc = Some((Utc::now() - chrono::Duration::days(90)).timestamp() as f64);
        let mut fresh = post("new", "current", 20);
        fresh.created_utc = Some((Utc::now() - chrono::Duration::days(2)).timestamp() as f64);

        let api = MockReddit::new().on_posts("q", vec![stale, fresh]);
        let cancelled = AtomicBool::new(false);
        let mut stats = ScanStats::default();

        let matches = post_matches(&api, "q", 10, &cancelled, &mut stats).await.unwrap();
        assert_eq!(matches.posts.len(), 1);
        assert_eq!(matches.posts[0].id, "new");
    }

    #[tokio::test]
    async fn respects_depth_even_if_api_overdelivers() {
        let api = MockReddit::new().on_posts(
            "q",
            vec![post("a", "one", 1), post("b", "two", 2), post("c", "three", 3)],
        );
        let cancelled = AtomicBool::new(false);
        let mut stats = ScanStats::default();

        let matches = post_matches(&api, "q", 2, &cancelled, &mut stats).await.unwrap();
        assert_eq!(matches.posts.len(), 2);
    }

    #[tokio::test]
    async fn cancel_during_search_drops_results() {
        let cancelled = Arc::new(AtomicBool::new(false));
        let api = MockReddit::new()
            .on_posts("q", vec![post("a", "one", 1), post("b", "two", 2)])
            .cancel_during_posts("q", cancelled.clone());
        let mut stats = ScanStats::default();

        let result = post_matches(&api, "q", 10, &cancelled, &mut stats).await;

        assert!(matches!(result, Err(Interrupt::Cancelled)));
        assert_eq!(stats.posts_seen, 0);
    }

    #[tokio::test]
    async fn adult_post_in_general_community_is_skipped() {
        let mut nsfw = post("p1", "pics", 30_000_000);
        nsfw.over_18 = true;
        let api = MockReddit::new().on_posts("q", vec![nsfw, post("p2", "pics", 30_000_000)]);
        let cancelled = AtomicBool::new(false);
        let mut stats = ScanStats::default();

        let matches = post_matches(&api, "q", 10, &cancelled, &mut stats).await.unwrap();

        assert_eq!(matches.posts.len(), 1);
        assert_eq!(matches.posts[0].id, "p2");
        assert_eq!(
            matches.sightings,
            vec![Sighting::new("pics", 30_000_000, EvidenceTag::PostMatch)]
        );
    }
}
