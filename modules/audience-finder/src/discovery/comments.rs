use std::sync::atomic::AtomicBool;

use reddit_client::Post;
use tracing::{debug, warn};

use super::{absorb, check_cancelled_flag, Interrupt};
use crate::pipeline::stats::ScanStats;
use crate::traits::RedditApi;
use crate::types::{EvidenceTag, Sighting};

/// Communities where a top-level comment under an accepted post mentions the query.
///
/// One matching comment is enough: scanning a post stops at the first hit.
/// A failed comment fetch only costs that post its evidence.
pub async fn comment_matches(
    api: &dyn RedditApi,
    query: &str,
    posts: &[Post],
    limit: u32,
    cancelled: &AtomicBool,
    stats: &mut ScanStats,
) -> Result<Vec<Sighting>, Interrupt> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let needle = query.to_lowercase();
    let mut sightings = Vec::new();

    for post in posts {
        check_cancelled_flag(cancelled)?;

        let comments = match api.top_level_comments(&post.id, limit).await {
            Ok(comments) => comments,
            Err(e) => {
                let e = absorb(e)?;
                warn!(
                    query,
                    post_id = post.id.as_str(),
                    strategy = "comment",
                    error = %e,
                    "Comment fetch failed, post contributes no comment evidence"
                );
                stats.comment_failures += 1;
                continue;
            }
        };
        stats.comment_threads_fetched += 1;

        for comment in comments.iter().take(limit as usize) {
            check_cancelled_flag(cancelled)?;
            if mentions(&comment.body, &needle) {
                debug!(
                    query,
                    post_id = post.id.as_str(),
                    comment_id = comment.id.as_str(),
                    community = post.subreddit.as_str(),
                    "Comment mentions query"
                );
                stats.comment_matches += 1;
                sightings.push(Sighting::new(
                    post.subreddit.clone(),
                    post.community_members(),
                    EvidenceTag::CommentMatch,
                ));
                break;
            }
        }
    }
    check_cancelled_flag(cancelled)?;

    Ok(sightings)
}

/// Case-insensitive substring test. `needle` must already be lowercase.
fn mentions(text: &str, needle: &str) -> bool {
    text.to_lowercase().contains(needle)
}
