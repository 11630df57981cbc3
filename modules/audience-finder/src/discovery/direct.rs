use std::sync::atomic::AtomicBool;

use tracing::{debug, warn};

use super::{absorb, check_cancelled_flag, Interrupt};
use crate::pipeline::stats::ScanStats;
use crate::traits::RedditApi;
use crate::types::{EvidenceTag, Sighting};

/// Communities whose name or description matches the query.
pub async fn direct_matches(
    api: &dyn RedditApi,
    query: &str,
    limit: u32,
    cancelled: &AtomicBool,
    stats: &mut ScanStats,
) -> Result<Vec<Sighting>, Interrupt> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    check_cancelled_flag(cancelled)?;

    let subreddits = match api.search_subreddits(query, limit).await {
        Ok(subs) => subs,
        Err(e) => {
            let e = absorb(e)?;
            warn!(query, strategy = "direct", error = %e, "Subreddit search failed, skipping");
            stats.direct_failures += 1;
            return Ok(Vec::new());
        }
    };

    let mut sightings = Vec::with_capacity(subreddits.len());
    for sub in subreddits.into_iter().take(limit as usize) {
        check_cancelled_flag(cancelled)?;
        stats.subreddits_seen += 1;

        if sub.is_profile() {
            debug!(query, community = sub.display_name.as_str(), "Skipping profile pseudo-community");
            stats.profiles_skipped += 1;
            continue;
        }

        let members = sub.member_count();
        sightings.push(Sighting::new(sub.display_name, members, EvidenceTag::DirectMatch));
    }
    check_cancelled_flag(cancelled)?;

    Ok(sightings)
}
