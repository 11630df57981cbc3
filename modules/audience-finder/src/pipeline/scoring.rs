use std::cmp::Ordering;
use std::collections::BTreeSet;

use tracing::error;

use crate::types::{CommunityRecord, EvidenceTag};

/// Score for a record that somehow has no evidence.
pub const INCONSISTENT_SCORE: i8 = -1;

/// Ordinal relevance from the set of strategies that found a community.
///
/// - all three strategies: 3
/// - post and comment, without direct: 2
/// - exactly one of post or comment, with or without direct: 1
/// - direct only: 0
/// - nothing: -1
pub fn relevance_score(tags: &BTreeSet<EvidenceTag>) -> i8 {
    let direct = tags.contains(&EvidenceTag::DirectMatch);
    let post = tags.contains(&EvidenceTag::PostMatch);
    let comment = tags.contains(&EvidenceTag::CommentMatch);

    match (direct, post, comment) {
        (true, true, true) => 3,
        (false, true, true) => 2,
        (_, true, false) | (_, false, true) => 1,
        (true, false, false) => 0,
        (false, false, false) => INCONSISTENT_SCORE,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredCommunity {
    pub record: CommunityRecord,
    pub score: i8,
}

/// Score every record and order them: most relevant first, then the biggest
/// audience among equally relevant communities.
pub fn rank(records: Vec<CommunityRecord>) -> Vec<ScoredCommunity> {
    let mut scored: Vec<ScoredCommunity> = records
        .into_iter()
        .map(|record| {
            let score = relevance_score(&record.evidence_tags);
            if score == INCONSISTENT_SCORE {
                error!(
                    community = record.identifier.as_str(),
                    "Community recorded without evidence"
                );
            }
            ScoredCommunity { record, score }
        })
        .collect();

    scored.sort_by(compare);
    scored
}

fn compare(a: &ScoredCommunity, b: &ScoredCommunity) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| b.record.member_count.cmp(&a.record.member_count))
        .then_with(|| a.record.identifier.cmp(&b.record.identifier))
}
