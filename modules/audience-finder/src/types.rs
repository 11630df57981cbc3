use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Public web host used for the links in the report.
pub const PLATFORM_BASE_URL: &str = "https://www.reddit.com";

/// Which discovery strategy surfaced a community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EvidenceTag {
    /// Community name or description matched the query.
    DirectMatch,
    /// A recent post in the community matched the query.
    PostMatch,
    /// A top-level comment under a matching post mentioned the query.
    CommentMatch,
}

impl EvidenceTag {
    pub const ALL: [EvidenceTag; 3] = [
        EvidenceTag::DirectMatch,
        EvidenceTag::PostMatch,
        EvidenceTag::CommentMatch,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EvidenceTag::DirectMatch => "DirectMatch",
            EvidenceTag::PostMatch => "PostMatch",
            EvidenceTag::CommentMatch => "CommentMatch",
        }
    }
}

impl fmt::Display for EvidenceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One piece of evidence emitted by a strategy: this community, this many
/// members, found this way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sighting {
    pub community: String,
    pub members: u64,
    pub tag: EvidenceTag,
}

impl Sighting {
    pub fn new(community: impl Into<String>, members: u64, tag: EvidenceTag) -> Self {
        Self {
            community: community.into(),
            members,
            tag,
        }
    }
}

/// Everything a scan has learned about one community.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunityRecord {
    pub identifier: String,
    /// Point-in-time subscriber count; the latest observation wins.
    pub member_count: u64,
    pub evidence_tags: BTreeSet<EvidenceTag>,
    pub matched_queries: BTreeSet<String>,
}

impl CommunityRecord {
    pub fn new(identifier: impl Into<String>, member_count: u64) -> Self {
        Self {
            identifier: identifier.into(),
            member_count,
            evidence_tags: BTreeSet::new(),
            matched_queries: BTreeSet::new(),
        }
    }

    pub fn community_link(&self) -> String {
        community_link(&self.identifier)
    }

    pub fn top_posts_link(&self) -> String {
        top_posts_link(&self.identifier)
    }
}

pub fn community_link(identifier: &str) -> String {
    format!("{PLATFORM_BASE_URL}/r/{identifier}")
}

pub fn top_posts_link(identifier: &str) -> String {
    format!("{PLATFORM_BASE_URL}/r/{identifier}/top/?t=month")
}
