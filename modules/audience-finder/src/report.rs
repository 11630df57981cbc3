use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pipeline::scoring::ScoredCommunity;

/// Column headers in export order. The first six are the exporter contract;
/// the trailing keyword column lists which queries surfaced each community.
pub const COLUMNS: [&str; 7] = [
    "Community",
    "Relevance Score",
    "Found Via",
    "Members",
    "Community Link",
    "Top Posts (Month)",
    "Found By (Keywords)",
];

/// One row of the ranked report. Field order matches `COLUMNS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityRow {
    #[serde(rename = "Community")]
    pub community: String,
    #[serde(rename = "Relevance Score")]
    pub relevance_score: i8,
    #[serde(rename = "Found Via")]
    pub found_via: String,
    #[serde(rename = "Members")]
    pub members: u64,
    #[serde(rename = "Community Link")]
    pub community_link: String,
    #[serde(rename = "Top Posts (Month)")]
    pub top_posts_link: String,
    #[serde(rename = "Found By (Keywords)")]
    pub found_by: String,
}

impl From<ScoredCommunity> for CommunityRow {
    fn from(scored: ScoredCommunity) -> Self {
        let record = scored.record;

        let mut via: Vec<&str> = record.evidence_tags.iter().map(|t| t.name()).collect();
        via.sort_unstable();

        // BTreeSet iteration is already sorted.
        let found_by = record
            .matched_queries
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            community_link: record.community_link(),
            top_posts_link: record.top_posts_link(),
            found_via: via.join(", "),
            relevance_score: scored.score,
            members: record.member_count,
            community: record.identifier,
            found_by,
        }
    }
}

/// The final output of a completed scan, ordered by relevance then audience.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankedTable {
    rows: Vec<CommunityRow>,
}

impl RankedTable {
    /// `scored` must already be ranked.
    pub fn from_scored(scored: Vec<ScoredCommunity>) -> Self {
        Self {
            rows: scored.into_iter().map(CommunityRow::from).collect(),
        }
    }

    pub fn rows(&self) -> &[CommunityRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns() -> &'static [&'static str] {
        &COLUMNS
    }

    /// Array of row objects keyed by column header.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.rows)
    }

    fn cells(row: &CommunityRow) -> [String; 7] {
        [
            row.community.clone(),
            row.relevance_score.to_string(),
            row.found_via.clone(),
            row.members.to_string(),
            row.community_link.clone(),
            row.top_posts_link.clone(),
            row.found_by.clone(),
        ]
    }
}

/// Plain-text table for terminals.
impl fmt::Display for RankedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<[String; 7]> = self.rows.iter().map(Self::cells).collect();

        let mut widths = COLUMNS.map(|c| c.chars().count());
        for row in &cells {
            for (w, cell) in widths.iter_mut().zip(row.iter()) {
                *w = (*w).max(cell.chars().count());
            }
        }

        write_line(f, &COLUMNS, &widths)?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        write_line(f, &rule, &widths)?;
        for row in &cells {
            write_line(f, row, &widths)?;
        }
        Ok(())
    }
}

fn write_line<S: AsRef<str>>(f: &mut fmt::Formatter<'_>, values: &[S], widths: &[usize]) -> fmt::Result {
    let padded: Vec<String> = values
        .iter()
        .zip(widths.iter())
        .map(|(v, w)| format!("{:<w$}", v.as_ref(), w = *w))
        .collect();
    writeln!(f, "{}", padded.join("  ").trim_end())
}
