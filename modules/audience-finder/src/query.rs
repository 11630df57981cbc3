use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{Result, ScanError};

/// Normalized search terms: trimmed, non-empty, unique, lexically sorted.
///
/// Sorting keeps cache keys stable no matter how the user ordered the lines.
/// Terms stay case-sensitive; "Travel" and "travel" are two queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct QuerySet(Vec<String>);

impl QuerySet {
    /// Parse free-form multi-line input, one query per line.
    pub fn parse(raw: &str) -> Result<Self> {
        Self::from_terms(raw.lines())
    }

    /// Apply the same normalization to terms that are already split.
    pub fn from_terms<I, S>(terms: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: BTreeSet<String> = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        if unique.is_empty() {
            return Err(ScanError::EmptyInput);
        }
        Ok(Self(unique.into_iter().collect()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; construction rejects empty input.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}
