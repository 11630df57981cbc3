use std::collections::HashMap;

use crate::types::{CommunityRecord, Sighting};

/// Merges sightings from every strategy and every query into one record per
/// community. Records are created on first sighting and never removed;
/// tags and queries only accumulate.
#[derive(Debug, Default)]
pub struct CommunityAggregator {
    records: HashMap<String, CommunityRecord>,
}

impl CommunityAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, sighting: Sighting, query: &str) {
        let record = self
            .records
            .entry(sighting.community)
            .or_insert_with_key(|id| CommunityRecord::new(id.clone(), sighting.members));

        record.member_count = sighting.members;
        record.evidence_tags.insert(sighting.tag);
        record.matched_queries.insert(query.to_string());
    }

    pub fn observe_all(&mut self, sightings: impl IntoIterator<Item = Sighting>, query: &str) {
        for sighting in sightings {
            self.observe(sighting, query);
        }
    }

    pub fn get(&self, identifier: &str) -> Option<&CommunityRecord> {
        self.records.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<CommunityRecord> {
        self.records.into_values().collect()
    }
}
