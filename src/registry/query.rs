//! Spatial selection of registry stations
//!
//! Produces the target key set an extraction run matches measurement rows
//! against.

use super::StationRegistry;
use crate::models::{BoundingBox, StationRecord};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

impl StationRegistry {
    /// Find stations within a bounding box.
    ///
    /// Edges are inclusive. Stations without usable coordinates are never
    /// selected. An empty result is not an error.
    pub fn find_stations_in_bbox(&self, bbox: &BoundingBox) -> Vec<&StationRecord> {
        self.records
            .iter()
            .filter(|record| {
                record
                    .coordinates()
                    .is_some_and(|(lon, lat)| bbox.contains(lon, lat))
            })
            .collect()
    }

    /// Normalized keys of the stations inside `bbox`, in registry order
    pub fn target_keys(&self, bbox: &BoundingBox) -> TargetKeySet {
        let keys = TargetKeySet::from_keys(
            self.find_stations_in_bbox(bbox)
                .into_iter()
                .map(|record| record.normalized_key.clone()),
        );
        debug!("{} stations inside {}", keys.len(), bbox);
        keys
    }

    /// Every normalized key in the registry, sorted
    pub fn all_keys(&self) -> BTreeSet<String> {
        self.index.keys().cloned().collect()
    }
}

/// The normalized keys selected for one run. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetKeySet {
    ordered: Vec<String>,
    members: HashSet<String>,
}

impl TargetKeySet {
    /// Build from keys in selection order; duplicates are ignored
    pub fn from_keys<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut ordered = Vec::new();
        let mut members = HashSet::new();
        for key in keys {
            if members.insert(key.clone()) {
                ordered.push(key);
            }
        }
        Self { ordered, members }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.members.contains(key)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Keys in selection order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }

    pub fn sorted(&self) -> BTreeSet<String> {
        self.members.iter().cloned().collect()
    }
}
