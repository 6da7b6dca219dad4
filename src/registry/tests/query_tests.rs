//! Tests for spatial selection

use super::write_registry;
use crate::models::BoundingBox;
use crate::normalizer::IdentifierNormalizer;
use crate::registry::{StationRegistry, TargetKeySet};
use tempfile::TempDir;

fn edge_registry(temp_dir: &TempDir) -> StationRegistry {
    let path = write_registry(
        temp_dir,
        &[
            "IT/SPO.IT0001A_5_BETA,12.0,45.0,IT0001A,PM10,MinCorner",
            "IT/SPO.IT0002A_5_BETA,14.0,47.0,IT0002A,PM10,MaxCorner",
            "IT/SPO.IT0003A_5_BETA,11.9999999,46.0,IT0003A,PM10,JustWest",
            "IT/SPO.IT0004A_5_BETA,13.0,46.0,IT0004A,PM10,Centre",
            "IT/SPO.IT0005A_5_BETA,,46.0,IT0005A,PM10,Unlocated",
        ],
    );
    StationRegistry::load(&path, &IdentifierNormalizer::new().unwrap()).unwrap()
}

#[test]
fn test_bbox_edges_are_inclusive() {
    let temp_dir = TempDir::new().unwrap();
    let registry = edge_registry(&temp_dir);
    let bbox = BoundingBox::new(12.0, 14.0, 45.0, 47.0).unwrap();

    let keys: Vec<_> = registry.target_keys(&bbox).iter().map(String::from).collect();
    assert_eq!(keys, vec!["IT0001A", "IT0002A", "IT0004A"]);
}

#[test]
fn test_empty_selection_is_not_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let registry = edge_registry(&temp_dir);
    let bbox = BoundingBox::new(0.0, 1.0, 0.0, 1.0).unwrap();

    assert!(registry.find_stations_in_bbox(&bbox).is_empty());
    assert!(registry.target_keys(&bbox).is_empty());
}

#[test]
fn test_all_keys_include_unlocatable_stations() {
    let temp_dir = TempDir::new().unwrap();
    let registry = edge_registry(&temp_dir);
    let all = registry.all_keys();
    assert_eq!(all.len(), 5);
    assert!(all.contains("IT0005A"));
}

#[test]
fn test_target_key_set_ignores_duplicates() {
    let keys = TargetKeySet::from_keys(["B".to_string(), "A".to_string(), "B".to_string()]);
    assert_eq!(keys.len(), 2);
    assert_eq!(keys.iter().collect::<Vec<_>>(), vec!["B", "A"]);
    assert_eq!(
        keys.sorted().into_iter().collect::<Vec<_>>(),
        vec!["A", "B"]
    );
    assert!(keys.contains("A"));
    assert!(!keys.contains("C"));
}
