//! Identifier reconciliation between the registry and the measurement files.
//!
//! Diagnoses identifier-format drift: which normalized keys the two sources
//! share, which only the registry knows and which only the files use. Inputs
//! are never modified.

use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Normalized keys seen in the sampled files of one directory
#[derive(Debug, Clone, Default, Serialize)]
pub struct DirectoryKeys {
    pub directory: PathBuf,
    pub keys: BTreeSet<String>,
    pub files_sampled: usize,
    pub files_skipped: usize,
}

/// Per-directory line of a reconciliation report
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryReconciliation {
    pub directory: PathBuf,
    pub files_sampled: usize,
    pub files_skipped: usize,
    pub distinct_keys: usize,
    pub matches: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub registry_keys: usize,
    pub source_keys: usize,
    pub intersection: BTreeSet<String>,
    /// In the registry, absent from every scanned file
    pub registry_only: BTreeSet<String>,
    /// In scanned files, absent from the registry
    pub source_only: BTreeSet<String>,
    pub directories: Vec<DirectoryReconciliation>,
}

/// Compare registry keys against the keys found in each directory
pub fn reconcile(registry_keys: &BTreeSet<String>, sources: &[DirectoryKeys]) -> ReconcileReport {
    let all_source_keys: BTreeSet<String> = sources
        .iter()
        .flat_map(|directory| directory.keys.iter().cloned())
        .collect();

    let directories = sources
        .iter()
        .map(|directory| DirectoryReconciliation {
            directory: directory.directory.clone(),
            files_sampled: directory.files_sampled,
            files_skipped: directory.files_skipped,
            distinct_keys: directory.keys.len(),
            matches: directory.keys.intersection(registry_keys).count(),
        })
        .collect();

    ReconcileReport {
        registry_keys: registry_keys.len(),
        source_keys: all_source_keys.len(),
        intersection: registry_keys.intersection(&all_source_keys).cloned().collect(),
        registry_only: registry_keys.difference(&all_source_keys).cloned().collect(),
        source_only: all_source_keys.difference(registry_keys).cloned().collect(),
        directories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(keys: &[&str]) -> BTreeSet<String> {
        keys.iter().map(|key| key.to_string()).collect()
    }

    fn directory(name: &str, keys: &[&str]) -> DirectoryKeys {
        DirectoryKeys {
            directory: PathBuf::from(name),
            keys: set(keys),
            files_sampled: 2,
            files_skipped: 0,
        }
    }

    #[test]
    fn test_set_algebra() {
        let registry = set(&["A", "B", "C"]);
        let report = reconcile(&registry, &[directory("hourly", &["B", "C", "D"])]);

        assert_eq!(report.intersection, set(&["B", "C"]));
        assert_eq!(report.registry_only, set(&["A"]));
        assert_eq!(report.source_only, set(&["D"]));
        assert_eq!(report.registry_keys, 3);
        assert_eq!(report.source_keys, 3);
    }

    #[test]
    fn test_keys_are_pooled_across_directories() {
        let registry = set(&["A", "B", "C"]);
        let sources = [directory("hourly", &["B"]), directory("daily", &["C", "D", "E"])];
        let report = reconcile(&registry, &sources);

        assert_eq!(report.intersection, set(&["B", "C"]));
        assert_eq!(report.registry_only, set(&["A"]));
        assert_eq!(report.source_only, set(&["D", "E"]));
        assert_eq!(report.directories[0].matches, 1);
        assert_eq!(report.directories[1].matches, 1);
        assert_eq!(report.directories[1].distinct_keys, 3);
    }

    #[test]
    fn test_inputs_are_untouched() {
        let registry = set(&["A"]);
        let sources = vec![directory("hourly", &["A", "B"])];
        let _ = reconcile(&registry, &sources);
        assert_eq!(registry, set(&["A"]));
        assert_eq!(sources[0].keys, set(&["A", "B"]));
    }

    #[test]
    fn test_no_sources() {
        let report = reconcile(&set(&["A"]), &[]);
        assert!(report.intersection.is_empty());
        assert_eq!(report.registry_only, set(&["A"]));
        assert!(report.directories.is_empty());
    }
}
