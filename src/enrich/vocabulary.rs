//! EEA vocabulary lookups
//!
//! Vocabularies are downloaded JSON files, one per kind, in a directory
//! (`pollutant.json`, `unit.json`, ...). They are loaded into an explicit
//! [`Vocabularies`] value and passed to whatever needs labels; nothing here is
//! global.

use crate::error::{ExtractError, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Vocabulary files understood by the enrich command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VocabularyKind {
    Pollutant,
    Unit,
    QualityFlag,
    AggregationProcess,
}

impl VocabularyKind {
    pub const COMMON: [VocabularyKind; 4] = [
        VocabularyKind::Pollutant,
        VocabularyKind::Unit,
        VocabularyKind::QualityFlag,
        VocabularyKind::AggregationProcess,
    ];

    /// File stem of the vocabulary JSON
    pub fn file_stem(&self) -> &'static str {
        match self {
            VocabularyKind::Pollutant => "pollutant",
            VocabularyKind::Unit => "unit",
            VocabularyKind::QualityFlag => "quality_flag",
            VocabularyKind::AggregationProcess => "aggregation_process",
        }
    }
}

/// Code to label/notation resolution
pub trait VocabularyLookup {
    /// Human-readable label of `code`
    fn label(&self, kind: VocabularyKind, code: &str) -> Option<&str>;

    /// Short notation of `code` (for pollutants, e.g. `PM10`)
    fn notation(&self, kind: VocabularyKind, code: &str) -> Option<&str>;
}

/// One concept of a vocabulary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyEntry {
    pub id: String,
    pub label: String,
    pub notation: Option<String>,
}

/// A single loaded vocabulary. Codes are indexed by the full concept id and
/// by its last path segment; on a segment clash the first concept wins.
#[derive(Debug, Clone, Default)]
pub struct VocabularyTable {
    entries: Vec<VocabularyEntry>,
    by_code: HashMap<String, usize>,
}

impl VocabularyTable {
    pub fn from_entries(entries: Vec<VocabularyEntry>) -> Self {
        let mut by_code = HashMap::with_capacity(entries.len() * 2);
        for (position, entry) in entries.iter().enumerate() {
            by_code.entry(entry.id.clone()).or_insert(position);
            by_code
                .entry(last_segment(&entry.id).to_string())
                .or_insert(position);
        }
        Self { entries, by_code }
    }

    /// Parse either the `concepts` or the `results` JSON layout
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let document: VocabularyDocument = serde_json::from_str(text)?;
        let mut entries = Vec::new();

        for concept in document.concepts {
            let label = concept
                .pref_label
                .iter()
                .find_map(|value| value.value.clone())
                .unwrap_or_default();
            let Some(id) = concept.id else { continue };
            if label.is_empty() {
                continue;
            }
            entries.push(VocabularyEntry {
                id,
                label,
                notation: concept.notation.and_then(scalar_text),
            });
        }

        for result in document.results {
            let Some(code) = result.notation.and_then(scalar_text) else {
                continue;
            };
            let Some(label) = result.pref_label.and_then(Label::into_text) else {
                continue;
            };
            entries.push(VocabularyEntry {
                id: code.clone(),
                label,
                notation: Some(code),
            });
        }

        Ok(Self::from_entries(entries))
    }

    pub fn get(&self, code: &str) -> Option<&VocabularyEntry> {
        self.by_code
            .get(code.trim())
            .map(|position| &self.entries[*position])
    }

    pub fn entries(&self) -> &[VocabularyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The vocabularies of one run, loaded from a directory
#[derive(Debug, Clone, Default)]
pub struct Vocabularies {
    tables: HashMap<VocabularyKind, VocabularyTable>,
}

impl Vocabularies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `<dir>/<kind>.json` for each kind. A missing or unparseable file
    /// is logged and leaves that vocabulary empty.
    pub fn load_from_dir(dir: &Path, kinds: &[VocabularyKind]) -> Self {
        let mut vocabularies = Self::new();
        for kind in kinds {
            let path = dir.join(format!("{}.json", kind.file_stem()));
            match Self::load_table(&path) {
                Ok(table) => {
                    info!(
                        "Loaded {} entries from {} vocabulary",
                        table.len(),
                        kind.file_stem()
                    );
                    vocabularies.insert(*kind, table);
                }
                Err(ExtractError::MissingFile { path }) => {
                    warn!("Vocabulary file not found: {}", path.display());
                }
                Err(e) => warn!("{}", e),
            }
        }
        vocabularies
    }

    /// Load a single vocabulary file
    pub fn load_table(path: &Path) -> Result<VocabularyTable> {
        if !path.exists() {
            return Err(ExtractError::MissingFile {
                path: path.to_path_buf(),
            });
        }
        let text = fs::read_to_string(path)?;
        VocabularyTable::from_json(&text).map_err(|e| ExtractError::Vocabulary {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn insert(&mut self, kind: VocabularyKind, table: VocabularyTable) {
        self.tables.insert(kind, table);
    }

    pub fn table(&self, kind: VocabularyKind) -> Option<&VocabularyTable> {
        self.tables.get(&kind)
    }

    pub fn is_loaded(&self, kind: VocabularyKind) -> bool {
        self.tables.get(&kind).is_some_and(|table| !table.is_empty())
    }

    /// Notation to numeric code pairs from the pollutant vocabulary, for
    /// concepts whose id ends in a numeric code
    pub fn pollutant_codes(&self) -> Vec<(String, i64)> {
        let Some(table) = self.table(VocabularyKind::Pollutant) else {
            return Vec::new();
        };
        let pairs: Vec<(String, i64)> = table
            .entries()
            .iter()
            .filter_map(|entry| {
                let code = last_segment(&entry.id).parse::<i64>().ok()?;
                let notation = entry.notation.clone()?;
                Some((notation, code))
            })
            .collect();
        debug!("{} pollutant notations with numeric codes", pairs.len());
        pairs
    }
}

impl VocabularyLookup for Vocabularies {
    fn label(&self, kind: VocabularyKind, code: &str) -> Option<&str> {
        self.table(kind)?.get(code).map(|entry| entry.label.as_str())
    }

    fn notation(&self, kind: VocabularyKind, code: &str) -> Option<&str> {
        self.table(kind)?.get(code)?.notation.as_deref()
    }
}

fn last_segment(id: &str) -> &str {
    id.trim_end_matches('/').rsplit('/').next().unwrap_or(id)
}

fn scalar_text(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(text) if !text.is_empty() => Some(text),
        serde_json::Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct VocabularyDocument {
    #[serde(default)]
    concepts: Vec<Concept>,
    #[serde(default)]
    results: Vec<ResultEntry>,
}

#[derive(Debug, Deserialize)]
struct Concept {
    #[serde(rename = "@id")]
    id: Option<String>,
    #[serde(rename = "prefLabel", default)]
    pref_label: Vec<LanguageValue>,
    #[serde(rename = "Notation")]
    notation: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct LanguageValue {
    #[serde(rename = "@value")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultEntry {
    notation: Option<serde_json::Value>,
    #[serde(rename = "prefLabel")]
    pref_label: Option<Label>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Label {
    Text(String),
    ByLanguage(BTreeMap<String, String>),
}

impl Label {
    fn into_text(self) -> Option<String> {
        match self {
            Label::Text(text) => Some(text),
            Label::ByLanguage(mut labels) => labels
                .remove("en")
                .or_else(|| labels.into_values().next()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CONCEPTS: &str = r#"{
        "concepts": [
            {
                "@id": "http://dd.eionet.europa.eu/vocabulary/aq/pollutant/5",
                "prefLabel": [{"@value": "Particulate matter < 10 µm (aerosol)", "@language": "en"}],
                "Notation": "PM10"
            },
            {
                "@id": "http://dd.eionet.europa.eu/vocabulary/aq/pollutant/8",
                "prefLabel": [{"@value": "Nitrogen dioxide (air)"}],
                "Notation": "NO2"
            },
            {
                "@id": "http://dd.eionet.europa.eu/vocabulary/aq/pollutant/5012",
                "prefLabel": [{"@value": "Lead in PM10 (aerosol)"}],
                "Notation": "Pb in PM10"
            },
            {
                "@id": "http://dd.eionet.europa.eu/vocabulary/aq/pollutant/999",
                "prefLabel": []
            }
        ]
    }"#;

    const RESULTS: &str = r#"{
        "results": [
            {"notation": "1", "prefLabel": {"de": "gültig", "en": "valid"}},
            {"notation": "-1", "prefLabel": "not valid"},
            {"notation": 2, "prefLabel": {"fr": "douteux"}},
            {"prefLabel": "orphan"}
        ]
    }"#;

    #[test]
    fn test_concepts_layout() {
        let table = VocabularyTable::from_json(CONCEPTS).unwrap();
        assert_eq!(table.len(), 3);

        let pm10 = table.get("5").unwrap();
        assert_eq!(pm10.notation.as_deref(), Some("PM10"));
        assert_eq!(
            table
                .get("http://dd.eionet.europa.eu/vocabulary/aq/pollutant/8")
                .unwrap()
                .label,
            "Nitrogen dioxide (air)"
        );
        assert!(table.get("999").is_none());
    }

    #[test]
    fn test_results_layout() {
        let table = VocabularyTable::from_json(RESULTS).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("1").unwrap().label, "valid");
        assert_eq!(table.get("-1").unwrap().label, "not valid");
        assert_eq!(table.get("2").unwrap().label, "douteux");
    }

    #[test]
    fn test_lookup_trait() {
        let mut vocabularies = Vocabularies::new();
        vocabularies.insert(
            VocabularyKind::Pollutant,
            VocabularyTable::from_json(CONCEPTS).unwrap(),
        );

        assert_eq!(
            vocabularies.notation(VocabularyKind::Pollutant, "8"),
            Some("NO2")
        );
        assert_eq!(
            vocabularies.label(VocabularyKind::Pollutant, "5"),
            Some("Particulate matter < 10 µm (aerosol)")
        );
        assert_eq!(vocabularies.label(VocabularyKind::Unit, "5"), None);
    }

    #[test]
    fn test_pollutant_codes() {
        let mut vocabularies = Vocabularies::new();
        vocabularies.insert(
            VocabularyKind::Pollutant,
            VocabularyTable::from_json(CONCEPTS).unwrap(),
        );
        let codes = vocabularies.pollutant_codes();
        assert!(codes.contains(&("PM10".to_string(), 5)));
        assert!(codes.contains(&("Pb in PM10".to_string(), 5012)));
    }

    #[test]
    fn test_load_from_dir_tolerates_missing_and_broken_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("pollutant.json"), CONCEPTS).unwrap();
        fs::write(temp_dir.path().join("unit.json"), "{ not json").unwrap();

        let vocabularies = Vocabularies::load_from_dir(temp_dir.path(), &VocabularyKind::COMMON);

        assert!(vocabularies.is_loaded(VocabularyKind::Pollutant));
        assert!(!vocabularies.is_loaded(VocabularyKind::Unit));
        assert!(!vocabularies.is_loaded(VocabularyKind::QualityFlag));
        assert!(matches!(
            Vocabularies::load_table(&temp_dir.path().join("unit.json")),
            Err(ExtractError::Vocabulary { .. })
        ));
    }
}
