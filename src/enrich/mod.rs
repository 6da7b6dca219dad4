//! Enrichment of extracted measurements.
//!
//! Takes an extraction CSV, drops UUID-valued columns, joins station metadata
//! on the coarse sampling-point key and adds vocabulary labels for pollutant,
//! unit and verification codes.

pub mod vocabulary;

use self::vocabulary::{VocabularyKind, VocabularyLookup};
use crate::constants::{UUID_MATCH_RATIO, UUID_SAMPLE_SIZE, columns, registry_columns};
use crate::error::{ExtractError, Result};
use crate::filters::canonical_pollutant;
use crate::frame::{column_names, has_column, put_text_column, read_csv_as_text, text_values};
use crate::normalizer::coarse_key;
use crate::processor::writer::{CsvOutputWriter, order_columns};
use crate::registry::loader::read_registry_frame;
use polars::prelude::*;
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Files used by one enrich run
#[derive(Debug, Clone)]
pub struct EnrichRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub metadata: PathBuf,
    pub vocab_dir: PathBuf,
}

/// A pollutant code seen in the data and what the vocabulary made of it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollutantLabel {
    pub code: String,
    pub notation: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EnrichSummary {
    pub input_rows: usize,
    pub output_rows: usize,
    pub dropped_uuid_columns: Vec<String>,
    /// Rows with a station name; `None` when the registry has no name column
    pub rows_with_station_metadata: Option<usize>,
    pub rows_with_pollutant_name: usize,
    pub rows_with_pollutant_code: usize,
    pub pollutants: Vec<PollutantLabel>,
}

/// Enriches measurement tables using injected vocabularies
pub struct Enricher<'a> {
    vocabularies: &'a dyn VocabularyLookup,
    uuid_pattern: Regex,
}

impl<'a> Enricher<'a> {
    pub fn new(vocabularies: &'a dyn VocabularyLookup) -> Result<Self> {
        Ok(Self {
            vocabularies,
            uuid_pattern: Regex::new(
                r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$",
            )?,
        })
    }

    /// Read, enrich and write according to `request`
    pub fn run(&self, request: &EnrichRequest) -> Result<EnrichSummary> {
        if !request.input.exists() {
            return Err(ExtractError::MissingFile {
                path: request.input.clone(),
            });
        }
        let data = read_csv_as_text(&request.input)?;
        info!("Loaded {} measurements from {}", data.height(), request.input.display());

        let metadata = read_registry_frame(&request.metadata, &[registry_columns::SAMPLING_POINT_ID])?;

        let (mut enriched, summary) = self.enrich_frame(data, &metadata)?;
        CsvOutputWriter::new(request.output.clone()).write(&mut enriched)?;
        info!("Saved enriched data to {}", request.output.display());

        Ok(summary)
    }

    /// Enrich an in-memory measurement table with registry `metadata`
    pub fn enrich_frame(
        &self,
        data: DataFrame,
        metadata: &DataFrame,
    ) -> Result<(DataFrame, EnrichSummary)> {
        let mut summary = EnrichSummary {
            input_rows: data.height(),
            ..EnrichSummary::default()
        };

        let uuid_columns = self.uuid_columns(&data)?;
        let mut data = if uuid_columns.is_empty() {
            data
        } else {
            info!("Removing UUID columns: {}", uuid_columns.join(", "));
            data.drop_many(uuid_columns.iter().map(String::as_str))
        };
        summary.dropped_uuid_columns = uuid_columns;

        if !has_column(&data, columns::SAMPLING_POINT) {
            return Err(ExtractError::SchemaError {
                path: PathBuf::from("<input>"),
                missing: vec![columns::SAMPLING_POINT.to_string()],
            });
        }
        let cores: Vec<Option<String>> = text_values(&data, columns::SAMPLING_POINT)?
            .into_iter()
            .map(|value| value.map(|raw| coarse_key(&raw).to_string()))
            .collect();

        join_station_metadata(&mut data, &cores, metadata)?;
        put_text_column(&mut data, columns::SAMPLING_POINT_CORE, cores)?;

        self.add_labels(&mut data, &mut summary)?;

        if has_column(&data, registry_columns::STATION_NAME) {
            summary.rows_with_station_metadata = Some(
                text_values(&data, registry_columns::STATION_NAME)?
                    .iter()
                    .filter(|value| value.is_some())
                    .count(),
            );
        }

        let data = data.select(order_columns(&column_names(&data)))?;
        summary.output_rows = data.height();
        Ok((data, summary))
    }

    /// Text columns whose first non-null values are mostly UUIDs
    pub fn uuid_columns(&self, data: &DataFrame) -> Result<Vec<String>> {
        let mut found = Vec::new();
        for column in data.get_columns() {
            if column.dtype() != &DataType::String {
                continue;
            }
            let sample: Vec<String> = text_values(data, column.name())?
                .into_iter()
                .flatten()
                .take(UUID_SAMPLE_SIZE)
                .collect();
            if sample.is_empty() {
                continue;
            }
            let matches = sample
                .iter()
                .filter(|value| self.uuid_pattern.is_match(value.trim()))
                .count();
            if matches as f64 > sample.len() as f64 * UUID_MATCH_RATIO {
                debug!("Identified UUID column: {}", column.name());
                found.push(column.name().to_string());
            }
        }
        Ok(found)
    }

    fn add_labels(&self, data: &mut DataFrame, summary: &mut EnrichSummary) -> Result<()> {
        if has_column(data, columns::POLLUTANT) {
            let cells = text_values(data, columns::POLLUTANT)?;
            let mut names = Vec::with_capacity(cells.len());
            let mut notations = Vec::with_capacity(cells.len());
            let mut seen = HashSet::new();

            for cell in &cells {
                let (name, notation) = match cell {
                    Some(code) => (
                        pollutant_lookup(code, |code| {
                            self.vocabularies.label(VocabularyKind::Pollutant, code)
                        }),
                        pollutant_lookup(code, |code| {
                            self.vocabularies.notation(VocabularyKind::Pollutant, code)
                        }),
                    ),
                    None => (None, None),
                };
                if let Some(code) = cell {
                    if seen.insert((code.clone(), notation.clone(), name.clone())) {
                        summary.pollutants.push(PollutantLabel {
                            code: code.clone(),
                            notation: notation.clone(),
                            name: name.clone(),
                        });
                    }
                }
                names.push(name);
                notations.push(notation);
            }

            summary.rows_with_pollutant_name = names.iter().filter(|v| v.is_some()).count();
            summary.rows_with_pollutant_code = notations.iter().filter(|v| v.is_some()).count();
            put_text_column(data, columns::POLLUTANT_NAME, names)?;
            put_text_column(data, columns::POLLUTANT_NOTATION, notations)?;
        } else {
            warn!("No {} column, pollutant labels not added", columns::POLLUTANT);
        }

        if has_column(data, columns::UNIT) {
            let labels = self.labels(data, columns::UNIT, VocabularyKind::Unit)?;
            put_text_column(data, columns::UNIT_LABEL, labels)?;
        }
        if has_column(data, columns::VERIFICATION) {
            let labels = self.labels(data, columns::VERIFICATION, VocabularyKind::QualityFlag)?;
            put_text_column(data, columns::VERIFICATION_LABEL, labels)?;
        }
        Ok(())
    }

    fn labels(
        &self,
        data: &DataFrame,
        column: &str,
        kind: VocabularyKind,
    ) -> Result<Vec<Option<String>>> {
        Ok(text_values(data, column)?
            .iter()
            .map(|cell| {
                cell.as_deref()
                    .and_then(|code| self.vocabularies.label(kind, code))
                    .map(str::to_string)
            })
            .collect())
    }
}

/// Look a pollutant cell up as written, then in canonical form
fn pollutant_lookup<'v, F>(code: &str, lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<&'v str>,
{
    lookup(code)
        .or_else(|| lookup(&canonical_pollutant(code)))
        .map(str::to_string)
}

/// Left join of registry columns on the coarse key. The first registry row
/// per key is used and columns the data already has are left alone.
fn join_station_metadata(
    data: &mut DataFrame,
    cores: &[Option<String>],
    metadata: &DataFrame,
) -> Result<()> {
    let registry_cores: Vec<Option<String>> = text_values(metadata, registry_columns::SAMPLING_POINT_ID)?
        .into_iter()
        .map(|value| value.map(|raw| coarse_key(&raw).to_string()))
        .collect();

    let mut first_row: HashMap<String, usize> = HashMap::new();
    for (row, key) in registry_cores.into_iter().enumerate() {
        if let Some(key) = key {
            first_row.entry(key).or_insert(row);
        }
    }
    debug!("Metadata covers {} coarse station keys", first_row.len());

    let rows: Vec<Option<usize>> = cores
        .iter()
        .map(|core| core.as_ref().and_then(|key| first_row.get(key).copied()))
        .collect();

    for name in registry_columns::ENRICHMENT {
        if !has_column(metadata, name) || has_column(data, name) {
            continue;
        }
        let source = text_values(metadata, name)?;
        let joined: Vec<Option<String>> = rows
            .iter()
            .map(|row| row.and_then(|row| source[row].clone()))
            .collect();
        put_text_column(data, name, joined)?;
    }
    Ok(())
}
