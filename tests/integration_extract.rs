//! Black-box tests of the extract, enrich and inspect workflows

use eea_extract::enrich::vocabulary::{Vocabularies, VocabularyKind};
use eea_extract::enrich::{EnrichRequest, Enricher};
use eea_extract::inspect::{InspectEntry, inspect_directory};
use eea_extract::{
    ExtractConfig, ExtractError, ExtractRequest, ExtractionProcessor, IdentifierNormalizer,
    RunMode, RunOutcome,
};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const REGISTRY: &str = "\
Sampling Point Id,Longitude,Latitude,Air Quality Station EoI Code,Air Pollutant,Air Quality Station Name,Air Quality Network
IT/SPO.IT1823A_5_BETA_2016-10-13_00:00:00,13.2,46.0,IT1823A,PM10,Udine - Cairoli,NET.IT056A
IT/SPO.IT0508A_8_chemi_2010-01-01_00:00:00,12.9,45.9,IT0508A,NO2,Pordenone - Centro,NET.IT056A
IT/SPO.IT0953A_8_chemi_2010-01-01_00:00:00,12.5,41.9,IT0953A,NO2,Roma - Arenula,NET.IT012A
";

const POLLUTANT_VOCABULARY: &str = r#"{"concepts": [
    {"@id": "http://dd.eionet.europa.eu/vocabulary/aq/pollutant/5",
     "prefLabel": [{"@value": "Particulate matter < 10 µm (aerosol)"}], "Notation": "PM10"},
    {"@id": "http://dd.eionet.europa.eu/vocabulary/aq/pollutant/8",
     "prefLabel": [{"@value": "Nitrogen dioxide (air)"}], "Notation": "NO2"}
]}"#;

struct Workspace {
    root: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("metadata")).unwrap();
        fs::write(root.path().join("metadata/stations_metadata.csv"), REGISTRY).unwrap();

        let hourly = root.path().join("eea_hourly");
        let daily = root.path().join("eea_daily");
        write_parquet(
            &hourly.join("IT_5_2020.parquet"),
            df!(
                "Samplingpoint" => [
                    "IT/SPO.IT1823A_5_BETA_2016-10-13_00:00:00",
                    "IT/SPO.IT1823A_5_BETA_2016-10-13_00:00:00",
                    "IT/SPO.IT1823A_5_BETA_2016-10-13_00:00:00",
                ],
                "Pollutant" => [5i64, 5, 5],
                "Start" => ["2020-01-05 00:00:00", "2020-01-05 01:00:00", "2020-01-05 02:00:00"],
                "End" => ["2020-01-05 01:00:00", "2020-01-05 02:00:00", "2020-01-05 03:00:00"],
                "Value" => [21.5f64, 18.0, 19.25],
                "Validity" => [1i64, 1, 2],
                "Verification" => [1i64, 1, 1],
            )
            .unwrap(),
        );
        write_parquet(
            &daily.join("IT_8_2020.parquet"),
            df!(
                "Samplingpoint" => ["IT/SPO.IT0953A_8_chemi_2010-01-01_00:00:00"],
                "Pollutant" => [8i64],
                "Value" => [40.0f64],
            )
            .unwrap(),
        );
        Self { root }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root.path().join(relative)
    }

    fn request(&self) -> ExtractRequest {
        ExtractRequest {
            input_dirs: vec![self.path("eea_hourly"), self.path("eea_daily")],
            metadata_path: self.path("metadata/stations_metadata.csv"),
            output_path: self.path("eea_bbox.csv"),
            bbox: vec![12.3, 13.95, 45.58, 46.67],
            pollutants: Vec::new(),
            start: None,
            end: None,
            vocab_dir: None,
        }
    }
}

fn write_parquet(path: &Path, mut df: DataFrame) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let file = File::create(path).unwrap();
    ParquetWriter::new(file).finish(&mut df).unwrap();
}

fn config() -> ExtractConfig {
    ExtractConfig::default().with_workers(2).without_progress()
}

#[tokio::test]
async fn test_check_then_extract() {
    let workspace = Workspace::new();
    let processor = ExtractionProcessor::new(workspace.request(), config()).unwrap();
    let cancel = CancellationToken::new();

    let RunOutcome::Checked(report) = processor.run(RunMode::Check, &cancel).await.unwrap() else {
        panic!("expected a check outcome");
    };
    assert_eq!(report.summary_line(), "1 of 2 target stations matched");
    assert!(!workspace.path("eea_bbox.csv").exists());

    let RunOutcome::Extracted { stats, .. } = processor.run(RunMode::Extract, &cancel).await.unwrap()
    else {
        panic!("expected an extraction outcome");
    };
    assert_eq!(stats.total_rows, 3);
    assert_eq!(stats.files_scanned, 2);

    let content = fs::read_to_string(workspace.path("eea_bbox.csv")).unwrap();
    assert_eq!(content.lines().count(), 4);
    assert!(content.lines().skip(1).all(|line| line.contains(",IT1823A,")));
}

#[tokio::test]
async fn test_extract_then_enrich() {
    let workspace = Workspace::new();
    let processor = ExtractionProcessor::new(workspace.request(), config()).unwrap();
    processor
        .run(RunMode::Extract, &CancellationToken::new())
        .await
        .unwrap();

    let vocab_dir = workspace.path("eea_vocabularies");
    fs::create_dir_all(&vocab_dir).unwrap();
    fs::write(vocab_dir.join("pollutant.json"), POLLUTANT_VOCABULARY).unwrap();

    let request = EnrichRequest {
        input: workspace.path("eea_bbox.csv"),
        output: workspace.path("eea_enriched.csv"),
        metadata: workspace.path("metadata/stations_metadata.csv"),
        vocab_dir,
    };
    // Enrichment collects polars frames synchronously, so it runs off the
    // async runtime like the enrich command does
    let summary = tokio::task::spawn_blocking(move || {
        let vocabularies = Vocabularies::load_from_dir(&request.vocab_dir, &VocabularyKind::COMMON);
        Enricher::new(&vocabularies).unwrap().run(&request).unwrap()
    })
    .await
    .unwrap();

    assert_eq!(summary.input_rows, 3);
    assert_eq!(summary.output_rows, 3);
    assert_eq!(summary.rows_with_station_metadata, Some(3));
    assert_eq!(summary.rows_with_pollutant_name, 3);
    assert_eq!(summary.pollutants.len(), 1);
    assert_eq!(summary.pollutants[0].notation.as_deref(), Some("PM10"));

    let content = fs::read_to_string(workspace.path("eea_enriched.csv")).unwrap();
    let header: Vec<&str> = content.lines().next().unwrap().split(',').collect();
    assert_eq!(
        &header[..6],
        &[
            "Samplingpoint",
            "SamplingPointCore",
            "StationKey",
            "Pollutant",
            "Pollutant_Code",
            "Pollutant_Name",
        ]
    );
    assert!(header.contains(&"Air Quality Network"));
    assert!(content.contains("Udine - Cairoli"));
    assert!(content.contains("SPO.IT1823A"));
}

#[tokio::test]
async fn test_invalid_bbox_fails_before_reading_anything() {
    let request = ExtractRequest {
        input_dirs: vec![PathBuf::from("/does/not/exist")],
        metadata_path: PathBuf::from("/does/not/exist.csv"),
        output_path: PathBuf::from("/does/not/out.csv"),
        bbox: vec![13.0, 12.0, 45.0, 46.0],
        pollutants: Vec::new(),
        start: None,
        end: None,
        vocab_dir: None,
    };
    assert!(matches!(
        ExtractionProcessor::new(request, config()),
        Err(ExtractError::InvalidBoundingBox { .. })
    ));
}

#[test]
fn test_inspect_reports_each_file() {
    let workspace = Workspace::new();
    fs::write(workspace.path("eea_hourly/broken.parquet"), "broken").unwrap();

    let report = inspect_directory(
        &workspace.path("eea_hourly"),
        5,
        false,
        &IdentifierNormalizer::new().unwrap(),
    )
    .unwrap();

    assert_eq!(report.files_found, 2);
    let InspectEntry::Inspected(inspection) = &report.entries[0] else {
        panic!("expected the first file to be readable");
    };
    assert_eq!(inspection.rows, 3);
    assert_eq!(inspection.key_examples[0].1, "IT1823A");
    assert!(matches!(report.entries[1], InspectEntry::Unreadable { .. }));
}
