//! Application constants for the EEA extractor
//!
//! This module contains column names, CLI defaults, the pollutant seed table
//! and the output column grouping used throughout the application.

// =============================================================================
// Input Defaults
// =============================================================================

/// Default measurement directories (hourly and daily E1a/E2a downloads)
pub const DEFAULT_INPUT_DIRS: &[&str] = &["eea_hourly", "eea_daily"];

/// Default station metadata table
pub const DEFAULT_METADATA_PATH: &str = "metadata/stations_metadata.csv";

/// Default extraction output file
pub const DEFAULT_OUTPUT_PATH: &str = "eea_bbox.csv";

/// Default enrichment output file
pub const DEFAULT_ENRICHED_OUTPUT_PATH: &str = "eea_enriched.csv";

/// Default directory holding downloaded vocabulary JSON files
pub const DEFAULT_VOCABULARY_DIR: &str = "eea_vocabularies";

/// Default bounding box: min_lon, max_lon, min_lat, max_lat (Friuli Venezia Giulia)
pub const DEFAULT_BBOX: [f64; 4] = [12.3, 13.95, 45.58, 46.67];

/// Measurement file extension picked up by discovery
pub const MEASUREMENT_FILE_EXTENSION: &str = "parquet";

/// Files sampled per directory when reconciling identifiers
pub const DEFAULT_RECONCILE_SAMPLE_FILES: usize = 10;

/// Files examined by the inspect command
pub const DEFAULT_INSPECT_SAMPLE: usize = 5;

/// Distinct values listed per key column by the inspect command
pub const INSPECT_DISTINCT_VALUES: usize = 10;

/// Identifier examples shown per file by the inspect command
pub const INSPECT_KEY_EXAMPLES: usize = 5;

/// Upper bound on the default worker count
pub const MAX_DEFAULT_WORKERS: usize = 8;

/// Fraction of system memory in use above which concurrency is halved
pub const DEFAULT_MEMORY_THRESHOLD: f64 = 0.8;

// =============================================================================
// Registry Columns
// =============================================================================

/// Column names of the station metadata CSV
pub mod registry_columns {
    pub const SAMPLING_POINT_ID: &str = "Sampling Point Id";
    pub const LONGITUDE: &str = "Longitude";
    pub const LATITUDE: &str = "Latitude";
    pub const EOI_CODE: &str = "Air Quality Station EoI Code";
    pub const AIR_POLLUTANT: &str = "Air Pollutant";
    pub const STATION_NAME: &str = "Air Quality Station Name";
    pub const NETWORK: &str = "Air Quality Network";
    pub const STATION_AREA: &str = "Air Quality Station Area";
    pub const COUNTRY_CODE: &str = "Countrycode";

    /// Columns that must be present for extraction
    pub const REQUIRED: &[&str] = &[
        SAMPLING_POINT_ID,
        LONGITUDE,
        LATITUDE,
        EOI_CODE,
        AIR_POLLUTANT,
    ];

    /// Columns copied onto measurements by the enrich command, when present
    pub const ENRICHMENT: &[&str] = &[
        EOI_CODE,
        STATION_NAME,
        LONGITUDE,
        LATITUDE,
        NETWORK,
        STATION_AREA,
        COUNTRY_CODE,
    ];
}

// =============================================================================
// Measurement Columns
// =============================================================================

/// Column names of the measurement tables and derived output columns
pub mod columns {
    pub const SAMPLING_POINT: &str = "Samplingpoint";
    pub const AIR_QUALITY_STATION: &str = "AirQualityStation";
    pub const POLLUTANT: &str = "Pollutant";
    pub const START: &str = "Start";
    pub const END: &str = "End";
    pub const VALUE: &str = "Value";
    pub const UNIT: &str = "Unit";
    pub const AGG_TYPE: &str = "AggType";
    pub const VALIDITY: &str = "Validity";
    pub const VERIFICATION: &str = "Verification";
    pub const DATA_CAPTURE: &str = "DataCapture";

    /// Normalized station key added by the scanner
    pub const STATION_KEY: &str = "StationKey";

    /// Coarse join key added by the enrich command
    pub const SAMPLING_POINT_CORE: &str = "SamplingPointCore";

    pub const POLLUTANT_NAME: &str = "Pollutant_Name";
    pub const POLLUTANT_NOTATION: &str = "Pollutant_Code";
    pub const UNIT_LABEL: &str = "Unit_Label";
    pub const VERIFICATION_LABEL: &str = "Verification_Label";
}

/// Output column groups, emitted in this order; anything else follows
pub mod column_groups {
    use super::{columns, registry_columns};

    pub const IDENTIFIER: &[&str] = &[
        columns::SAMPLING_POINT,
        columns::SAMPLING_POINT_CORE,
        columns::STATION_KEY,
        columns::POLLUTANT,
        columns::POLLUTANT_NOTATION,
        columns::POLLUTANT_NAME,
    ];

    pub const STATION: &[&str] = &[
        registry_columns::EOI_CODE,
        registry_columns::STATION_NAME,
        registry_columns::LONGITUDE,
        registry_columns::LATITUDE,
    ];

    pub const MEASUREMENT: &[&str] = &[
        columns::START,
        columns::END,
        columns::VALUE,
        columns::UNIT,
        columns::UNIT_LABEL,
        columns::AGG_TYPE,
    ];

    pub const QUALITY: &[&str] = &[
        columns::VALIDITY,
        columns::VERIFICATION,
        columns::VERIFICATION_LABEL,
        columns::DATA_CAPTURE,
    ];

    pub const ORDERED: &[&[&str]] = &[IDENTIFIER, STATION, MEASUREMENT, QUALITY];
}

// =============================================================================
// Pollutant Codes
// =============================================================================

/// Seed mapping from pollutant notation to the numeric code used in the
/// Parquet downloads. Lookups are case-insensitive on the notation.
pub const POLLUTANT_SEED_TABLE: &[(&str, i64)] = &[
    ("PM10", 5),
    ("PM2.5", 6001),
    ("NO2", 8),
    ("O3", 7),
    ("SO2", 1),
    ("CO", 10),
    ("NO", 38),
    ("NOX", 9),
    ("BENZENE", 20),
    ("C6H6", 20),
];

// =============================================================================
// Enrichment
// =============================================================================

/// Number of leading non-null values sampled when detecting UUID columns
pub const UUID_SAMPLE_SIZE: usize = 10;

/// Share of sampled values that must look like UUIDs
pub const UUID_MATCH_RATIO: f64 = 0.8;

/// Timestamp formats accepted for --start/--end and textual time columns
pub const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Date-only format, interpreted as midnight
pub const DATE_FORMAT: &str = "%Y-%m-%d";
