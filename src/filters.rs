//! Row filters applied by the scanner besides station membership.
//!
//! Pollutant tokens given on the command line are resolved once, before any
//! file is opened, into a [`PollutantFilter`]. Time bounds are parsed into a
//! [`TimeRange`] with [`parse_time_range`].

use crate::constants::{DATE_FORMAT, POLLUTANT_SEED_TABLE, TIMESTAMP_FORMATS};
use crate::error::{ExtractError, Result};
use crate::models::{PollutantCode, TimeRange};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// Notation to numeric pollutant code lookup.
///
/// Starts from the fixed seed table and can be extended with pairs taken from
/// a pollutant vocabulary. Seed entries are never overridden.
#[derive(Debug, Clone)]
pub struct PollutantTable {
    codes: HashMap<String, i64>,
}

impl Default for PollutantTable {
    fn default() -> Self {
        Self::seed()
    }
}

impl PollutantTable {
    pub fn seed() -> Self {
        let codes = POLLUTANT_SEED_TABLE
            .iter()
            .map(|(name, code)| (name.to_uppercase(), *code))
            .collect();
        Self { codes }
    }

    /// Add notation/code pairs; existing entries win. Returns how many were added.
    pub fn extend<I, S>(&mut self, pairs: I) -> usize
    where
        I: IntoIterator<Item = (S, i64)>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for (name, code) in pairs {
            let key = name.as_ref().trim().to_uppercase();
            if key.is_empty() || self.codes.contains_key(&key) {
                continue;
            }
            self.codes.insert(key, code);
            added += 1;
        }
        added
    }

    pub fn lookup(&self, name: &str) -> Option<i64> {
        self.codes.get(&name.trim().to_uppercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Resolve a single user token: numeric tokens are accepted as-is, known
    /// names map to their code, anything else passes through unresolved.
    pub fn resolve_token(&self, token: &str) -> PollutantCode {
        let token = token.trim();
        if let Ok(code) = token.parse::<i64>() {
            return PollutantCode::Code(code);
        }
        match self.lookup(token) {
            Some(code) => PollutantCode::Code(code),
            None => PollutantCode::Unresolved(token.to_string()),
        }
    }
}

/// Resolved pollutant filter: rows are kept when their canonical pollutant
/// cell is one of the resolved codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollutantFilter {
    codes: Vec<PollutantCode>,
    keys: BTreeSet<String>,
}

impl PollutantFilter {
    /// Resolve user tokens through `table`. Unknown names are kept and a
    /// warning is logged for each.
    pub fn resolve<S: AsRef<str>>(tokens: &[S], table: &PollutantTable) -> Self {
        let mut codes: Vec<PollutantCode> = Vec::with_capacity(tokens.len());
        for token in tokens {
            let code = table.resolve_token(token.as_ref());
            match &code {
                PollutantCode::Code(value) => {
                    debug!("Pollutant '{}' resolved to code {}", token.as_ref(), value)
                }
                PollutantCode::Unresolved(name) => warn!(
                    "Unknown pollutant '{}', matching it literally against the Pollutant column",
                    name
                ),
            }
            if !codes.contains(&code) {
                codes.push(code);
            }
        }
        let keys = codes.iter().map(PollutantCode::match_key).collect();
        Self { codes, keys }
    }

    pub fn codes(&self) -> &[PollutantCode] {
        &self.codes
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().filter_map(|code| match code {
            PollutantCode::Unresolved(name) => Some(name.as_str()),
            PollutantCode::Code(_) => None,
        })
    }

    /// Test a raw pollutant cell value
    pub fn accepts(&self, cell: Option<&str>) -> bool {
        cell.is_some_and(|value| self.keys.contains(&canonical_pollutant(value)))
    }
}

/// Canonical text of a pollutant cell: the last path segment of a concept URI,
/// with integral floats (`5.0`) written as integers.
pub fn canonical_pollutant(cell: &str) -> String {
    let cell = cell.trim();
    let tail = cell.rsplit('/').next().unwrap_or(cell);
    match tail.parse::<f64>() {
        Ok(number) if number.is_finite() && number.fract() == 0.0 => {
            format!("{}", number as i64)
        }
        _ => tail.to_string(),
    }
}

/// Parse a user-supplied timestamp. Dates mean midnight; RFC 3339 values with
/// an offset are converted to naive UTC.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    parse_timestamp_lenient(value).ok_or_else(|| ExtractError::InvalidDate {
        value: value.to_string(),
    })
}

/// Like [`parse_timestamp`] but returns `None` instead of an error; used for
/// textual time columns in measurement files.
pub fn parse_timestamp_lenient(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    for format in TIMESTAMP_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, DATE_FORMAT) {
        return date.and_hms_opt(0, 0, 0);
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|parsed| parsed.naive_utc())
}

/// Build a validated time range from optional `--start`/`--end` values
pub fn parse_time_range(start: Option<&str>, end: Option<&str>) -> Result<TimeRange> {
    let start = start.map(parse_timestamp).transpose()?;
    let end = end.map(parse_timestamp).transpose()?;
    TimeRange::new(start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_lookup_is_case_insensitive() {
        let table = PollutantTable::seed();
        assert_eq!(table.lookup("pm10"), Some(5));
        assert_eq!(table.lookup("PM2.5"), Some(6001));
        assert_eq!(table.lookup("Benzene"), Some(20));
        assert_eq!(table.lookup("C6H6"), Some(20));
        assert_eq!(table.lookup("radon"), None);
    }

    #[test]
    fn test_extend_does_not_override_seed() {
        let mut table = PollutantTable::seed();
        let added = table.extend([("NO2", 999), ("Pb in PM10", 5012), ("", 1)]);
        assert_eq!(added, 1);
        assert_eq!(table.lookup("NO2"), Some(8));
        assert_eq!(table.lookup("pb in pm10"), Some(5012));
    }

    #[test]
    fn test_resolve_tokens() {
        let table = PollutantTable::seed();
        let filter = PollutantFilter::resolve(&["NO2", "6001", "pm10", "Radon", "8"], &table);
        assert_eq!(
            filter.codes(),
            &[
                PollutantCode::Code(8),
                PollutantCode::Code(6001),
                PollutantCode::Code(5),
                PollutantCode::Unresolved("Radon".into()),
            ]
        );
        assert_eq!(filter.unresolved().collect::<Vec<_>>(), vec!["Radon"]);
    }

    #[test]
    fn test_filter_accepts_canonical_cells() {
        let filter = PollutantFilter::resolve(&["NO2", "Radon"], &PollutantTable::seed());
        assert!(filter.accepts(Some("8")));
        assert!(filter.accepts(Some("8.0")));
        assert!(filter.accepts(Some("http://dd.eionet.europa.eu/vocabulary/aq/pollutant/8")));
        assert!(filter.accepts(Some("Radon")));
        assert!(!filter.accepts(Some("5")));
        assert!(!filter.accepts(Some("8.5")));
        assert!(!filter.accepts(None));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let midnight = parse_timestamp("2020-01-05").unwrap();
        assert_eq!(midnight.to_string(), "2020-01-05 00:00:00");
        assert_eq!(
            parse_timestamp("2020-01-05 13:30:00").unwrap().to_string(),
            "2020-01-05 13:30:00"
        );
        assert_eq!(
            parse_timestamp("2020-01-05T13:30").unwrap().to_string(),
            "2020-01-05 13:30:00"
        );
        assert_eq!(
            parse_timestamp("2020-01-05T13:30:00+01:00").unwrap().to_string(),
            "2020-01-05 12:30:00"
        );
        assert!(matches!(
            parse_timestamp("05/01/2020"),
            Err(ExtractError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_parse_time_range_validation() {
        assert!(parse_time_range(None, None).unwrap().is_unbounded());
        assert!(parse_time_range(Some("2020-01-01"), Some("2020-01-01")).is_ok());
        assert!(matches!(
            parse_time_range(Some("2020-02-01"), Some("2020-01-01")),
            Err(ExtractError::InvalidTimeRange { .. })
        ));
        assert!(matches!(
            parse_time_range(Some("yesterday"), None),
            Err(ExtractError::InvalidDate { .. })
        ));
    }
}
