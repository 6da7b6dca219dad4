//! Station identifier normalization.
//!
//! Sampling-point identifiers in the measurement files and in the station
//! registry follow different, drifting encodings, for example
//! `IT/SPO.IT1823A_5_BETA_2016-10-13_00:00:00` versus `SPO.IT1823A_5_BETA`.
//! [`IdentifierNormalizer`] reduces both to the canonical station token
//! (`IT1823A`) with an ordered chain of patterns; the first pattern that
//! matches wins and unmatched input passes through unchanged.
//!
//! [`coarse_key`] is a separate, cruder reduction used only by the enrich
//! join. The two are not interchangeable.

use crate::error::Result;
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;

/// The patterns of the fallback chain, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPatternKind {
    /// `CC/SPO.<token>_...`: country prefix, sampling-point marker, token
    CountryPrefixed,
    /// `<token>_` anywhere in the string
    Generic,
    /// `<token>` anywhere in the string
    Loose,
}

impl KeyPatternKind {
    /// Regex source for this pattern; the station token is capture group 1
    pub fn source(&self) -> &'static str {
        match self {
            KeyPatternKind::CountryPrefixed => r"[A-Z]{2}/SPO\.([A-Z]{2}[0-9]+[A-Z]?)_",
            KeyPatternKind::Generic => r"([A-Z]{2}[0-9]+[A-Z]?)_",
            KeyPatternKind::Loose => r"([A-Z]{2}[0-9]+[A-Z]?)",
        }
    }

    pub const CHAIN: [KeyPatternKind; 3] = [
        KeyPatternKind::CountryPrefixed,
        KeyPatternKind::Generic,
        KeyPatternKind::Loose,
    ];
}

/// One compiled step of the fallback chain
#[derive(Debug, Clone)]
pub struct KeyPattern {
    kind: KeyPatternKind,
    regex: Regex,
}

impl KeyPattern {
    pub fn compile(kind: KeyPatternKind) -> Result<Self> {
        Ok(Self {
            kind,
            regex: Regex::new(kind.source())?,
        })
    }

    pub fn kind(&self) -> KeyPatternKind {
        self.kind
    }

    /// Extract the station token if this pattern matches
    pub fn extract<'a>(&self, raw: &'a str) -> Option<&'a str> {
        self.regex
            .captures(raw)
            .and_then(|caps| caps.get(1))
            .map(|token| token.as_str())
    }
}

/// Derives canonical station keys from raw sampling-point identifiers.
///
/// Construct once per run and share it by reference or `Arc`; it holds only
/// compiled, immutable patterns.
#[derive(Debug, Clone)]
pub struct IdentifierNormalizer {
    chain: Vec<KeyPattern>,
}

impl IdentifierNormalizer {
    /// Build the standard three-step chain
    pub fn new() -> Result<Self> {
        Self::with_patterns(&KeyPatternKind::CHAIN)
    }

    /// Build a chain from an explicit list of patterns, tried in order
    pub fn with_patterns(kinds: &[KeyPatternKind]) -> Result<Self> {
        let chain = kinds
            .iter()
            .map(|kind| KeyPattern::compile(*kind))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { chain })
    }

    /// Return the first matching pattern and the token it extracted
    pub fn classify<'a>(&self, raw: &'a str) -> Option<(KeyPatternKind, &'a str)> {
        self.chain
            .iter()
            .find_map(|pattern| pattern.extract(raw).map(|token| (pattern.kind(), token)))
    }

    /// Normalize a raw identifier. Never fails: input that matches no pattern
    /// (including the empty string) is returned unchanged.
    pub fn normalize<'a>(&self, raw: &'a str) -> Cow<'a, str> {
        match self.classify(raw) {
            Some((_, token)) => Cow::Borrowed(token),
            None => Cow::Borrowed(raw),
        }
    }

    /// Normalize a possibly-missing identifier; a missing value stays missing
    pub fn normalize_opt(&self, raw: Option<&str>) -> Option<String> {
        raw.map(|value| self.normalize(value).into_owned())
    }

    /// Normalize a column of identifiers. Sampling points repeat heavily
    /// within a file, so results are memoized for the duration of the call.
    pub fn normalize_all<'a, I>(&self, values: I) -> Vec<Option<String>>
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut memo: HashMap<&'a str, String> = HashMap::new();
        values
            .into_iter()
            .map(|value| {
                value.map(|raw| {
                    memo.entry(raw)
                        .or_insert_with(|| self.normalize(raw).into_owned())
                        .clone()
                })
            })
            .collect()
    }
}

/// Coarse join key: drop everything up to the last `/`, then keep the text
/// before the first `_`. `IT/SPO.IT1823A_5_BETA` becomes `SPO.IT1823A`.
pub fn coarse_key(raw: &str) -> &str {
    let tail = raw.rsplit('/').next().unwrap_or(raw);
    tail.split('_').next().unwrap_or(tail)
}
