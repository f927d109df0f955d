//! Code normalization and coordinate extraction rules.
//!
//! Each reference source is described by a static [`SourceLayout`]: where its
//! raw file lives, how to derive the lookup key from the raw code column
//! ([`CodeRule`]) and how to obtain a canonical `lat`/`lon` pair
//! ([`CoordinateRule`]). The loader applies these rules row by row.

use crate::constants::{CODE, LAT, LON, iata, insee, tvs, uic};
use crate::models::Source;
use std::fmt;

/// A raw value that could not be normalized
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub value: String,
    pub reason: String,
}

impl FieldError {
    fn new(value: &str, reason: impl Into<String>) -> Self {
        Self {
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}': {}", self.value, self.reason)
    }
}

/// How the lookup key is derived from the raw code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeRule {
    /// Raw code used verbatim
    AsIs,
    /// Numeric code with its trailing check digit dropped
    TruncateCheckDigit,
    /// Raw code appended to a fixed literal
    Prefix(&'static str),
}

impl CodeRule {
    pub fn derive(&self, raw: &str) -> Result<String, FieldError> {
        let raw = raw.trim();
        match self {
            CodeRule::AsIs => Ok(raw.to_string()),
            CodeRule::TruncateCheckDigit => truncate_check_digit(raw),
            CodeRule::Prefix(prefix) => Ok(format!("{}{}", prefix, raw)),
        }
    }
}

/// Drop the trailing check digit of a numeric code.
///
/// The remaining digits are reparsed as an integer, so leading zeros
/// disappear: `"0871234"` becomes `"87123"`.
pub fn truncate_check_digit(raw: &str) -> Result<String, FieldError> {
    if !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(FieldError::new(raw, "code is not numeric"));
    }
    if raw.len() < 2 {
        return Err(FieldError::new(raw, "code has no digit left after the check digit"));
    }

    let truncated = &raw[..raw.len() - 1];
    truncated
        .parse::<u64>()
        .map(|code| code.to_string())
        .map_err(|e| FieldError::new(raw, format!("code out of range: {}", e)))
}

/// Where the coordinates of a row come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateRule {
    /// One column holding a `"lat,lon"` string
    Combined { column: &'static str },
    /// Two numeric columns renamed to `lat`/`lon`; the originals are dropped
    Renamed {
        lat: &'static str,
        lon: &'static str,
    },
    /// Two numeric columns copied to `lat`/`lon`; the originals are kept
    Copied {
        lat: &'static str,
        lon: &'static str,
    },
}

impl CoordinateRule {
    /// Raw columns read by this rule, in the order `extract` expects them
    pub fn columns(&self) -> Vec<&'static str> {
        match *self {
            CoordinateRule::Combined { column } => vec![column],
            CoordinateRule::Renamed { lat, lon } | CoordinateRule::Copied { lat, lon } => {
                vec![lat, lon]
            }
        }
    }

    /// Whether a raw column disappears from the output record
    pub fn consumes(&self, column: &str) -> bool {
        match *self {
            CoordinateRule::Renamed { lat, lon } => column == lat || column == lon,
            _ => false,
        }
    }

    /// Extract `(lat, lon)` from the values of [`columns`](Self::columns)
    pub fn extract(&self, values: &[&str]) -> Result<(f64, f64), FieldError> {
        match self {
            CoordinateRule::Combined { .. } => split_coordinates(values[0]),
            CoordinateRule::Renamed { .. } | CoordinateRule::Copied { .. } => {
                Ok((parse_degrees(values[0])?, parse_degrees(values[1])?))
            }
        }
    }
}

/// Split a combined `"lat,lon"` string.
///
/// Exactly one comma is accepted; both halves must parse as finite floats.
pub fn split_coordinates(value: &str) -> Result<(f64, f64), FieldError> {
    let mut parts = value.split(',');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(lat), Some(lon), None) => {
            let lat = parse_degrees(lat).map_err(|e| FieldError::new(value, e.reason))?;
            let lon = parse_degrees(lon).map_err(|e| FieldError::new(value, e.reason))?;
            Ok((lat, lon))
        }
        _ => Err(FieldError::new(
            value,
            "expected exactly one comma between latitude and longitude",
        )),
    }
}

/// Parse a single coordinate in decimal degrees
pub fn parse_degrees(value: &str) -> Result<f64, FieldError> {
    let trimmed = value.trim();
    match trimmed.parse::<f64>() {
        Ok(degrees) if degrees.is_finite() => Ok(degrees),
        Ok(_) => Err(FieldError::new(value, "coordinate is not finite")),
        Err(_) => Err(FieldError::new(value, "coordinate is not a number")),
    }
}

/// Static description of one raw reference source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    pub source: Source,
    pub delimiter: u8,
    pub code_column: &'static str,
    pub code_rule: CodeRule,
    pub coordinates: CoordinateRule,
    /// Columns whose missing value drops the row
    pub required: &'static [&'static str],
}

impl SourceLayout {
    pub fn for_source(source: Source) -> Self {
        match source {
            Source::Insee => Self {
                source,
                delimiter: b';',
                code_column: insee::CODE_COLUMN,
                code_rule: CodeRule::AsIs,
                coordinates: CoordinateRule::Combined {
                    column: insee::GPS_COLUMN,
                },
                required: &[insee::CODE_COLUMN, insee::GPS_COLUMN],
            },
            Source::Uic => Self {
                source,
                delimiter: b';',
                code_column: uic::CODE_COLUMN,
                code_rule: CodeRule::TruncateCheckDigit,
                coordinates: CoordinateRule::Renamed {
                    lat: uic::Y_COLUMN,
                    lon: uic::X_COLUMN,
                },
                required: &[
                    uic::CODE_COLUMN,
                    uic::GEO_COLUMN,
                    uic::X_COLUMN,
                    uic::Y_COLUMN,
                ],
            },
            Source::Tvs => Self {
                source,
                delimiter: b';',
                code_column: tvs::CODE_COLUMN,
                code_rule: CodeRule::Prefix(tvs::KEY_PREFIX),
                coordinates: CoordinateRule::Combined {
                    column: tvs::GPS_COLUMN,
                },
                required: &[tvs::CODE_COLUMN, tvs::GPS_COLUMN],
            },
            Source::Iata => Self {
                source,
                delimiter: b',',
                code_column: iata::CODE_COLUMN,
                code_rule: CodeRule::AsIs,
                coordinates: CoordinateRule::Copied {
                    lat: iata::LAT_COLUMN,
                    lon: iata::LON_COLUMN,
                },
                required: &[iata::CODE_COLUMN, iata::LAT_COLUMN, iata::LON_COLUMN],
            },
        }
    }

    pub fn file_name(&self) -> &'static str {
        self.source.raw_file_name()
    }

    /// Every column the raw file must provide
    pub fn expected_columns(&self) -> Vec<&'static str> {
        let mut columns = vec![self.code_column];
        columns.extend(self.required.iter().copied());
        columns.extend(self.coordinates.columns());

        let mut seen = Vec::with_capacity(columns.len());
        for column in columns {
            if !seen.contains(&column) {
                seen.push(column);
            }
        }
        seen
    }

    /// Whether a raw column is carried into the record's passthrough fields
    pub fn is_passthrough(&self, column: &str) -> bool {
        if [CODE, LAT, LON].contains(&column) {
            return false;
        }
        if column == self.code_column && self.code_rule == CodeRule::AsIs {
            return false;
        }
        !self.coordinates.consumes(column)
    }
}
