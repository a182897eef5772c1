//! Spatial and temporal extents as they appear in parameter defaults.
//!
//! Accepted JSON shapes:
//!   bbox:     { "west": 12.0, "south": 45.3, "east": 12.6, "north": 45.6 } or [w, s, e, n]
//!   temporal: [ "2023-06-01", "2023-06-30" ]
//!
//! Parsing only checks shape; range and ordering rules live in the validation engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Kilometres per degree at the equator, used for the rough area estimate.
pub const KM_PER_DEGREE: f64 = 111.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtentError {
    #[error("expected {expected}, got {found}")]
    Shape {
        expected: &'static str,
        found: String,
    },
    #[error("bbox field '{field}' must be numeric")]
    NonNumeric { field: &'static str },
    #[error("invalid date format: {value}. Expected YYYY-MM-DD")]
    DateFormat { value: String },
    #[error("invalid date value: {value}")]
    DateValue { value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    pub fn from_json(value: &JsonValue) -> Result<Self, ExtentError> {
        const FIELDS: [&str; 4] = ["west", "south", "east", "north"];
        let mut out = [0.0f64; 4];
        match value {
            JsonValue::Object(map) => {
                for (slot, field) in out.iter_mut().zip(FIELDS) {
                    let v = map.get(field).ok_or_else(|| ExtentError::Shape {
                        expected: "object with west/south/east/north",
                        found: format!("object without '{field}'"),
                    })?;
                    *slot = v.as_f64().ok_or(ExtentError::NonNumeric { field })?;
                }
            }
            JsonValue::Array(items) if items.len() == 4 => {
                for ((slot, field), v) in out.iter_mut().zip(FIELDS).zip(items) {
                    *slot = v.as_f64().ok_or(ExtentError::NonNumeric { field })?;
                }
            }
            other => {
                return Err(ExtentError::Shape {
                    expected: "4-tuple (west, south, east, north)",
                    found: describe(other),
                })
            }
        }
        Ok(Self::new(out[0], out[1], out[2], out[3]))
    }

    /// Area estimate in km², treating one degree as [`KM_PER_DEGREE`] on both axes.
    pub fn approx_area_km2(&self) -> f64 {
        let width = self.east - self.west;
        let height = self.north - self.south;
        width * height * KM_PER_DEGREE * KM_PER_DEGREE
    }
}

/// Closed calendar-date interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalExtent {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TemporalExtent {
    /// Ordering is not checked here.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }

    pub fn duration_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// Parse a strict `YYYY-MM-DD` calendar date.
pub fn parse_iso_date(s: &str) -> Result<NaiveDate, ExtentError> {
    let bytes = s.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !well_formed {
        return Err(ExtentError::DateFormat { value: s.into() });
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| ExtentError::DateValue { value: s.into() })
}

/// Short human description of a JSON value's type, for error messages.
pub fn describe(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "null".into(),
        JsonValue::Bool(_) => "boolean".into(),
        JsonValue::Number(_) => "number".into(),
        JsonValue::String(_) => "string".into(),
        JsonValue::Array(a) => format!("array of length {}", a.len()),
        JsonValue::Object(_) => "object".into(),
    }
}
