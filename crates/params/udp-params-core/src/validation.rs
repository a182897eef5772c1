//! Constraint checks for parameter defaults.
//!
//! Every declaration of a set is checked and every violation is reported;
//! nothing short-circuits. Checks are pure and never touch the set.

use std::fmt;

use hashbrown::HashSet;
use serde::Serialize;
use serde_json::Value as JsonValue;

use udp_api_core::extent::{describe, parse_iso_date};
use udp_api_core::{
    normalize_band_name, BandFamily, BandFormat, BoundingBox, Constraints, EndpointDeclaration,
    ExtentError, ParameterDeclaration, TemporalExtent,
};

use crate::parameter_set::ParameterSet;

/// Which rule a value broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    Type,
    BboxShape,
    LongitudeRange,
    LatitudeRange,
    WestBeforeEast,
    SouthBeforeNorth,
    MaxArea,
    TemporalShape,
    DateFormat,
    TemporalOrder,
    MaxDuration,
    EmptyBandList,
    UnknownBand,
    BandResolution,
    DuplicateBand,
    RequiredBand,
    Allowed,
    Minimum,
    Maximum,
}

impl Constraint {
    pub fn as_str(self) -> &'static str {
        match self {
            Constraint::Type => "type",
            Constraint::BboxShape => "bbox_shape",
            Constraint::LongitudeRange => "longitude_range",
            Constraint::LatitudeRange => "latitude_range",
            Constraint::WestBeforeEast => "west_before_east",
            Constraint::SouthBeforeNorth => "south_before_north",
            Constraint::MaxArea => "max_area",
            Constraint::TemporalShape => "temporal_shape",
            Constraint::DateFormat => "date_format",
            Constraint::TemporalOrder => "temporal_order",
            Constraint::MaxDuration => "max_duration",
            Constraint::EmptyBandList => "empty_band_list",
            Constraint::UnknownBand => "unknown_band",
            Constraint::BandResolution => "band_resolution",
            Constraint::DuplicateBand => "duplicate_band",
            Constraint::RequiredBand => "required_band",
            Constraint::Allowed => "allowed",
            Constraint::Minimum => "minimum",
            Constraint::Maximum => "maximum",
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub parameter: String,
    pub constraint: Constraint,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.parameter, self.constraint, self.message)
    }
}

/// Outcome of validating one set. No violations means valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationResult {
    pub set_identifier: String,
    pub violations: Vec<Violation>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.violations.iter()
    }

    pub fn for_parameter<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.violations.iter().filter(move |v| v.parameter == name)
    }

    pub fn has(&self, parameter: &str, constraint: Constraint) -> bool {
        self.violations
            .iter()
            .any(|v| v.parameter == parameter && v.constraint == constraint)
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            return write!(f, "parameter set '{}' is valid", self.set_identifier);
        }
        write!(
            f,
            "parameter set '{}' has {} violation(s): ",
            self.set_identifier,
            self.violations.len()
        )?;
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// Check every declaration of `set` against its constraints.
pub fn validate(set: &ParameterSet) -> ValidationResult {
    validate_with(set, None)
}

/// Check a set already rewritten for `endpoint`. Band tokens are read back
/// through the endpoint's band format before they are looked up.
pub fn validate_for_endpoint(
    set: &ParameterSet,
    endpoint: &EndpointDeclaration,
) -> ValidationResult {
    validate_with(set, Some(&endpoint.band_format))
}

fn validate_with(set: &ParameterSet, spelling: Option<&BandFormat>) -> ValidationResult {
    let mut violations = Vec::new();
    for decl in set.parameters.values() {
        check(decl, &decl.default, spelling, &mut violations);
    }
    ValidationResult {
        set_identifier: set.identifier.clone(),
        violations,
    }
}

/// Check a candidate value against one declaration.
pub fn validate_value(decl: &ParameterDeclaration, value: &JsonValue) -> Vec<Violation> {
    let mut violations = Vec::new();
    check(decl, value, None, &mut violations);
    violations
}

struct Report<'a> {
    parameter: &'a str,
    spelling: Option<&'a BandFormat>,
    out: &'a mut Vec<Violation>,
}

impl Report<'_> {
    fn push(&mut self, constraint: Constraint, message: impl Into<String>) {
        self.out.push(Violation {
            parameter: self.parameter.to_string(),
            constraint,
            message: message.into(),
        });
    }
}

fn check(
    decl: &ParameterDeclaration,
    value: &JsonValue,
    spelling: Option<&BandFormat>,
    out: &mut Vec<Violation>,
) {
    let mut report = Report {
        parameter: &decl.name,
        spelling,
        out,
    };
    match &decl.constraints {
        Constraints::Bbox { max_area_km2 } => check_bbox(value, *max_area_km2, &mut report),
        Constraints::TemporalRange { max_duration_days } => {
            check_temporal(value, *max_duration_days, &mut report)
        }
        Constraints::BandList {
            family,
            vocabulary,
            required,
        } => check_bands(value, *family, vocabulary.as_deref(), required, &mut report),
        Constraints::Enum { allowed } => check_enum(value, allowed, &mut report),
        Constraints::Number { min, max } => check_number(value, *min, *max, &mut report),
        Constraints::String => check_string(value, &mut report),
    }
}

fn check_bbox(value: &JsonValue, max_area_km2: Option<f64>, report: &mut Report<'_>) {
    let bbox = match BoundingBox::from_json(value) {
        Ok(bbox) => bbox,
        Err(err @ ExtentError::NonNumeric { .. }) => {
            report.push(Constraint::Type, err.to_string());
            return;
        }
        Err(err) => {
            report.push(Constraint::BboxShape, err.to_string());
            return;
        }
    };
    for (label, v) in [("west", bbox.west), ("east", bbox.east)] {
        if !(-180.0..=180.0).contains(&v) {
            report.push(
                Constraint::LongitudeRange,
                format!("{label} longitude {v} must be in [-180, 180]"),
            );
        }
    }
    for (label, v) in [("south", bbox.south), ("north", bbox.north)] {
        if !(-90.0..=90.0).contains(&v) {
            report.push(
                Constraint::LatitudeRange,
                format!("{label} latitude {v} must be in [-90, 90]"),
            );
        }
    }
    let west_ok = bbox.west < bbox.east;
    let south_ok = bbox.south < bbox.north;
    if !west_ok {
        report.push(
            Constraint::WestBeforeEast,
            format!("west ({}) must be less than east ({})", bbox.west, bbox.east),
        );
    }
    if !south_ok {
        report.push(
            Constraint::SouthBeforeNorth,
            format!("south ({}) must be less than north ({})", bbox.south, bbox.north),
        );
    }
    if let (Some(limit), true, true) = (max_area_km2, west_ok, south_ok) {
        let area = bbox.approx_area_km2();
        if area > limit {
            report.push(
                Constraint::MaxArea,
                format!("area {area:.0} km² exceeds the limit of {limit} km²"),
            );
        }
    }
}

fn check_temporal(value: &JsonValue, max_duration_days: Option<i64>, report: &mut Report<'_>) {
    let items = match value {
        JsonValue::Array(items) if items.len() == 2 => items,
        other => {
            report.push(
                Constraint::TemporalShape,
                format!("expected [start_date, end_date], got {}", describe(other)),
            );
            return;
        }
    };
    let mut dates = Vec::with_capacity(2);
    for (label, item) in ["start", "end"].into_iter().zip(items) {
        let Some(s) = item.as_str() else {
            report.push(
                Constraint::Type,
                format!("{label} date must be a string, got {}", describe(item)),
            );
            continue;
        };
        match parse_iso_date(s) {
            Ok(date) => dates.push(date),
            Err(err) => report.push(Constraint::DateFormat, err.to_string()),
        }
    }
    let &[start, end] = dates.as_slice() else {
        return;
    };
    let extent = TemporalExtent::new(start, end);
    if !extent.is_ordered() {
        report.push(
            Constraint::TemporalOrder,
            format!("start date {start} must be before or equal to end date {end}"),
        );
    } else if let Some(limit) = max_duration_days {
        let days = extent.duration_days();
        if days > limit {
            report.push(
                Constraint::MaxDuration,
                format!("range spans {days} days, more than the limit of {limit}"),
            );
        }
    }
}

fn check_bands(
    value: &JsonValue,
    family: BandFamily,
    vocabulary: Option<&[String]>,
    required: &[String],
    report: &mut Report<'_>,
) {
    let Some(items) = value.as_array() else {
        report.push(
            Constraint::Type,
            format!("bands must be a list, got {}", describe(value)),
        );
        return;
    };
    if items.is_empty() {
        report.push(Constraint::EmptyBandList, "band list must not be empty");
        return;
    }

    let vocabulary: Option<HashSet<String>> =
        vocabulary.map(|v| v.iter().map(|b| normalize_band_name(b)).collect());
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    for item in items {
        let Some(raw) = item.as_str() else {
            report.push(
                Constraint::Type,
                format!("band entries must be strings, got {}", describe(item)),
            );
            continue;
        };
        let Some(band) = canonical_band(raw, family, report) else {
            continue;
        };
        let known = match &vocabulary {
            Some(vocab) => vocab.contains(&band),
            None => family.contains(&band),
        };
        if !known {
            report.push(
                Constraint::UnknownBand,
                format!("invalid band '{raw}' for {}", family.as_str()),
            );
        }
        if !seen.insert(band.clone()) {
            report.push(
                Constraint::DuplicateBand,
                format!("band '{raw}' duplicates {band}"),
            );
        }
    }

    let missing: Vec<String> = required
        .iter()
        .map(|b| normalize_band_name(b))
        .filter(|b| !seen.contains(b))
        .collect();
    if !missing.is_empty() {
        report.push(
            Constraint::RequiredBand,
            format!("missing required bands: {}", missing.join(", ")),
        );
    }
}

/// Canonical token for `raw`, read through the report's band format if any.
fn canonical_band(raw: &str, family: BandFamily, report: &mut Report<'_>) -> Option<String> {
    let Some(format) = report.spelling else {
        return Some(normalize_band_name(raw));
    };
    let Some(token) = format.extract(raw) else {
        report.push(
            Constraint::UnknownBand,
            format!("band '{raw}' does not match the endpoint format '{format}'"),
        );
        return None;
    };
    let band = normalize_band_name(token.band);
    if let (Some(found), Some(info)) = (token.resolution, family.info(&band)) {
        if found != info.resolution {
            report.push(
                Constraint::BandResolution,
                format!("band '{raw}' is tagged {found}m, {band} is native {}m", info.resolution),
            );
        }
    }
    Some(band)
}

fn check_enum(value: &JsonValue, allowed: &[JsonValue], report: &mut Report<'_>) {
    if !allowed.contains(value) {
        let options: Vec<String> = allowed.iter().map(JsonValue::to_string).collect();
        report.push(
            Constraint::Allowed,
            format!("{value} is not one of [{}]", options.join(", ")),
        );
    }
}

fn check_number(value: &JsonValue, min: Option<f64>, max: Option<f64>, report: &mut Report<'_>) {
    let Some(n) = value.as_f64() else {
        report.push(
            Constraint::Type,
            format!("expected a number, got {}", describe(value)),
        );
        return;
    };
    if let Some(min) = min {
        if n < min {
            report.push(Constraint::Minimum, format!("{n} is below the minimum {min}"));
        }
    }
    if let Some(max) = max {
        if n > max {
            report.push(Constraint::Maximum, format!("{n} is above the maximum {max}"));
        }
    }
}

fn check_string(value: &JsonValue, report: &mut Report<'_>) {
    if !value.is_string() {
        report.push(
            Constraint::Type,
            format!("expected a string, got {}", describe(value)),
        );
    }
}
