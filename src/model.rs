//! Data model shared by every pipeline stage.
//!
//! ```text
//! extract ──▶ ExtractionResult ──▶ normalize ──▶ NormalizedData ──▶ report
//!                                                   │
//!                                  conflicts / missing (Conflict, MissingInfo)
//! ```
//!
//! Model output is untrusted, so the raw types ([`Area`], [`ThermalReading`])
//! accept the shapes small models actually produce: `null` for lists, a bare
//! string where a list of findings was asked for, numbers where a
//! temperature string was asked for. All of that is coerced here, once, at
//! the deserialization boundary; downstream stages only ever see
//! `Vec<String>` findings and verbatim `String` readings.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Placeholder the report uses for any field the data cannot support.
pub const NOT_AVAILABLE: &str = "Not Available";

const UNKNOWN_AREA: &str = "Unknown Area";

// ── Raw extraction types ─────────────────────────────────────────────────

/// One impacted area as extracted from the inspection report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    #[serde(
        rename = "area_name",
        default = "unknown_area",
        deserialize_with = "area_name"
    )]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_seq")]
    pub negative_findings: Vec<String>,
    #[serde(default, deserialize_with = "string_or_seq")]
    pub positive_findings: Vec<String>,
}

impl Area {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            negative_findings: Vec::new(),
            positive_findings: Vec::new(),
        }
    }

    pub fn with_negative(mut self, finding: impl Into<String>) -> Self {
        self.negative_findings.push(finding.into());
        self
    }

    pub fn with_positive(mut self, finding: impl Into<String>) -> Self {
        self.positive_findings.push(finding.into());
        self
    }
}

/// One thermal image's readings. Values stay textual ("32.5°C") because the
/// report quotes them verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThermalReading {
    #[serde(default, deserialize_with = "verbatim_text")]
    pub image_id: String,
    #[serde(default, deserialize_with = "verbatim_text")]
    pub hotspot: String,
    #[serde(default, deserialize_with = "verbatim_text")]
    pub coldspot: String,
}

impl ThermalReading {
    pub fn new(
        image_id: impl Into<String>,
        hotspot: impl Into<String>,
        coldspot: impl Into<String>,
    ) -> Self {
        Self {
            image_id: image_id.into(),
            hotspot: hotspot.into(),
            coldspot: coldspot.into(),
        }
    }
}

/// Structured content of the inspection report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionData {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub areas: Vec<Area>,
    #[serde(default, deserialize_with = "string_or_seq")]
    pub general_observations: Vec<String>,
}

/// Structured content of the thermal report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThermalData {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub thermal_readings: Vec<ThermalReading>,
}

/// Output of one structured extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionResult {
    Inspection(InspectionData),
    Thermal(ThermalData),
}

impl ExtractionResult {
    /// Areas carried by an inspection result; empty for a thermal result.
    pub fn areas(&self) -> &[Area] {
        match self {
            ExtractionResult::Inspection(data) => &data.areas,
            ExtractionResult::Thermal(_) => &[],
        }
    }

    /// General observations of an inspection result; empty otherwise.
    pub fn general_observations(&self) -> &[String] {
        match self {
            ExtractionResult::Inspection(data) => &data.general_observations,
            ExtractionResult::Thermal(_) => &[],
        }
    }

    /// Readings carried by a thermal result; empty for an inspection result.
    pub fn thermal_readings(&self) -> &[ThermalReading] {
        match self {
            ExtractionResult::Thermal(data) => &data.thermal_readings,
            ExtractionResult::Inspection(_) => &[],
        }
    }
}

// ── Normalized types ─────────────────────────────────────────────────────

/// Canonical per-area record after normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedArea {
    pub negative_findings: Vec<String>,
    pub positive_findings: Vec<String>,
    pub thermal_readings: Vec<ThermalReading>,
}

impl NormalizedArea {
    pub fn has_findings(&self) -> bool {
        !self.negative_findings.is_empty() || !self.positive_findings.is_empty()
    }

    /// Negative findings followed by positive findings.
    pub fn all_findings(&self) -> impl Iterator<Item = &String> {
        self.negative_findings
            .iter()
            .chain(self.positive_findings.iter())
    }
}

/// Areas keyed by name, iterated in first-insertion order.
///
/// Re-inserting an existing name replaces its record but keeps its
/// original position. Names are compared exactly (case-sensitive).
/// Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AreaMap {
    entries: Vec<(String, NormalizedArea)>,
}

impl AreaMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; returns the replaced record, if any.
    pub fn insert(&mut self, name: impl Into<String>, area: NormalizedArea) -> Option<NormalizedArea> {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, area)),
            None => {
                self.entries.push((name, area));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&NormalizedArea> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut NormalizedArea> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, a)| a)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NormalizedArea)> {
        self.entries.iter().map(|(n, a)| (n.as_str(), a))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut NormalizedArea)> {
        self.entries.iter_mut().map(|(n, a)| (n.as_str(), a))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for AreaMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(n, a)| (n, a)))
    }
}

/// The merged view of both reports that every reasoning stage works on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedData {
    pub areas: AreaMap,
    /// Every reading from the thermal report, as extracted.
    pub thermal_readings: Vec<ThermalReading>,
    /// Readings whose image id names no known area. Filled by the linker.
    pub general_thermal_findings: Vec<ThermalReading>,
}

impl NormalizedData {
    /// Readings currently owned by areas or by the general bucket.
    pub fn linked_reading_count(&self) -> usize {
        self.areas
            .iter()
            .map(|(_, a)| a.thermal_readings.len())
            .sum::<usize>()
            + self.general_thermal_findings.len()
    }
}

// ── Findings ─────────────────────────────────────────────────────────────

/// The rule a [`Conflict`] violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    /// "No leakage" reported alongside dampness or seepage.
    LeakageVersusDampness,
    /// Plumbing marked both "yes" and "no".
    PlumbingYesAndNo,
}

/// A factual contradiction within one area's findings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub area: String,
    pub kind: ConflictKind,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ConflictKind::LeakageVersusDampness => write!(
                f,
                "Conflict in {}: 'No leakage' and dampness/seepage both reported.",
                self.area
            ),
            ConflictKind::PlumbingYesAndNo => write!(
                f,
                "Conflict in {}: Plumbing reported both Yes and No.",
                self.area
            ),
        }
    }
}

impl Serialize for Conflict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A gap in the data the report must call out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingInfo {
    NoAreas,
    NoFindings { area: String },
    NoThermalReadings,
}

impl fmt::Display for MissingInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingInfo::NoAreas => f.write_str("No impacted areas identified."),
            MissingInfo::NoFindings { area } => write!(f, "No findings available for {area}."),
            MissingInfo::NoThermalReadings => f.write_str("Thermal readings: Not Available."),
        }
    }
}

impl Serialize for MissingInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ── Report ───────────────────────────────────────────────────────────────

/// The seven sections of a Detailed Diagnostic Report.
///
/// Every key is required when parsing a generated report; a value of
/// [`NOT_AVAILABLE`] is legitimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSections {
    pub property_summary: String,
    pub area_observations: String,
    pub root_cause: String,
    pub severity: String,
    pub recommendations: String,
    pub additional_notes: String,
    pub missing_info: String,
}

impl ReportSections {
    /// `(heading, body)` pairs in report order.
    pub fn sections(&self) -> [(&'static str, &str); 7] {
        [
            ("Property Issue Summary", &self.property_summary),
            ("Area-wise Observations", &self.area_observations),
            ("Probable Root Cause", &self.root_cause),
            ("Severity Assessment", &self.severity),
            ("Recommended Actions", &self.recommendations),
            ("Additional Notes", &self.additional_notes),
            ("Missing or Unclear Information", &self.missing_info),
        ]
    }
}

// ── Lenient field decoders ───────────────────────────────────────────────

fn unknown_area() -> String {
    UNKNOWN_AREA.to_string()
}

fn area_name<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let name = match Value::deserialize(d)? {
        Value::Null => None,
        other => Some(scalar_text(other)),
    };
    Ok(name.unwrap_or_else(unknown_area))
}

fn verbatim_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(scalar_text(Value::deserialize(d)?))
}

/// A single string becomes a one-element list (empty string → empty list);
/// `null` becomes an empty list; non-string list items are stringified.
fn string_or_seq<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Null => Vec::new(),
        Value::String(s) if s.is_empty() => Vec::new(),
        Value::Array(items) => items
            .into_iter()
            .filter(|v| !v.is_null())
            .map(scalar_text)
            .collect(),
        other => vec![scalar_text(other)],
    })
}

fn null_as_empty<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
}

fn scalar_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}
