//! Missing-data detector: gaps the report must call out.

use crate::model::{MissingInfo, NormalizedData};

/// List every gap, in a fixed order: no areas, then each area without
/// findings, then absent thermal readings.
pub fn detect_missing(data: &NormalizedData) -> Vec<MissingInfo> {
    let mut missing = Vec::new();

    if data.areas.is_empty() {
        missing.push(MissingInfo::NoAreas);
    }

    missing.extend(
        data.areas
            .iter()
            .filter(|(_, area)| !area.has_findings())
            .map(|(name, _)| MissingInfo::NoFindings {
                area: name.to_string(),
            }),
    );

    if data.thermal_readings.is_empty() {
        missing.push(MissingInfo::NoThermalReadings);
    }

    missing
}
