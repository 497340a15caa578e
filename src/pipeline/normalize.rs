//! Normalizer: merge both extraction results into one [`NormalizedData`].

use crate::model::{ExtractionResult, NormalizedArea, NormalizedData};
use tracing::warn;

/// Build the canonical view of an inspection and a thermal result.
///
/// One record per area name. A repeated name replaces the earlier record's
/// findings in place; findings are not merged. Either argument may be of
/// the "wrong" kind, in which case it simply contributes nothing.
pub fn normalize(inspection: &ExtractionResult, thermal: &ExtractionResult) -> NormalizedData {
    let mut data = NormalizedData {
        thermal_readings: thermal.thermal_readings().to_vec(),
        ..Default::default()
    };

    for area in inspection.areas() {
        let record = NormalizedArea {
            negative_findings: area.negative_findings.clone(),
            positive_findings: area.positive_findings.clone(),
            thermal_readings: Vec::new(),
        };
        if data.areas.insert(area.name.clone(), record).is_some() {
            warn!("Area '{}' listed more than once; keeping the last entry", area.name);
        }
    }

    data
}
