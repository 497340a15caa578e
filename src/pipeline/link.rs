//! Area linker: attach thermal readings to the areas their image ids name.
//!
//! Matching is a case-insensitive substring test of the area name inside
//! the image id. Areas are tried in insertion order and the first match
//! wins. Unmatched readings go to `general_thermal_findings`.

use crate::model::NormalizedData;
use tracing::debug;

/// Distribute `data.thermal_readings` over areas and the general bucket.
///
/// Previously linked readings are cleared first, so re-linking the same
/// data yields the same result. The staging `thermal_readings` list is
/// left intact.
pub fn link(mut data: NormalizedData) -> NormalizedData {
    data.general_thermal_findings.clear();
    for (_, area) in data.areas.iter_mut() {
        area.thermal_readings.clear();
    }

    let lowered: Vec<String> = data.areas.names().map(str::to_lowercase).collect();

    for reading in &data.thermal_readings {
        let image_id = reading.image_id.to_lowercase();
        let target = lowered
            .iter()
            .position(|name| image_id.contains(name.as_str()));

        match target.and_then(|idx| data.areas.iter_mut().nth(idx)) {
            Some((name, area)) => {
                debug!("Linked {} to {}", reading.image_id, name);
                area.thermal_readings.push(reading.clone());
            }
            None => data.general_thermal_findings.push(reading.clone()),
        }
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NormalizedArea, ThermalReading};

    fn data(areas: &[&str], image_ids: &[&str]) -> NormalizedData {
        let mut d = NormalizedData::default();
        for a in areas {
            d.areas.insert(*a, NormalizedArea::default());
        }
        d.thermal_readings = image_ids
            .iter()
            .map(|id| ThermalReading::new(*id, "30°C", "20°C"))
            .collect();
        d
    }

    #[test]
    fn links_by_case_insensitive_substring() {
        let out = link(data(&["Hall", "Kitchen"], &["IMG_HALL_01", "kitchen-2", "IMG_9"]));
        assert_eq!(out.areas.get("Hall").unwrap().thermal_readings.len(), 1);
        assert_eq!(out.areas.get("Kitchen").unwrap().thermal_readings.len(), 1);
        assert_eq!(out.general_thermal_findings.len(), 1);
        assert_eq!(out.general_thermal_findings[0].image_id, "IMG_9");
    }

    #[test]
    fn first_area_in_order_wins() {
        let out = link(data(&["Bed", "Bedroom"], &["bedroom_1"]));
        assert_eq!(out.areas.get("Bed").unwrap().thermal_readings.len(), 1);
        assert!(out.areas.get("Bedroom").unwrap().thermal_readings.is_empty());
    }

    #[test]
    fn preserves_cardinality() {
        let out = link(data(&["Hall"], &["hall1", "hall2", "x", "y"]));
        assert_eq!(out.linked_reading_count(), out.thermal_readings.len());
    }

    #[test]
    fn no_areas_sends_everything_to_general() {
        let out = link(data(&[], &["a", "b"]));
        assert_eq!(out.general_thermal_findings.len(), 2);
    }

    #[test]
    fn relinking_is_stable() {
        let once = link(data(&["Hall"], &["hall1", "other"]));
        let twice = link(once.clone());
        assert_eq!(once, twice);
    }
}
