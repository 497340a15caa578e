//! Conflict detector: lexical contradiction checks within each area.
//!
//! Two rules, both case-insensitive substring tests:
//!
//! 1. A negative finding says "no leakage" while a negative finding mentions
//!    "damp" or "seepage".
//! 2. One finding mentions plumbing with "yes" and a different finding
//!    mentions plumbing with "no" (negative and positive findings pooled).
//!
//! Each triggered rule yields one [`Conflict`]; nothing is deduplicated.

use crate::model::{Conflict, ConflictKind, NormalizedArea, NormalizedData};

pub fn detect_conflicts(data: &NormalizedData) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    for (name, area) in data.areas.iter() {
        if leakage_versus_dampness(area) {
            conflicts.push(Conflict {
                area: name.to_string(),
                kind: ConflictKind::LeakageVersusDampness,
            });
        }
        if plumbing_yes_and_no(area) {
            conflicts.push(Conflict {
                area: name.to_string(),
                kind: ConflictKind::PlumbingYesAndNo,
            });
        }
    }

    conflicts
}

fn leakage_versus_dampness(area: &NormalizedArea) -> bool {
    let negative: Vec<String> = area.negative_findings.iter().map(|f| f.to_lowercase()).collect();
    let no_leakage = negative.iter().any(|f| f.contains("no leakage"));
    let dampness = negative
        .iter()
        .any(|f| f.contains("damp") || f.contains("seepage"));
    no_leakage && dampness
}

fn plumbing_yes_and_no(area: &NormalizedArea) -> bool {
    let plumbing: Vec<String> = area
        .all_findings()
        .map(|f| f.to_lowercase())
        .filter(|f| f.contains("plumbing"))
        .collect();

    plumbing.iter().enumerate().any(|(i, yes)| {
        yes.contains("yes")
            && plumbing
                .iter()
                .enumerate()
                .any(|(j, no)| i != j && no.contains("no"))
    })
}
