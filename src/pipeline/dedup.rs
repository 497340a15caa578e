//! Deduplicator: drop repeated findings within each area.
//!
//! Equality is exact string equality. Survivors keep first-seen order so
//! output is deterministic across runs.

use crate::model::NormalizedData;
use std::collections::HashSet;

/// Reduce every area's findings to distinct entries. Idempotent.
pub fn deduplicate(mut data: NormalizedData) -> NormalizedData {
    for (_, area) in data.areas.iter_mut() {
        dedup_in_order(&mut area.negative_findings);
        dedup_in_order(&mut area.positive_findings);
    }
    data
}

fn dedup_in_order(findings: &mut Vec<String>) {
    let mut seen = HashSet::with_capacity(findings.len());
    findings.retain(|f| seen.insert(f.clone()));
}
