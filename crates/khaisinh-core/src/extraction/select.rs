//! Region selection and deduplication.

use std::collections::HashSet;

use crate::models::Region;

/// Pick at most one region per label, highest confidence first.
///
/// Regions are ordered by descending confidence with ties kept in
/// detector order. Labels outside `allow` are skipped, and the first
/// region seen for a label wins. An empty `allow` filters nothing.
pub fn select_regions(mut regions: Vec<Region>, allow: Option<&HashSet<String>>) -> Vec<Region> {
    regions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let allow = allow.filter(|allow| !allow.is_empty());

    let mut seen: HashSet<String> = HashSet::new();
    regions
        .into_iter()
        .filter(|region| allow.is_none_or(|allow| allow.contains(&region.label)))
        .filter(|region| seen.insert(region.label.clone()))
        .collect()
}
