//! Picks one county per gap ZIP from the historical crosswalk.
//!
//! Selection policy, in order:
//! 1. only the rows with the latest `valid_end_date` for the ZIP are considered
//! 2. of those, only rows with `residential_ratio >= 0.50`
//! 3. if several remain, the highest ratio wins; ties go to the first row seen
//!
//! Anything that falls through (no rows, no majority, untranslatable code)
//! resolves to `"N/A"`.
//!
//! Requested ZIPs and crosswalk ZIPs are compared on their 5-digit zero-padded
//! form, so `"501"` matches a `"00501"` row.

use std::collections::HashMap;

use crate::fips::CountyLookupTable;
use crate::types::{CrosswalkRecord, NOT_AVAILABLE, zero_pad};

/// Minimum residential share for a county to claim a ZIP
pub const MAJORITY_RATIO: f64 = 0.5;

/// Select the winning crosswalk row among one ZIP's candidates
pub fn select_candidate<'a, I>(candidates: I) -> Option<&'a CrosswalkRecord>
where
    I: IntoIterator<Item = &'a CrosswalkRecord>,
    I::IntoIter: Clone,
{
    let candidates = candidates.into_iter();
    let latest = candidates.clone().map(|c| c.valid_end_date).max()?;

    let mut best: Option<&CrosswalkRecord> = None;
    for candidate in candidates
        .filter(|c| c.valid_end_date == latest)
        .filter(|c| c.residential_ratio >= MAJORITY_RATIO)
    {
        match best {
            Some(current) if candidate.residential_ratio <= current.residential_ratio => {}
            _ => best = Some(candidate),
        }
    }
    best
}

/// Resolve one ZIP to "County, ST" or `"N/A"`
pub fn resolve(zip: &str, candidates: &[CrosswalkRecord], lookup: &CountyLookupTable) -> String {
    let key = zero_pad(zip, 5);
    let own = candidates.iter().filter(|c| zero_pad(&c.zip, 5) == key);
    match select_candidate(own) {
        Some(chosen) => lookup.translate(&chosen.region_code, &chosen.sub_region_code),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Resolve every gap ZIP against a bulk set of crosswalk rows.
///
/// Only ZIPs that resolve to a real county are returned, keyed by the gap
/// token exactly as given.
pub fn resolve_gaps<S: AsRef<str>>(
    gaps: &[S],
    records: &[CrosswalkRecord],
    lookup: &CountyLookupTable,
) -> HashMap<String, String> {
    let mut by_zip: HashMap<String, Vec<&CrosswalkRecord>> = HashMap::new();
    for record in records {
        by_zip.entry(zero_pad(&record.zip, 5)).or_default().push(record);
    }

    let mut resolved = HashMap::new();
    for zip in gaps.iter().map(|zip| zip.as_ref()) {
        let Some(candidates) = by_zip.get(&zero_pad(zip, 5)) else {
            tracing::debug!(zip, "no crosswalk candidates");
            continue;
        };
        let Some(chosen) = select_candidate(candidates.iter().copied()) else {
            tracing::debug!(zip, candidates = candidates.len(), "no majority county");
            continue;
        };
        match lookup.lookup(&chosen.region_code, &chosen.sub_region_code) {
            Some(name) => {
                resolved.insert(zip.to_string(), name);
            }
            None => tracing::debug!(
                zip,
                region = %chosen.region_code,
                sub_region = %chosen.sub_region_code,
                "county code not in lookup table"
            ),
        }
    }
    resolved
}
