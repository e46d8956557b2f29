use std::collections::HashSet;

use crate::primary::PrimaryLookup;

/// ZIPs missing from the primary lookup, deduplicated in first-seen order.
///
/// Membership alone decides: a ZIP present in `primary` is never a gap,
/// whatever its value.
pub fn find_gaps<S: AsRef<str>>(requested: &[S], primary: &PrimaryLookup) -> Vec<String> {
    let mut seen = HashSet::new();
    requested
        .iter()
        .map(|zip| zip.as_ref())
        .filter(|zip| !primary.contains(zip))
        .filter(|zip| seen.insert(*zip))
        .map(str::to_string)
        .collect()
}
