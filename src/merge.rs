use std::collections::HashMap;

use crate::primary::PrimaryLookup;
use crate::types::{NOT_AVAILABLE, ResolutionStats, ResolvedZip};

/// Build one output row per requested ZIP, in input order.
///
/// Duplicate requests are kept as duplicate rows. The primary lookup always
/// takes precedence over `secondary`; anything found in neither is `"N/A"`.
pub fn merge<S: AsRef<str>>(
    requested: &[S],
    primary: &PrimaryLookup,
    secondary: &HashMap<String, String>,
) -> Vec<ResolvedZip> {
    requested
        .iter()
        .map(|zip| {
            let zip = zip.as_ref();
            let county_and_state = primary
                .get(zip)
                .or_else(|| secondary.get(zip).map(String::as_str))
                .unwrap_or(NOT_AVAILABLE);
            ResolvedZip {
                zip: zip.to_string(),
                county_and_state: county_and_state.to_string(),
            }
        })
        .collect()
}

/// Tally a merged result for reporting
pub fn summarize(
    rows: &[ResolvedZip],
    primary: &PrimaryLookup,
    gaps: usize,
    secondary_filled: usize,
) -> ResolutionStats {
    ResolutionStats {
        requested: rows.len(),
        primary_hits: rows.iter().filter(|row| primary.contains(&row.zip)).count(),
        gaps,
        secondary_filled,
        unresolved: rows.iter().filter(|row| !row.is_resolved()).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ZipRecord;

    fn primary() -> PrimaryLookup {
        PrimaryLookup::build(vec![ZipRecord::new("94110", "San Francisco County, CA")])
    }

    fn row(zip: &str, county: &str) -> ResolvedZip {
        ResolvedZip {
            zip: zip.to_string(),
            county_and_state: county.to_string(),
        }
    }

    #[test]
    fn test_unknown_zip_is_na() {
        let rows = merge(&["94110", "99999"], &primary(), &HashMap::new());
        assert_eq!(
            rows,
            vec![
                row("94110", "San Francisco County, CA"),
                row("99999", NOT_AVAILABLE)
            ]
        );
    }

    #[test]
    fn test_primary_wins_over_secondary() {
        let secondary = HashMap::from([
            ("94110".to_string(), "San Mateo County, CA".to_string()),
            ("91436".to_string(), "Los Angeles County, CA".to_string()),
        ]);
        let rows = merge(&["91436", "94110"], &primary(), &secondary);
        assert_eq!(
            rows,
            vec![
                row("91436", "Los Angeles County, CA"),
                row("94110", "San Francisco County, CA"),
            ]
        );
    }

    #[test]
    fn test_duplicates_preserved_in_order() {
        let rows = merge(&["94110", "99999", "94110"], &primary(), &HashMap::new());
        let zips: Vec<&str> = rows.iter().map(|r| r.zip.as_str()).collect();
        assert_eq!(zips, vec!["94110", "99999", "94110"]);
        assert_eq!(rows[0], rows[2]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let secondary = HashMap::from([("91436".to_string(), "Los Angeles County, CA".to_string())]);
        let requested = ["91436", "94110", "00501", "91436"];
        let first = merge(&requested, &primary(), &secondary);
        let second = merge(&requested, &primary(), &secondary);
        assert_eq!(first, second);
    }

    #[test]
    fn test_summarize() {
        let secondary = HashMap::from([("91436".to_string(), "Los Angeles County, CA".to_string())]);
        let requested = ["94110", "91436", "99999", "94110"];
        let rows = merge(&requested, &primary(), &secondary);
        let stats = summarize(&rows, &primary(), 2, 1);
        assert_eq!(
            stats,
            ResolutionStats {
                requested: 4,
                primary_hits: 2,
                gaps: 2,
                secondary_filled: 1,
                unresolved: 1,
            }
        );
    }
}
