//! Translation of state/county FIPS codes into display names.
//!
//! The table is two-level: state code -> county code -> county name. Coverage
//! for a new state is one `(code, abbr, counties)` entry in [`REGIONS`] plus its
//! county slice. Codes that are not covered translate to [`NOT_AVAILABLE`].

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::types::{NOT_AVAILABLE, zero_pad};

const CA_COUNTIES: &[(&str, &str)] = &[
    ("001", "Alameda"),
    ("013", "Contra Costa"),
    ("019", "Fresno"),
    ("029", "Kern"),
    ("037", "Los Angeles"),
    ("041", "Marin"),
    ("053", "Monterey"),
    ("055", "Napa"),
    ("059", "Orange"),
    ("061", "Placer"),
    ("065", "Riverside"),
    ("067", "Sacramento"),
    ("071", "San Bernardino"),
    ("073", "San Diego"),
    ("075", "San Francisco"),
    ("077", "San Joaquin"),
    ("079", "San Luis Obispo"),
    ("081", "San Mateo"),
    ("083", "Santa Barbara"),
    ("085", "Santa Clara"),
    ("087", "Santa Cruz"),
    ("095", "Solano"),
    ("097", "Sonoma"),
    ("099", "Stanislaus"),
    ("107", "Tulare"),
    ("111", "Ventura"),
    ("113", "Yolo"),
];

/// Registered states: (state FIPS, postal abbreviation, counties)
const REGIONS: &[(&str, &str, &[(&str, &str)])] = &[
    ("06", "CA", CA_COUNTIES),
    // Recognised states without county coverage yet
    ("36", "NY", &[]),
    ("48", "TX", &[]),
];

static DEFAULT_TABLE: LazyLock<CountyLookupTable> = LazyLock::new(CountyLookupTable::builtin);

/// Counties known for one state
#[derive(Debug, Clone, Default)]
struct Region {
    state_abbr: String,
    counties: HashMap<String, String>,
}

/// Static (state, county) -> "Name County, ST" lookup
#[derive(Debug, Clone, Default)]
pub struct CountyLookupTable {
    regions: HashMap<String, Region>,
}

impl CountyLookupTable {
    /// Empty table, mostly useful for tests and custom coverage
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with every region compiled into the crate
    pub fn builtin() -> Self {
        let mut table = Self::new();
        for (code, abbr, counties) in REGIONS {
            table.insert_region(code, abbr, counties.iter().copied());
        }
        table
    }

    /// Shared instance of [`CountyLookupTable::builtin`]
    pub fn global() -> &'static Self {
        &DEFAULT_TABLE
    }

    /// Register a state and its counties. Existing counties for the same
    /// state are kept; new names overwrite old ones for the same code.
    pub fn insert_region<'a>(
        &mut self,
        region_code: &str,
        state_abbr: &str,
        counties: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> &mut Self {
        let region = self
            .regions
            .entry(region_code.to_string())
            .or_insert_with(|| Region {
                state_abbr: state_abbr.to_string(),
                counties: HashMap::new(),
            });
        region.state_abbr = state_abbr.to_string();
        region.counties.extend(
            counties
                .into_iter()
                .map(|(code, name)| (code.to_string(), name.to_string())),
        );
        self
    }

    /// Display name for a state/county pair, if covered
    pub fn lookup(&self, region_code: &str, sub_region_code: &str) -> Option<String> {
        let region = self.regions.get(region_code)?;
        let county = region.counties.get(sub_region_code)?;
        Some(format!("{} County, {}", county, region.state_abbr))
    }

    /// Display name for a state/county pair, or `"N/A"`
    pub fn translate(&self, region_code: &str, sub_region_code: &str) -> String {
        self.lookup(region_code, sub_region_code)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    /// Translate a combined 5-digit FIPS code such as `06037` or `6037`
    pub fn translate_fips(&self, fips: &str) -> String {
        let (region, sub_region) = split_fips(fips);
        self.translate(&region, &sub_region)
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }
}

/// Translate using the built-in table
pub fn translate(region_code: &str, sub_region_code: &str) -> String {
    CountyLookupTable::global().translate(region_code, sub_region_code)
}

/// Split a combined county FIPS code into (state, county), zero-padding first
pub fn split_fips(fips: &str) -> (String, String) {
    let padded = zero_pad(fips, 5);
    match padded.char_indices().nth(2) {
        Some((idx, _)) => (padded[..idx].to_string(), padded[idx..].to_string()),
        None => (padded, String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_known_county() {
        assert_eq!(translate("06", "037"), "Los Angeles County, CA");
        assert_eq!(translate("06", "075"), "San Francisco County, CA");
    }

    #[test]
    fn test_translate_missing_is_na() {
        // State registered, county not covered
        assert_eq!(translate("36", "061"), NOT_AVAILABLE);
        // Unknown state
        assert_eq!(translate("99", "001"), NOT_AVAILABLE);
        // Malformed codes simply miss
        assert_eq!(translate("6", "37"), NOT_AVAILABLE);
    }

    #[test]
    fn test_translate_fips() {
        let table = CountyLookupTable::global();
        assert_eq!(table.translate_fips("6037"), "Los Angeles County, CA");
        assert_eq!(table.translate_fips("06111"), "Ventura County, CA");
        assert_eq!(table.translate_fips("48201"), NOT_AVAILABLE);
    }

    #[test]
    fn test_split_fips() {
        assert_eq!(split_fips("6085"), ("06".to_string(), "085".to_string()));
        assert_eq!(split_fips("36061"), ("36".to_string(), "061".to_string()));
    }

    #[test]
    fn test_extend_with_new_region() {
        let mut table = CountyLookupTable::builtin();
        let before = table.region_count();
        table.insert_region("53", "WA", [("033", "King")]);
        assert_eq!(table.region_count(), before + 1);
        assert_eq!(table.translate("53", "033"), "King County, WA");
        // Existing coverage untouched
        assert_eq!(table.translate("06", "001"), "Alameda County, CA");
    }
}
