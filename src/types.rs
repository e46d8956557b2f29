use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel written for any ZIP without a resolvable county.
pub const NOT_AVAILABLE: &str = "N/A";

/// One row of the primary ZIP table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZipRecord {
    pub zip: String,
    pub county_and_state: String,
}

impl ZipRecord {
    pub fn new(zip: impl Into<String>, county_and_state: impl Into<String>) -> Self {
        Self {
            zip: zip.into(),
            county_and_state: county_and_state.into(),
        }
    }
}

/// One candidate county for a ZIP from the historical crosswalk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrosswalkRecord {
    pub zip: String,
    /// 2-digit state FIPS code
    pub region_code: String,
    /// 3-digit county FIPS code
    pub sub_region_code: String,
    /// Share of the ZIP's residential addresses inside this county
    pub residential_ratio: f64,
    /// Last date this row was authoritative
    pub valid_end_date: NaiveDate,
}

/// Final answer for one requested ZIP
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedZip {
    pub zip: String,
    pub county_and_state: String,
}

impl ResolvedZip {
    pub fn is_resolved(&self) -> bool {
        self.county_and_state != NOT_AVAILABLE
    }
}

impl fmt::Display for ResolvedZip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.zip, self.county_and_state)
    }
}

/// Counters describing how a batch of ZIPs was resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionStats {
    /// Input rows, duplicates included
    pub requested: usize,
    /// Input rows answered by the primary table
    pub primary_hits: usize,
    /// Distinct ZIPs missing from the primary table
    pub gaps: usize,
    /// Distinct gap ZIPs the crosswalk resolved
    pub secondary_filled: usize,
    /// Output rows left as N/A
    pub unresolved: usize,
}

impl fmt::Display for ResolutionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "requested={} primary_hits={} gaps={} secondary_filled={} unresolved={}",
            self.requested, self.primary_hits, self.gaps, self.secondary_filled, self.unresolved
        )
    }
}

/// Left-pad a numeric code with zeros, e.g. `6037` -> `06037`
pub fn zero_pad(code: &str, width: usize) -> String {
    format!("{:0>width$}", code.trim(), width = width)
}
