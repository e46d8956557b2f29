use std::collections::HashMap;

use crate::types::ZipRecord;

/// ZIP -> "County, ST" mapping built from the primary dataset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimaryLookup {
    entries: HashMap<String, String>,
}

impl PrimaryLookup {
    /// Build the lookup in one pass over `records`.
    ///
    /// A ZIP seen more than once keeps the value of its last occurrence, in
    /// the order the records are handed in.
    pub fn build<I>(records: I) -> Self
    where
        I: IntoIterator<Item = ZipRecord>,
    {
        let entries = records
            .into_iter()
            .map(|record| (record.zip, record.county_and_state))
            .collect();
        Self { entries }
    }

    pub fn get(&self, zip: &str) -> Option<&str> {
        self.entries.get(zip).map(String::as_str)
    }

    pub fn contains(&self, zip: &str) -> bool {
        self.entries.contains_key(zip)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<ZipRecord> for PrimaryLookup {
    fn from_iter<T: IntoIterator<Item = ZipRecord>>(iter: T) -> Self {
        Self::build(iter)
    }
}
