//! Where the primary and secondary datasets come from.
//!
//! Sources only fetch and parse. Every error they raise is an explicit
//! fetch, auth or parse failure; deciding what to do about it is left to
//! the pipeline.

use std::collections::HashSet;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use wreq::Client;

use crate::redivis::{RedivisClient, crosswalk_record};
use crate::types::{CrosswalkRecord, ZipRecord, zero_pad};

/// Row of the public `geo-data.csv`; other columns are ignored
#[derive(Debug, Deserialize)]
struct GeoRow {
    zipcode: String,
    #[serde(default)]
    county: String,
    #[serde(default)]
    state_abbr: String,
}

/// Row of a local crosswalk CSV
#[derive(Debug, Deserialize)]
struct CrosswalkRow {
    #[serde(rename = "ZIP")]
    zip: String,
    #[serde(rename = "COUNTY")]
    county: String,
    #[serde(rename = "RES_RATIO")]
    res_ratio: f64,
    #[serde(rename = "VALID_END_DATE")]
    valid_end_date: NaiveDate,
}

/// Parse the primary `zipcode,county,state_abbr` CSV.
///
/// ZIPs are zero-padded to five digits and rows lacking a county or state
/// are skipped.
pub fn parse_primary_csv<R: Read>(reader: R) -> Result<Vec<ZipRecord>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (idx, row) in csv_reader.deserialize::<GeoRow>().enumerate() {
        let row = row.with_context(|| format!("Failed to parse primary row {}", idx + 1))?;
        let county = row.county.trim();
        let state = row.state_abbr.trim();
        if county.is_empty() || state.is_empty() {
            skipped += 1;
            continue;
        }
        records.push(ZipRecord {
            zip: zero_pad(&row.zipcode, 5),
            county_and_state: format!("{} County, {}", county, state),
        });
    }

    if skipped > 0 {
        tracing::debug!(skipped, "primary rows without county or state");
    }
    Ok(records)
}

/// Parse a local `ZIP,COUNTY,RES_RATIO,VALID_END_DATE` crosswalk CSV.
/// When `wanted` is given (zero-padded ZIPs), rows for other ZIPs are dropped.
pub fn parse_crosswalk_csv<R: Read>(
    reader: R,
    wanted: Option<&HashSet<String>>,
) -> Result<Vec<CrosswalkRecord>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();

    for (idx, row) in csv_reader.deserialize::<CrosswalkRow>().enumerate() {
        let row = row.with_context(|| format!("Failed to parse crosswalk row {}", idx + 1))?;
        let record = crosswalk_record(&row.zip, &row.county, row.res_ratio, row.valid_end_date);
        if wanted.is_none_or(|zips| zips.contains(&record.zip)) {
            records.push(record);
        }
    }
    Ok(records)
}

/// Origin of the primary ZIP table
#[derive(Debug, Clone)]
pub enum PrimarySource {
    Url(String),
    File(PathBuf),
    InMemory(Arc<Vec<ZipRecord>>),
}

impl PrimarySource {
    /// Identity used for caching; in-memory tables are never cached
    pub fn cache_key(&self) -> Option<String> {
        match self {
            Self::Url(url) => Some(format!("url:{}", url)),
            Self::File(path) => Some(format!("file:{}", path.display())),
            Self::InMemory(_) => None,
        }
    }

    /// Fetch and parse the full table
    pub async fn load(&self, http: &Client) -> Result<Vec<ZipRecord>> {
        match self {
            Self::Url(url) => {
                let response = http
                    .get(url.as_str())
                    .send()
                    .await
                    .with_context(|| format!("Failed to fetch ZIP data from {}", url))?;

                let status = response.status();
                let body = response
                    .text()
                    .await
                    .context("Failed to read ZIP data body")?;

                if !status.is_success() {
                    anyhow::bail!("ZIP data request failed: {} {}", status, url);
                }
                tracing::debug!(bytes = body.len(), "primary ZIP data fetched");
                parse_primary_csv(body.as_bytes())
            }
            Self::File(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("Failed to read ZIP data file: {}", path.display()))?;
                parse_primary_csv(bytes.as_slice())
            }
            Self::InMemory(records) => Ok(records.as_ref().clone()),
        }
    }
}

impl fmt::Display for PrimarySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{}", url),
            Self::File(path) => write!(f, "{}", path.display()),
            Self::InMemory(records) => write!(f, "in-memory table ({} rows)", records.len()),
        }
    }
}

/// Origin of the historical crosswalk used to fill gaps
#[derive(Debug, Clone)]
pub enum SecondarySource {
    Redivis(RedivisClient),
    File(PathBuf),
    InMemory(Arc<Vec<CrosswalkRecord>>),
    Disabled,
}

impl SecondarySource {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    /// Candidate rows for `zips`. Rows for other ZIPs may be dropped.
    pub async fn fetch(&self, zips: &[String]) -> Result<Vec<CrosswalkRecord>> {
        if zips.is_empty() {
            return Ok(Vec::new());
        }
        match self {
            Self::Redivis(client) => client.fetch_crosswalk(zips).await,
            Self::File(path) => {
                let bytes = tokio::fs::read(path).await.with_context(|| {
                    format!("Failed to read crosswalk file: {}", path.display())
                })?;
                parse_crosswalk_csv(bytes.as_slice(), Some(&padded_set(zips)))
            }
            Self::InMemory(records) => {
                let wanted = padded_set(zips);
                Ok(records
                    .iter()
                    .filter(|r| wanted.contains(&zero_pad(&r.zip, 5)))
                    .cloned()
                    .collect())
            }
            Self::Disabled => Ok(Vec::new()),
        }
    }
}

/// Requested tokens in the 5-digit form crosswalk rows are stored under
fn padded_set(zips: &[String]) -> HashSet<String> {
    zips.iter().map(|zip| zero_pad(zip, 5)).collect()
}

impl fmt::Display for SecondarySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redivis(client) => write!(f, "Redivis ({})", client.table()),
            Self::File(path) => write!(f, "{}", path.display()),
            Self::InMemory(records) => write!(f, "in-memory crosswalk ({} rows)", records.len()),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}
