//! Client for the historical ZIP -> county crosswalk hosted on Redivis.
//!
//! Flow per batch of ZIPs:
//! 1. POST a SQL query to `/queries`
//! 2. Poll `/queries/{id}` until it reports `completed`
//! 3. GET `/queries/{id}/rows` and convert each row into a CrosswalkRecord
//!
//! Rows carry a combined 5-digit county FIPS code which is split into its
//! state and county parts here, so the resolver only ever sees normalized
//! records.

use std::fmt;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use futures::{StreamExt, TryStreamExt, stream};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wreq::{Client, header};

use crate::fips::split_fips;
use crate::types::{CrosswalkRecord, zero_pad};

pub const DEFAULT_API_BASE: &str = "https://redivis.com/api/v1";
const POLL_INTERVAL: Duration = Duration::from_millis(500);
const COLUMNS: [&str; 4] = ["ZIP", "COUNTY", "RES_RATIO", "VALID_END_DATE"];

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueryResource {
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default, rename = "errorMessage")]
    error_message: Option<String>,
}

/// Redivis REST client bound to one crosswalk table
#[derive(Clone)]
pub struct RedivisClient {
    http: Client,
    base_url: String,
    token: String,
    table: String,
    query_timeout: Duration,
    batch_size: usize,
    concurrency: usize,
}

impl fmt::Debug for RedivisClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedivisClient")
            .field("base_url", &self.base_url)
            .field("table", &self.table)
            .field("query_timeout", &self.query_timeout)
            .field("batch_size", &self.batch_size)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl RedivisClient {
    pub fn new(http: Client, token: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            http,
            base_url: DEFAULT_API_BASE.to_string(),
            token: token.into(),
            table: table.into(),
            query_timeout: Duration::from_secs(120),
            batch_size: 500,
            concurrency: 4,
        }
    }

    /// Point the client at another API root (no trailing slash needed)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// ZIPs per query and queries in flight
    pub fn with_batching(mut self, batch_size: usize, concurrency: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// SQL for one batch, or `None` when no ZIP is numeric.
    ///
    /// The table stores ZIPs as integers, so only all-digit tokens can match;
    /// the rest are dropped from the `IN` list.
    pub fn build_query<S: AsRef<str>>(&self, zips: &[S]) -> Option<String> {
        let ids: Vec<String> = zips
            .iter()
            .map(|zip| zip.as_ref())
            .filter(|zip| !zip.is_empty() && zip.bytes().all(|b| b.is_ascii_digit()))
            .filter_map(|zip| zip.parse::<u64>().ok())
            .map(|id| id.to_string())
            .collect();
        if ids.is_empty() {
            return None;
        }
        Some(format!(
            "SELECT {} FROM `{}` WHERE ZIP IN ({}) ORDER BY ZIP, VALID_END_DATE DESC",
            COLUMNS.join(", "),
            self.table,
            ids.join(", ")
        ))
    }

    /// Fetch every crosswalk row for `zips`, querying in concurrent batches
    pub async fn fetch_crosswalk(&self, zips: &[String]) -> Result<Vec<CrosswalkRecord>> {
        // Futures are collected up front (they stay idle until polled) so the
        // closure is not held across awaits, which breaks `Send` inference.
        let batches: Vec<Vec<CrosswalkRecord>> = stream::iter(
            zips.chunks(self.batch_size)
                .map(|chunk| self.fetch_batch(chunk))
                .collect::<Vec<_>>(),
        )
        .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;
        Ok(batches.into_iter().flatten().collect())
    }

    async fn fetch_batch(&self, zips: &[String]) -> Result<Vec<CrosswalkRecord>> {
        let Some(sql) = self.build_query(zips) else {
            return Ok(Vec::new());
        };
        tracing::debug!(zips = zips.len(), table = %self.table, "submitting crosswalk query");

        let query = self.submit_query(&sql).await?;
        let query = self.wait_for_query(query).await?;
        let rows = self.fetch_rows(&query.id).await?;

        rows.iter()
            .enumerate()
            .map(|(idx, row)| {
                row_to_record(row).with_context(|| format!("Malformed crosswalk row {}", idx + 1))
            })
            .collect()
    }

    async fn submit_query(&self, sql: &str) -> Result<QueryResource> {
        let body = serde_json::to_string(&QueryRequest { query: sql })?;
        let response = self
            .http
            .post(format!("{}/queries", self.base_url))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .context("Failed to submit Redivis query")?;
        Self::read_json(response, "submit query").await
    }

    async fn wait_for_query(&self, mut query: QueryResource) -> Result<QueryResource> {
        let started = Instant::now();
        loop {
            match query.status.as_str() {
                "completed" => return Ok(query),
                "failed" | "cancelled" => anyhow::bail!(
                    "Redivis query {} {}: {}",
                    query.id,
                    query.status,
                    query.error_message.as_deref().unwrap_or("no error message")
                ),
                _ => {}
            }
            if started.elapsed() >= self.query_timeout {
                anyhow::bail!(
                    "Timed out after {:?} waiting for Redivis query {} (status: {})",
                    self.query_timeout,
                    query.id,
                    query.status
                );
            }

            tokio::time::sleep(POLL_INTERVAL).await;
            let response = self
                .http
                .get(format!("{}/queries/{}", self.base_url, query.id))
                .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
                .send()
                .await
                .context("Failed to poll Redivis query")?;
            query = Self::read_json(response, "poll query").await?;
        }
    }

    async fn fetch_rows(&self, query_id: &str) -> Result<Vec<Value>> {
        let response = self
            .http
            .get(format!("{}/queries/{}/rows?format=json", self.base_url, query_id))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .send()
            .await
            .context("Failed to fetch Redivis query rows")?;
        Self::read_json(response, "fetch rows").await
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(
        response: wreq::Response,
        action: &str,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;

        if status.as_u16() == 401 || status.as_u16() == 403 {
            anyhow::bail!("Redivis rejected the API token ({}): {}", status, body);
        }
        if !status.is_success() {
            anyhow::bail!("Redivis {} failed: {} {}", action, status, body);
        }

        serde_json::from_str(&body)
            .map_err(|e| anyhow::anyhow!("Failed to parse Redivis {} response: {}", action, e))
    }
}

fn column(row: &Value, idx: usize) -> Option<&Value> {
    match row {
        Value::Array(values) => values.get(idx),
        Value::Object(map) => map.get(COLUMNS[idx]),
        _ => None,
    }
}

fn column_text(row: &Value, idx: usize) -> Result<String> {
    column(row, idx)
        .and_then(value_as_string)
        .with_context(|| format!("missing {}", COLUMNS[idx]))
}

/// Convert one result row (positional array or keyed object) into a record
fn row_to_record(row: &Value) -> Result<CrosswalkRecord> {
    let zip = column_text(row, 0)?;
    let county = column_text(row, 1)?;
    let ratio = column(row, 2)
        .and_then(value_as_f64)
        .context("missing RES_RATIO")?;
    let valid_end_date = parse_date(&column_text(row, 3)?)?;

    Ok(crosswalk_record(&zip, &county, ratio, valid_end_date))
}

/// Normalize raw crosswalk fields: pad the ZIP and split the county FIPS
pub fn crosswalk_record(
    zip: &str,
    county_fips: &str,
    residential_ratio: f64,
    valid_end_date: NaiveDate,
) -> CrosswalkRecord {
    let (region_code, sub_region_code) = split_fips(county_fips);
    CrosswalkRecord {
        zip: zero_pad(zip, 5),
        region_code,
        sub_region_code,
        residential_ratio,
        valid_end_date,
    }
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => n
            .as_u64()
            .map(|v| v.to_string())
            .or_else(|| n.as_f64().map(|v| format!("{}", v.trunc()))),
        _ => None,
    }
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part
fn parse_date(raw: &str) -> Result<NaiveDate> {
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .with_context(|| format!("invalid VALID_END_DATE '{}'", raw))
}
