use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::redivis::DEFAULT_API_BASE;

/// Public ZIP -> county table used when no local copy is configured
pub const DEFAULT_PRIMARY_URL: &str =
    "https://raw.githubusercontent.com/scpike/us-state-county-zip/refs/heads/master/geo-data.csv";

/// Historical ZIP -> county crosswalk on Redivis
pub const DEFAULT_REDIVIS_TABLE: &str =
    "StanfordPHS.us_zip_codes_to_county:b36a.us_zip_codes_to_county:1ph7";

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_SECONDARY_BATCH_SIZE: usize = 500;
const DEFAULT_SECONDARY_CONCURRENCY: usize = 4;

/// Configuration for CountyResolver
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// URL of the primary `geo-data.csv`
    pub primary_url: String,
    /// Local primary CSV (overrides `primary_url`)
    pub primary_file: Option<PathBuf>,
    /// Bearer token for the Redivis API; secondary lookups are off without it
    pub redivis_token: Option<String>,
    /// Fully qualified Redivis table reference
    pub redivis_table: String,
    /// Root of the Redivis REST API
    pub redivis_api_url: String,
    /// Local crosswalk CSV (overrides Redivis)
    pub crosswalk_file: Option<PathBuf>,
    /// Per-request HTTP timeout
    pub fetch_timeout: Duration,
    /// Upper bound on waiting for a Redivis query to finish
    pub query_timeout: Duration,
    /// How long a fetched primary table may be reused
    pub cache_ttl: Duration,
    /// ZIPs per secondary query
    pub secondary_batch_size: usize,
    /// Secondary queries in flight at once
    pub secondary_concurrency: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            primary_url: DEFAULT_PRIMARY_URL.to_string(),
            primary_file: None,
            redivis_token: None,
            redivis_table: DEFAULT_REDIVIS_TABLE.to_string(),
            redivis_api_url: DEFAULT_API_BASE.to_string(),
            crosswalk_file: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            cache_ttl: DEFAULT_CACHE_TTL,
            secondary_batch_size: DEFAULT_SECONDARY_BATCH_SIZE,
            secondary_concurrency: DEFAULT_SECONDARY_CONCURRENCY,
        }
    }
}

impl ResolverConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    /// Empty values count as unset; unparseable numbers fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let secs = |key: &str, default: Duration| {
            get(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };
        let defaults = Self::default();

        Self {
            primary_url: get("ZIP2COUNTY_PRIMARY_URL").unwrap_or(defaults.primary_url),
            primary_file: get("ZIP2COUNTY_PRIMARY_FILE").map(PathBuf::from),
            redivis_token: get("REDIVIS_API_TOKEN"),
            redivis_table: get("ZIP2COUNTY_REDIVIS_TABLE").unwrap_or(defaults.redivis_table),
            redivis_api_url: get("ZIP2COUNTY_REDIVIS_API_URL").unwrap_or(defaults.redivis_api_url),
            crosswalk_file: get("ZIP2COUNTY_CROSSWALK_FILE").map(PathBuf::from),
            fetch_timeout: secs("ZIP2COUNTY_FETCH_TIMEOUT_SECS", defaults.fetch_timeout),
            query_timeout: secs("ZIP2COUNTY_QUERY_TIMEOUT_SECS", defaults.query_timeout),
            cache_ttl: secs("ZIP2COUNTY_CACHE_TTL_SECS", defaults.cache_ttl),
            secondary_batch_size: defaults.secondary_batch_size,
            secondary_concurrency: defaults.secondary_concurrency,
        }
    }
}
