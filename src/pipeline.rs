use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use wreq::Client;

use crate::cache::DatasetCache;
use crate::config::ResolverConfig;
use crate::fips::CountyLookupTable;
use crate::gaps::find_gaps;
use crate::merge::{merge, summarize};
use crate::primary::PrimaryLookup;
use crate::redivis::RedivisClient;
use crate::resolver::resolve_gaps;
use crate::sources::{PrimarySource, SecondarySource};
use crate::types::{ResolutionStats, ResolvedZip};

/// How many still-missing ZIPs are listed in the log line
const MISSING_PREVIEW: usize = 10;

/// Output of one resolution run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub rows: Vec<ResolvedZip>,
    pub stats: ResolutionStats,
}

/// Resolves ZIP lists to counties: primary table first, crosswalk for gaps.
///
/// Cloning is cheap and clones share the primary dataset cache.
#[derive(Clone)]
pub struct CountyResolver {
    primary: PrimarySource,
    secondary: SecondarySource,
    lookup: Arc<CountyLookupTable>,
    http: Client,
    cache: DatasetCache,
}

impl CountyResolver {
    /// Build a resolver whose sources are chosen by `config`.
    ///
    /// Local files take precedence over remote sources. Without a crosswalk
    /// file or Redivis token, gaps are left unresolved.
    pub fn new(config: ResolverConfig) -> Result<Self> {
        let http = build_http_client(&config)?;

        let primary = match &config.primary_file {
            Some(path) => PrimarySource::File(path.clone()),
            None => PrimarySource::Url(config.primary_url.clone()),
        };

        let secondary = match (&config.crosswalk_file, &config.redivis_token) {
            (Some(path), _) => SecondarySource::File(path.clone()),
            (None, Some(token)) => SecondarySource::Redivis(
                RedivisClient::new(http.clone(), token.clone(), config.redivis_table.clone())
                    .with_base_url(config.redivis_api_url.clone())
                    .with_query_timeout(config.query_timeout)
                    .with_batching(config.secondary_batch_size, config.secondary_concurrency),
            ),
            (None, None) => SecondarySource::Disabled,
        };

        Ok(Self::assemble(&config, http, primary, secondary))
    }

    /// Build a resolver over explicit sources
    pub fn with_sources(
        config: &ResolverConfig,
        primary: PrimarySource,
        secondary: SecondarySource,
    ) -> Result<Self> {
        let http = build_http_client(config)?;
        Ok(Self::assemble(config, http, primary, secondary))
    }

    fn assemble(
        config: &ResolverConfig,
        http: Client,
        primary: PrimarySource,
        secondary: SecondarySource,
    ) -> Self {
        Self {
            primary,
            secondary,
            lookup: Arc::new(CountyLookupTable::builtin()),
            http,
            cache: DatasetCache::new(config.cache_ttl),
        }
    }

    /// Replace the FIPS translation table
    pub fn with_lookup_table(mut self, lookup: CountyLookupTable) -> Self {
        self.lookup = Arc::new(lookup);
        self
    }

    pub fn primary_source(&self) -> &PrimarySource {
        &self.primary
    }

    pub fn secondary_source(&self) -> &SecondarySource {
        &self.secondary
    }

    /// Primary lookup for this run, served from cache while fresh
    pub async fn primary_lookup(&self) -> Result<Arc<PrimaryLookup>> {
        let Some(key) = self.primary.cache_key() else {
            let records = self.primary.load(&self.http).await?;
            return Ok(Arc::new(PrimaryLookup::build(records)));
        };

        self.cache
            .get_or_refresh(&key, || async {
                tracing::info!("Fetching ZIP data from {}...", self.primary);
                let records = self.primary.load(&self.http).await?;
                let lookup = PrimaryLookup::build(records);
                tracing::info!("Loaded {} ZIP codes from primary dataset", lookup.len());
                Ok(lookup)
            })
            .await
            .context("Failed to load primary ZIP dataset")
    }

    /// Resolve every requested ZIP, one output row per input entry
    pub async fn resolve<S: AsRef<str>>(&self, requested: &[S]) -> Result<Resolution> {
        let primary = self.primary_lookup().await?;
        let gaps = find_gaps(requested, &primary);

        let secondary = if gaps.is_empty() {
            Default::default()
        } else if !self.secondary.is_enabled() {
            tracing::info!(
                "Found {} missing ZIPs (secondary source not configured).",
                gaps.len()
            );
            Default::default()
        } else {
            tracing::info!(
                "Found {} missing ZIPs. Querying {}...",
                gaps.len(),
                self.secondary
            );
            let candidates = match self.secondary.fetch(&gaps).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    tracing::warn!("Failed to fetch from {}: {:#}", self.secondary, e);
                    Vec::new()
                }
            };
            let resolved = resolve_gaps(&gaps, &candidates, &self.lookup);
            if !resolved.is_empty() {
                tracing::info!("{} filled {} missing ZIPs.", self.secondary, resolved.len());
            }
            resolved
        };

        let still_missing: Vec<&str> = gaps
            .iter()
            .map(String::as_str)
            .filter(|zip| !secondary.contains_key(*zip))
            .collect();
        if !still_missing.is_empty() && self.secondary.is_enabled() {
            tracing::warn!(
                "Still missing {} ZIPs: {}{}",
                still_missing.len(),
                still_missing
                    .iter()
                    .take(MISSING_PREVIEW)
                    .copied()
                    .collect::<Vec<_>>()
                    .join(", "),
                if still_missing.len() > MISSING_PREVIEW { "..." } else { "" }
            );
        }

        let rows = merge(requested, &primary, &secondary);
        let stats = summarize(&rows, &primary, gaps.len(), secondary.len());
        tracing::debug!(%stats, "resolution complete");

        Ok(Resolution { rows, stats })
    }
}

fn build_http_client(config: &ResolverConfig) -> Result<Client> {
    Client::builder()
        .gzip(true)
        .timeout(config.fetch_timeout)
        .build()
        .context("Failed to build HTTP client")
}
