use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zip2county::input::{load_zip_list, write_output};
use zip2county::{CountyResolver, ResolverConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <zip_file> [output_csv]", args[0]);
        eprintln!("  zip_file: ZIP codes separated by commas or whitespace");
        eprintln!("  output_csv: destination file (default: stdout)");
        eprintln!();
        eprintln!("Environment:");
        eprintln!("  REDIVIS_API_TOKEN          enables the historical crosswalk for missing ZIPs");
        eprintln!("  ZIP2COUNTY_PRIMARY_FILE    local geo-data.csv instead of downloading it");
        eprintln!("  ZIP2COUNTY_CROSSWALK_FILE  local crosswalk CSV instead of Redivis");
        std::process::exit(1);
    }

    // Logs go to stderr so stdout stays clean CSV
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zip2county=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let zip_file = PathBuf::from(&args[1]);
    let output_path = args.get(2).map(PathBuf::from);

    let zips = load_zip_list(&zip_file)?;
    if zips.is_empty() {
        tracing::warn!("No ZIP codes found in {}", zip_file.display());
    }

    let resolver = CountyResolver::new(ResolverConfig::from_env())?;
    let resolution = resolver
        .resolve(&zips)
        .await
        .context("Failed to resolve ZIP codes")?;

    tracing::info!("{}", resolution.stats);
    write_output(&resolution.rows, output_path.as_deref())?;

    Ok(())
}
