//! Reading the requested ZIP list and writing the two-column CSV result.

use std::io::{self, Write};
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::types::ResolvedZip;

/// Header of the output CSV
pub const OUTPUT_HEADER: [&str; 2] = ["zip", "county_and_state"];

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,\s]+").expect("separator pattern is valid"));

/// Split a ZIP list on commas and whitespace. Tokens are kept verbatim.
pub fn parse_zip_list(content: &str) -> Vec<String> {
    SEPARATORS
        .split(content)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read and split a ZIP list file
pub fn load_zip_list(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read ZIP list: {}", path.display()))?;
    Ok(parse_zip_list(&content))
}

/// Write `zip,county_and_state` rows to any writer
pub fn write_csv<W: Write>(rows: &[ResolvedZip], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(OUTPUT_HEADER)?;
    for row in rows {
        csv_writer.write_record([row.zip.as_str(), row.county_and_state.as_str()])?;
    }
    csv_writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Write rows to `path`, or stdout when no path is given
pub fn write_output(rows: &[ResolvedZip], path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            write_csv(rows, file)
        }
        None => write_csv(rows, io::stdout().lock()),
    }
}
