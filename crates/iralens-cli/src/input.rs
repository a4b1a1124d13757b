//! PitchBook export loading: header detection, domain cleaning, sampling.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use arrow::array::{Array, StringArray};
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::{DataType, Field, Schema};
use iralens_core::Company;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{info, warn};
use url::Url;

pub const NAME_COLUMN: &str = "Companies";
pub const WEBSITE_COLUMN: &str = "Website";
const SAMPLE_SEED: u64 = 42;

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Candidate paths given to every company.
    pub paths: Vec<String>,
    /// Optional numeric column carried through for attrition analysis.
    pub size_column: String,
    pub sample: Option<usize>,
}

/// Index of the line holding the column headers. Exports carry a preamble of
/// report metadata above the table.
fn find_header_line(text: &str) -> usize {
    text.lines()
        .position(|line| {
            (line.contains(NAME_COLUMN) && line.contains(WEBSITE_COLUMN))
                || line.contains("Company ID")
        })
        .unwrap_or_else(|| {
            warn!("no header line detected; using the first line");
            0
        })
}

/// Bare lowercase host for a website string, or `None` when it has none.
pub fn clean_domain(website: &str) -> Option<String> {
    let website = website.trim();
    if website.is_empty() {
        return None;
    }
    let url = if website.starts_with("http://") || website.starts_with("https://") {
        Url::parse(website)
    } else {
        Url::parse(&format!("https://{website}"))
    }
    .ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    (!host.is_empty() && host.contains('.')).then(|| host.to_string())
}

fn parse_size(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| !matches!(c, ',' | ' ')).collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn string_column<'a>(
    batch: &'a arrow::record_batch::RecordBatch,
    name: &str,
) -> Option<&'a StringArray> {
    let idx = batch.schema().index_of(name).ok()?;
    batch.column(idx).as_any().downcast_ref::<StringArray>()
}

fn cell(column: Option<&StringArray>, row: usize) -> Option<&str> {
    let column = column?;
    if column.is_null(row) {
        return None;
    }
    let value = column.value(row).trim();
    (!value.is_empty()).then_some(value)
}

/// Load companies from a PitchBook-style CSV export.
pub fn load_companies(path: &Path, options: &LoadOptions) -> anyhow::Result<Vec<Company>> {
    let raw = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let text = String::from_utf8_lossy(&raw);
    let header_line = find_header_line(&text);
    info!(line = header_line + 1, "found header line");
    let table: String = text
        .lines()
        .skip(header_line)
        .flat_map(|line| [line, "\n"])
        .collect();

    let (inferred, _) = Format::default()
        .with_header(true)
        .infer_schema(Cursor::new(table.as_bytes()), Some(0))
        .context("reading CSV header")?;
    let schema = Schema::new(
        inferred
            .fields()
            .iter()
            .map(|f| Field::new(f.name().trim(), DataType::Utf8, true))
            .collect::<Vec<_>>(),
    );
    for required in [NAME_COLUMN, WEBSITE_COLUMN] {
        if schema.index_of(required).is_err() {
            bail!("input must contain the columns {NAME_COLUMN:?} and {WEBSITE_COLUMN:?}");
        }
    }
    let has_size = schema.index_of(&options.size_column).is_ok();
    if !has_size {
        info!(column = %options.size_column, "size column absent; attrition sizes will be empty");
    }

    let reader = ReaderBuilder::new(Arc::new(schema))
        .with_header(true)
        .with_truncated_rows(true)
        .build(Cursor::new(table.into_bytes()))
        .context("building CSV reader")?;

    let mut companies = Vec::new();
    let mut dropped = 0usize;
    for batch in reader {
        let batch = batch.context("reading CSV rows")?;
        let names = string_column(&batch, NAME_COLUMN);
        let websites = string_column(&batch, WEBSITE_COLUMN);
        let sizes = string_column(&batch, &options.size_column);
        for row in 0..batch.num_rows() {
            let (Some(name), Some(website)) = (cell(names, row), cell(websites, row)) else {
                dropped += 1;
                continue;
            };
            let Some(domain) = clean_domain(website) else {
                dropped += 1;
                continue;
            };
            let mut company =
                Company::new(name, domain, options.paths.clone()).with_website(website);
            if let Some(size) = cell(sizes, row).and_then(parse_size) {
                company = company.with_size(size);
            }
            companies.push(company);
        }
    }
    if dropped > 0 {
        info!(dropped, "rows without a name or usable website were dropped");
    }

    if let Some(n) = options.sample
        && companies.len() > n
    {
        let mut rng = StdRng::seed_from_u64(SAMPLE_SEED);
        companies = companies.choose_multiple(&mut rng, n).cloned().collect();
        info!(sample = n, "using a random sample");
    }

    info!(companies = companies.len(), "loaded companies");
    Ok(companies)
}
