//! Loaders that turn the raw extracts into the typed [`Dataset`]. All
//! numeric coercion happens here; the aggregation modules never re-parse
//! strings.

use crate::error::Result;
use crate::schema::{Dataset, FundingLedgerEntry};
use log::info;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Loads the full JSON snapshot from disk.
pub fn load_dataset<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let file = File::open(path.as_ref())?;
    let dataset: Dataset = serde_json::from_reader(BufReader::new(file))?;
    info!(
        "loaded dataset: {} donations, {} payments, {} cost-share rows, {} people, {} ledger rows",
        dataset.donor_history.len(),
        dataset.vendor_history.len(),
        dataset.cost_share_history.len(),
        dataset.master_database.len(),
        dataset.cost_share_funding.len()
    );
    Ok(dataset)
}

pub fn dataset_from_str(json: &str) -> Result<Dataset> {
    Ok(serde_json::from_str(json)?)
}

/// Coerces spreadsheet currency text to a number: `$1,234.56` parses as
/// written, `($1,234.56)` is negative, blanks and garbage are 0.0.
fn parse_currency(value: &str) -> f64 {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    let (negated, inner) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };
    let cleaned: String = inner.chars().filter(|c| *c != '$' && *c != ',').collect();
    let parsed = cleaned.trim().parse::<f64>().unwrap_or(0.0);
    if negated {
        -parsed
    } else {
        parsed
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[derive(Debug, Deserialize)]
struct RawLedgerRow {
    #[serde(rename = "BMP")]
    bmp: Option<String>,
    #[serde(rename = "BMP Type")]
    bmp_type: Option<String>,
    #[serde(rename = "Fund Name")]
    fund_name: Option<String>,
    #[serde(rename = "Amount Allocated")]
    amount_allocated: Option<String>,
    #[serde(rename = "Amount Used")]
    amount_used: Option<String>,
    #[serde(rename = "Amount Available")]
    amount_available: Option<String>,
    #[serde(rename = "Segment")]
    segment: Option<String>,
}

/// Reads the funding-ledger CSV. Summary rows (any BMP containing
/// "total", case-insensitively) are dropped, as are rows with no BMP.
pub fn funding_ledger_from_reader<R: Read>(reader: R) -> Result<Vec<FundingLedgerEntry>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut entries = Vec::new();
    for row in csv_reader.deserialize() {
        let raw: RawLedgerRow = row?;
        let Some(bmp) = normalize(raw.bmp) else { continue };
        if bmp.to_lowercase().contains("total") {
            continue;
        }

        entries.push(FundingLedgerEntry {
            bmp: Some(bmp),
            bmp_type: normalize(raw.bmp_type),
            fund_name: normalize(raw.fund_name),
            amount_allocated: parse_currency(raw.amount_allocated.as_deref().unwrap_or("")),
            amount_used: parse_currency(raw.amount_used.as_deref().unwrap_or("")),
            amount_available: parse_currency(raw.amount_available.as_deref().unwrap_or("")),
            segment: normalize(raw.segment),
        });
    }
    Ok(entries)
}

pub fn load_funding_ledger<P: AsRef<Path>>(path: P) -> Result<Vec<FundingLedgerEntry>> {
    let file = File::open(path.as_ref())?;
    let entries = funding_ledger_from_reader(BufReader::new(file))?;
    info!("loaded funding ledger: {} budget lines", entries.len());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_currency() {
        assert_eq!(parse_currency("$1,234.56"), 1_234.56);
        assert_eq!(parse_currency("($1,234.56)"), -1_234.56);
        assert_eq!(parse_currency("  500 "), 500.0);
        assert_eq!(parse_currency(""), 0.0);
        assert_eq!(parse_currency("n/a"), 0.0);
    }

    #[test]
    fn test_funding_ledger_skips_total_rows() {
        let csv = "\
BMP,BMP Type,Fund Name,Amount Allocated,Amount Used,Amount Available,Segment
Cover Crop,Cropland,319,\"$10,000.00\",\"$4,000.00\",\"$6,000.00\",1
Grand Total,,,\"$10,000.00\",\"$4,000.00\",\"$6,000.00\",
,,319,$5.00,$0.00,$5.00,2
No-Till,Cropland,Local Match,\"($250.00)\",$0.00,\"($250.00)\",2
";
        let entries = funding_ledger_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(first.bmp.as_deref(), Some("Cover Crop"));
        assert_eq!(first.amount_allocated, 10_000.0);
        assert_eq!(first.segment.as_deref(), Some("1"));

        let second = &entries[1];
        assert_eq!(second.amount_allocated, -250.0);
    }

    #[test]
    fn test_dataset_from_str_defaults_missing_arrays() {
        let dataset = dataset_from_str(r#"{"donor_history":[{"gift_amount":25.0}]}"#).unwrap();
        assert_eq!(dataset.donor_history.len(), 1);
        assert!(dataset.vendor_history.is_empty());
        assert!(dataset.cost_share_funding.is_empty());
    }
}
