use chrono::NaiveDate;
use thiserror::Error;
use tracing::warn;

use crate::models::{ParsedLine, TransactionKind};

/// Start of the literal header line some exports carry on their first row.
const HEADER_SENTINEL: &str = "Date;C.;Num client;Client;";

/// Minimum column count of the fixed-position export layout.
const MIN_COLUMNS: usize = 15;

// Column indexes within one export line.
const COL_DATE: usize = 0;
const COL_CLIENT_ID: usize = 2;
const COL_CLIENT: usize = 3;
const COL_REFERENCE: usize = 4;
const COL_FAMILY: usize = 5;
const COL_QUANTITY: usize = 6;
const COL_TOTAL_TTC: usize = 8;
const COL_SELLER_REF: usize = 10;
const COL_TOTAL_DOCUMENT: usize = 12;
const COL_PAIR: usize = 13;
const COL_TYPE: usize = 14;

/// Failure scoped to a single line; the batch continues without it.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("expected at least {MIN_COLUMNS} columns, got {0}")]
    ColumnCount(usize),

    #[error("unparsable date {0:?}")]
    BadDate(String),

    #[error("unparsable number {value:?} in column {column}")]
    BadNumber { column: usize, value: String },

    #[error("malformed record: {0}")]
    Malformed(#[from] csv::Error),
}

/// Parses a decimal field using a comma as the decimal separator.
fn parse_decimal(column: usize, raw: &str) -> Result<f64, ParseError> {
    raw.trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| ParseError::BadNumber { column, value: raw.to_string() })
}

fn parse_int(column: usize, raw: &str) -> Result<i64, ParseError> {
    raw.trim()
        .parse()
        .map_err(|_| ParseError::BadNumber { column, value: raw.to_string() })
}

/// Empty optional numeric fields map to None, not zero.
fn parse_opt_int(column: usize, raw: &str) -> Result<Option<i64>, ParseError> {
    if raw.trim().is_empty() {
        Ok(None)
    } else {
        parse_int(column, raw).map(Some)
    }
}

fn opt_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn strip_bom(line: &str) -> &str {
    line.strip_prefix('\u{feff}').unwrap_or(line)
}

pub fn is_header(line: &str) -> bool {
    line.contains(HEADER_SENTINEL)
}

/// Parses and classifies one export line.
///
/// Returns Ok(None) for blank lines and for lines whose transaction-type
/// label matches no known kind; those are skipped, not errors. Numeric
/// columns are only parsed once the line is classified, so an unrecognized
/// line never fails on its amounts.
pub fn parse_line(raw: &str) -> Result<Option<ParsedLine>, ParseError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_reader(raw.as_bytes());
    let record = match reader.records().next() {
        Some(record) => record?,
        None => return Ok(None),
    };

    if record.len() < MIN_COLUMNS {
        return Err(ParseError::ColumnCount(record.len()));
    }

    let label = record[COL_TYPE].trim();
    let kind = TransactionKind::classify(label);
    if kind == TransactionKind::Unrecognized {
        warn!(label, "skipping line with unrecognized transaction type");
        return Ok(None);
    }

    let date = NaiveDate::parse_from_str(record[COL_DATE].trim(), "%d/%m/%Y")
        .map_err(|_| ParseError::BadDate(record[COL_DATE].to_string()))?;

    Ok(Some(ParsedLine {
        date,
        kind,
        client_id: record[COL_CLIENT_ID].trim().to_string(),
        client: record[COL_CLIENT].trim().to_string(),
        reference: record[COL_REFERENCE].trim().to_string(),
        family: opt_text(&record[COL_FAMILY]),
        quantity: parse_int(COL_QUANTITY, &record[COL_QUANTITY])?,
        total_ttc: parse_decimal(COL_TOTAL_TTC, &record[COL_TOTAL_TTC])?,
        total_document: parse_decimal(COL_TOTAL_DOCUMENT, &record[COL_TOTAL_DOCUMENT])?,
        pair: parse_opt_int(COL_PAIR, &record[COL_PAIR])?,
        status: label.to_lowercase(),
        seller_ref: record[COL_SELLER_REF].trim().to_string(),
    }))
}

/// Parses a whole batch with best-effort semantics: a bad line is dropped
/// with a diagnostic, never fatal. Strips the BOM and discards the header
/// line when the batch starts with one.
pub fn parse_batch<'a, I>(lines: I) -> (Vec<ParsedLine>, usize)
where
    I: IntoIterator<Item = &'a str>,
{
    let mut parsed = Vec::new();
    let mut skipped = 0usize;

    for (idx, raw) in lines.into_iter().enumerate() {
        let raw = if idx == 0 { strip_bom(raw) } else { raw };
        if idx == 0 && is_header(raw) {
            continue;
        }
        match parse_line(raw) {
            Ok(Some(line)) => parsed.push(line),
            Ok(None) => {
                if !raw.trim().is_empty() {
                    skipped += 1;
                }
            }
            Err(e) => {
                warn!(line = idx + 1, error = %e, "skipping malformed line");
                skipped += 1;
            }
        }
    }

    (parsed, skipped)
}
