use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::info;

use crate::error::{ComptoirError, Result};
use crate::models::{InvoiceLine, ParsedLine, QuotationLine};
use crate::parser;
use crate::reconciler;
use crate::sellers::SellerResolver;

/// Explicit pipeline configuration; no ambient globals.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Rows buffered per kind before a bulk flush.
    pub batch_size: usize,
    /// Product families eligible for quotation header derivation.
    pub reconcile_families: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            reconcile_families: vec!["VER".to_string()],
        }
    }
}

/// Fixed-capacity buffer that hands back a full chunk on overflow.
pub struct Batch<T> {
    rows: Vec<T>,
    capacity: usize,
}

impl<T> Batch<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            rows: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Buffers one row; returns the accumulated chunk once the threshold is
    /// reached, leaving the buffer empty.
    pub fn push(&mut self, row: T) -> Option<Vec<T>> {
        self.rows.push(row);
        if self.rows.len() >= self.capacity {
            Some(std::mem::take(&mut self.rows))
        } else {
            None
        }
    }

    /// Drains whatever partial chunk remains.
    pub fn finish(self) -> Option<Vec<T>> {
        if self.rows.is_empty() {
            None
        } else {
            Some(self.rows)
        }
    }
}

#[derive(Debug)]
pub struct IngestSummary {
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
    pub invoice_lines: usize,
    pub quotation_lines: usize,
    pub skipped_lines: usize,
    pub sellers_created: usize,
    pub headers_created: usize,
    pub headers_updated: usize,
    pub invoices_rebuilt: usize,
}

/// Runs the full ingestion pipeline on one batch of raw export lines.
///
/// Everything after parsing happens inside a single transaction: the
/// date-range delete, all line inserts, and the reconciliation upserts either
/// all commit or all roll back. Per-line parse failures are dropped during
/// the parse phase and never abort the batch.
pub fn process_batch<'a, I>(conn: &mut Connection, config: &IngestConfig, lines: I) -> Result<IngestSummary>
where
    I: IntoIterator<Item = &'a str>,
{
    let (parsed, skipped_lines) = parser::parse_batch(lines);

    // Deletion must never run against an undefined range.
    let min_date = parsed.iter().map(|l| l.date).min().ok_or(ComptoirError::NoValidDates)?;
    let max_date = parsed.iter().map(|l| l.date).max().ok_or(ComptoirError::NoValidDates)?;
    let start = min_date.format("%Y-%m-%d").to_string();
    let end = max_date.format("%Y-%m-%d").to_string();
    info!(%start, %end, lines = parsed.len(), skipped_lines, "computed batch date range");

    let tx = conn.transaction()?;

    replace_range(&tx, &start, &end)?;

    let mut resolver = SellerResolver::new();
    let mut invoice_batch = Batch::new(config.batch_size);
    let mut quotation_batch = Batch::new(config.batch_size);
    let mut invoice_lines = 0usize;
    let mut quotation_lines = 0usize;

    for line in &parsed {
        // The line row carries a direct reference to the seller, so the
        // seller must exist before the row is buffered.
        resolver.ensure(&tx, &line.seller_ref)?;

        if line.kind.is_invoice_like() {
            invoice_lines += 1;
            if let Some(chunk) = invoice_batch.push(to_invoice_line(line)) {
                insert_invoice_lines(&tx, &chunk)?;
            }
        } else {
            quotation_lines += 1;
            if let Some(chunk) = quotation_batch.push(to_quotation_line(line)) {
                insert_quotation_lines(&tx, &chunk)?;
            }
        }
    }

    if let Some(chunk) = invoice_batch.finish() {
        insert_invoice_lines(&tx, &chunk)?;
    }
    if let Some(chunk) = quotation_batch.finish() {
        insert_quotation_lines(&tx, &chunk)?;
    }

    let recon = reconciler::reconcile_quotations(&tx, config, &start, &end)?;
    let invoices_rebuilt = reconciler::rebuild_invoice_summaries(&tx, config, &start, &end)?;

    let sellers_created = resolver.created();
    tx.commit()?;

    info!(
        invoice_lines,
        quotation_lines,
        headers_created = recon.headers_created,
        headers_updated = recon.headers_updated,
        "batch committed"
    );

    Ok(IngestSummary {
        min_date,
        max_date,
        invoice_lines,
        quotation_lines,
        skipped_lines,
        sellers_created,
        headers_created: recon.headers_created,
        headers_updated: recon.headers_updated,
        invoices_rebuilt,
    })
}

/// Deletes all previously stored line-level rows in [start, end], making the
/// ingestion idempotent per date range. Quotation headers are reconciled
/// later, never deleted here.
fn replace_range(conn: &Connection, start: &str, end: &str) -> Result<()> {
    let invoices = conn.execute(
        "DELETE FROM invoice_lines WHERE date BETWEEN ?1 AND ?2",
        rusqlite::params![start, end],
    )?;
    let quotations = conn.execute(
        "DELETE FROM quotation_lines WHERE date BETWEEN ?1 AND ?2",
        rusqlite::params![start, end],
    )?;
    info!(invoices, quotations, "replaced existing line rows in range");
    Ok(())
}

fn to_invoice_line(line: &ParsedLine) -> InvoiceLine {
    InvoiceLine {
        date: line.date.format("%Y-%m-%d").to_string(),
        client_id: line.client_id.clone(),
        client: line.client.clone(),
        invoice_ref: line.reference.clone(),
        family: line.family.clone(),
        quantity: line.quantity,
        total_ttc: line.total_ttc,
        total_invoice: line.total_document,
        pair: line.pair,
        status: line.status.clone(),
        seller_ref: line.seller_ref.clone(),
    }
}

fn to_quotation_line(line: &ParsedLine) -> QuotationLine {
    QuotationLine {
        date: line.date.format("%Y-%m-%d").to_string(),
        client_id: line.client_id.clone(),
        client: line.client.clone(),
        quotation_ref: line.reference.clone(),
        family: line.family.clone(),
        quantity: line.quantity,
        total_ttc: line.total_ttc,
        total_quotation: line.total_document,
        pair: line.pair,
        status: line.status.clone(),
        seller_ref: line.seller_ref.clone(),
    }
}

fn insert_invoice_lines(conn: &Connection, chunk: &[InvoiceLine]) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO invoice_lines (date, client_id, client, invoice_ref, family, quantity, total_ttc, total_invoice, pair, status, seller_ref) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )?;
    for row in chunk {
        stmt.execute(rusqlite::params![
            row.date,
            row.client_id,
            row.client,
            row.invoice_ref,
            row.family,
            row.quantity,
            row.total_ttc,
            row.total_invoice,
            row.pair,
            row.status,
            row.seller_ref,
        ])?;
    }
    info!(rows = chunk.len(), "flushed invoice line chunk");
    Ok(())
}

fn insert_quotation_lines(conn: &Connection, chunk: &[QuotationLine]) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO quotation_lines (date, client_id, client, quotation_ref, family, quantity, total_ttc, total_quotation, pair, status, seller_ref) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )?;
    for row in chunk {
        stmt.execute(rusqlite::params![
            row.date,
            row.client_id,
            row.client,
            row.quotation_ref,
            row.family,
            row.quantity,
            row.total_ttc,
            row.total_quotation,
            row.pair,
            row.status,
            row.seller_ref,
        ])?;
    }
    info!(rows = chunk.len(), "flushed quotation line chunk");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn sample_line(
        date: &str,
        client_id: &str,
        reference: &str,
        family: &str,
        seller: &str,
        label: &str,
    ) -> String {
        format!("{date};;{client_id};Client {client_id};{reference};{family};1;;12,50;;{seller};;150,00;;{label}")
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0)).unwrap()
    }

    fn run(conn: &mut Connection, lines: &[String]) -> Result<IngestSummary> {
        let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
        process_batch(conn, &IngestConfig::default(), refs)
    }

    #[test]
    fn test_batch_flushes_at_capacity() {
        let mut batch = Batch::new(2);
        assert!(batch.push(1).is_none());
        assert_eq!(batch.push(2), Some(vec![1, 2]));
        assert!(batch.push(3).is_none());
        assert_eq!(batch.finish(), Some(vec![3]));
    }

    #[test]
    fn test_batch_finish_empty_is_none() {
        let batch: Batch<i64> = Batch::new(2);
        assert_eq!(batch.finish(), None);
    }

    #[test]
    fn test_invoice_only_batch() {
        // Scenario A: two facture lines, two dates.
        let (_dir, mut conn) = test_db();
        let lines = vec![
            sample_line("05/01/2024", "C1", "F001", "VER", "JDU", "Facture"),
            sample_line("10/01/2024", "C2", "F002", "MON", "JDU", "Facture"),
        ];
        let summary = run(&mut conn, &lines).unwrap();
        assert_eq!(summary.invoice_lines, 2);
        assert_eq!(summary.quotation_lines, 0);
        assert_eq!(summary.min_date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(summary.max_date, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(count(&conn, "invoice_lines"), 2);
        assert_eq!(count(&conn, "quotation_lines"), 0);
    }

    #[test]
    fn test_reingestion_is_idempotent() {
        let (_dir, mut conn) = test_db();
        let lines = vec![
            sample_line("05/01/2024", "C1", "F001", "VER", "JDU", "Facture"),
            sample_line("07/01/2024", "C1", "D001", "VER", "JDU", "Devis"),
        ];
        run(&mut conn, &lines).unwrap();
        run(&mut conn, &lines).unwrap();
        assert_eq!(count(&conn, "invoice_lines"), 1);
        assert_eq!(count(&conn, "quotation_lines"), 1);
        assert_eq!(count(&conn, "sellers"), 1);
    }

    #[test]
    fn test_replacement_preserves_rows_outside_range() {
        let (_dir, mut conn) = test_db();
        let december = vec![sample_line("15/12/2023", "C0", "F000", "VER", "JDU", "Facture")];
        run(&mut conn, &december).unwrap();

        let january = vec![sample_line("05/01/2024", "C1", "F001", "VER", "JDU", "Facture")];
        run(&mut conn, &january).unwrap();

        let dates: Vec<String> = conn
            .prepare("SELECT date FROM invoice_lines ORDER BY date")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(dates, vec!["2023-12-15".to_string(), "2024-01-05".to_string()]);
    }

    #[test]
    fn test_unknown_seller_is_created() {
        // Scenario D
        let (_dir, mut conn) = test_db();
        let lines = vec![sample_line("05/01/2024", "C1", "F001", "VER", "SX", "Facture")];
        let summary = run(&mut conn, &lines).unwrap();
        assert_eq!(summary.sellers_created, 1);
        let seller: String = conn
            .query_row("SELECT seller_ref FROM invoice_lines", [], |r| r.get(0))
            .unwrap();
        assert_eq!(seller, "SX");
    }

    #[test]
    fn test_bad_line_is_skipped_rest_committed() {
        // Scenario E: unparsable quantity on one line.
        let (_dir, mut conn) = test_db();
        let bad = "05/01/2024;;C2;Client C2;F002;VER;abc;;12,50;;JDU;;150,00;;Facture".to_string();
        let lines = vec![
            sample_line("05/01/2024", "C1", "F001", "VER", "JDU", "Facture"),
            bad,
            sample_line("06/01/2024", "C3", "F003", "VER", "JDU", "Facture"),
        ];
        let summary = run(&mut conn, &lines).unwrap();
        assert_eq!(summary.invoice_lines, 2);
        assert_eq!(summary.skipped_lines, 1);
        assert_eq!(count(&conn, "invoice_lines"), 2);
    }

    #[test]
    fn test_no_valid_dates_fails_before_deleting() {
        let (_dir, mut conn) = test_db();
        run(
            &mut conn,
            &[sample_line("05/01/2024", "C1", "F001", "VER", "JDU", "Facture")],
        )
        .unwrap();

        // Every line malformed: the batch fails fast and deletes nothing.
        let garbage = vec!["not;a;line".to_string()];
        let err = run(&mut conn, &garbage).unwrap_err();
        assert!(matches!(err, ComptoirError::NoValidDates));
        assert_eq!(count(&conn, "invoice_lines"), 1);
    }

    #[test]
    fn test_blank_seller_rolls_back_whole_batch() {
        let (_dir, mut conn) = test_db();
        run(
            &mut conn,
            &[sample_line("05/01/2024", "C1", "F001", "VER", "JDU", "Facture")],
        )
        .unwrap();

        // Same range: the delete runs, then the blank seller aborts.
        let lines = vec![
            sample_line("05/01/2024", "C2", "F002", "VER", "JDU", "Facture"),
            sample_line("05/01/2024", "C3", "F003", "VER", "", "Facture"),
        ];
        let err = run(&mut conn, &lines).unwrap_err();
        assert!(matches!(err, ComptoirError::UnknownSeller(_)));

        // Rollback restored the previous ingestion untouched.
        assert_eq!(count(&conn, "invoice_lines"), 1);
        let client: String = conn
            .query_row("SELECT client_id FROM invoice_lines", [], |r| r.get(0))
            .unwrap();
        assert_eq!(client, "C1");
    }

    #[test]
    fn test_small_batch_size_flushes_in_chunks() {
        let (_dir, mut conn) = test_db();
        let lines: Vec<String> = (1..=5)
            .map(|i| sample_line("05/01/2024", &format!("C{i}"), &format!("F{i:03}"), "VER", "JDU", "Facture"))
            .collect();
        let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
        let config = IngestConfig {
            batch_size: 2,
            ..IngestConfig::default()
        };
        let summary = process_batch(&mut conn, &config, refs).unwrap();
        assert_eq!(summary.invoice_lines, 5);
        assert_eq!(count(&conn, "invoice_lines"), 5);
    }

    #[test]
    fn test_quotation_batch_creates_header() {
        // Scenario B end to end through the pipeline.
        let (_dir, mut conn) = test_db();
        let lines = vec![
            sample_line("01/02/2024", "C1", "D001", "VER", "JDU", "Devis validé"),
            sample_line("01/02/2024", "C1", "D002", "VER", "JDU", "Devis en attente"),
        ];
        let summary = run(&mut conn, &lines).unwrap();
        assert_eq!(summary.quotation_lines, 2);
        assert_eq!(summary.headers_created, 1);
        let (client_id, validated): (String, bool) = conn
            .query_row("SELECT client_id, is_validated FROM quotations", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(client_id, "C1");
        assert!(validated);
    }
}
