use std::collections::BTreeMap;

use rusqlite::Connection;
use tracing::info;

use crate::error::{ComptoirError, Result};
use crate::models::{InvoiceSummary, QuotationHeader, QuotationStatus};
use crate::pipeline::{Batch, IngestConfig};

#[derive(Debug, Default)]
pub struct ReconcileSummary {
    pub headers_created: usize,
    pub headers_updated: usize,
}

struct QuotationLineRow {
    date: String,
    client_id: String,
    client: String,
    seller_ref: String,
    status: String,
}

/// Consolidates just-written quotation lines into per-(client, date) headers.
///
/// Only lines whose family is one of the configured reconciliation families
/// participate. Existing headers get their is_validated flag recomputed and
/// nothing else touched; missing headers are created with attribution taken
/// from the group, chunked through the bulk writer.
pub fn reconcile_quotations(
    conn: &Connection,
    config: &IngestConfig,
    start: &str,
    end: &str,
) -> Result<ReconcileSummary> {
    if config.reconcile_families.is_empty() {
        return Ok(ReconcileSummary::default());
    }

    let rows = load_quotation_lines(conn, &config.reconcile_families, start, end)?;

    // Group by (client id, date); BTreeMap keeps iteration deterministic.
    let mut groups: BTreeMap<(String, String), Vec<QuotationLineRow>> = BTreeMap::new();
    for row in rows {
        groups
            .entry((row.client_id.clone(), row.date.clone()))
            .or_default()
            .push(row);
    }

    let mut summary = ReconcileSummary::default();
    let mut new_headers = Batch::new(config.batch_size);

    for ((client_id, date), group) in &groups {
        let is_validated = group
            .iter()
            .any(|row| QuotationStatus::from_label(&row.status) == QuotationStatus::Validated);

        let existing: Vec<i64> = conn
            .prepare_cached("SELECT id FROM quotations WHERE client_id = ?1 AND date = ?2")?
            .query_map(rusqlite::params![client_id, date], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if existing.is_empty() {
            // A group can span two sellers on the same date (data anomaly);
            // the smallest seller_ref wins so attribution is deterministic.
            let attribution = group
                .iter()
                .min_by(|a, b| a.seller_ref.cmp(&b.seller_ref))
                .ok_or_else(|| ComptoirError::Reconciliation(format!("empty group for {client_id}/{date}")))?;
            if let Some(chunk) = new_headers.push(QuotationHeader {
                id: None,
                date: date.clone(),
                client_id: client_id.clone(),
                client: attribution.client.clone(),
                seller_ref: attribution.seller_ref.clone(),
                is_validated,
                action: None,
                comment: None,
            }) {
                summary.headers_created += insert_headers(conn, &chunk)?;
            }
        } else {
            for id in existing {
                conn.prepare_cached("UPDATE quotations SET is_validated = ?1 WHERE id = ?2")?
                    .execute(rusqlite::params![is_validated, id])
                    .map_err(|e| ComptoirError::Reconciliation(format!("header update failed: {e}")))?;
                summary.headers_updated += 1;
            }
        }
    }

    if let Some(chunk) = new_headers.finish() {
        summary.headers_created += insert_headers(conn, &chunk)?;
    }

    info!(
        created = summary.headers_created,
        updated = summary.headers_updated,
        "quotation headers reconciled"
    );
    Ok(summary)
}

fn load_quotation_lines(
    conn: &Connection,
    families: &[String],
    start: &str,
    end: &str,
) -> Result<Vec<QuotationLineRow>> {
    let placeholders = vec!["?"; families.len()].join(", ");
    let sql = format!(
        "SELECT date, client_id, client, seller_ref, status FROM quotation_lines \
         WHERE date BETWEEN ? AND ? AND family IN ({placeholders}) ORDER BY id"
    );
    let mut params: Vec<&str> = vec![start, end];
    params.extend(families.iter().map(|f| f.as_str()));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params), |row| {
            Ok(QuotationLineRow {
                date: row.get(0)?,
                client_id: row.get(1)?,
                client: row.get(2)?,
                seller_ref: row.get(3)?,
                status: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn insert_headers(conn: &Connection, chunk: &[QuotationHeader]) -> Result<usize> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO quotations (date, client_id, client, seller_ref, is_validated) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .map_err(|e| ComptoirError::Reconciliation(format!("header insert failed: {e}")))?;
    for header in chunk {
        stmt.execute(rusqlite::params![
            header.date,
            header.client_id,
            header.client,
            header.seller_ref,
            header.is_validated,
        ])
        .map_err(|e| ComptoirError::Reconciliation(format!("header insert failed: {e}")))?;
    }
    Ok(chunk.len())
}

/// Rebuilds the per-invoice aggregates for the range: deletes aggregates in
/// [start, end] and regroups invoice lines by invoice reference. The first
/// line of a group supplies the shared fields; is_optical is true when any
/// line's family is a reconciliation family.
pub fn rebuild_invoice_summaries(
    conn: &Connection,
    config: &IngestConfig,
    start: &str,
    end: &str,
) -> Result<usize> {
    struct InvoiceLineRow {
        date: String,
        client_id: String,
        client: String,
        invoice_ref: String,
        seller_ref: String,
        total_invoice: f64,
        status: String,
        family: Option<String>,
    }

    let mut stmt = conn.prepare(
        "SELECT date, client_id, client, invoice_ref, seller_ref, total_invoice, status, family \
         FROM invoice_lines WHERE date BETWEEN ?1 AND ?2 ORDER BY id",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![start, end], |row| {
            Ok(InvoiceLineRow {
                date: row.get(0)?,
                client_id: row.get(1)?,
                client: row.get(2)?,
                invoice_ref: row.get(3)?,
                seller_ref: row.get(4)?,
                total_invoice: row.get(5)?,
                status: row.get(6)?,
                family: row.get(7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    conn.execute(
        "DELETE FROM invoices WHERE date BETWEEN ?1 AND ?2",
        rusqlite::params![start, end],
    )?;

    let mut groups: BTreeMap<String, Vec<InvoiceLineRow>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.invoice_ref.clone()).or_default().push(row);
    }

    let mut rebuilt = 0usize;
    let mut batch = Batch::new(config.batch_size);
    for (invoice_ref, lines) in &groups {
        let first = &lines[0];
        let is_optical = lines.iter().any(|line| {
            line.family.as_deref().is_some_and(|family| {
                config
                    .reconcile_families
                    .iter()
                    .any(|f| f.eq_ignore_ascii_case(family))
            })
        });
        if let Some(chunk) = batch.push(InvoiceSummary {
            date: first.date.clone(),
            client_id: first.client_id.clone(),
            client: first.client.clone(),
            invoice_ref: invoice_ref.clone(),
            seller_ref: first.seller_ref.clone(),
            total_invoice: first.total_invoice,
            status: first.status.clone(),
            is_optical,
        }) {
            rebuilt += insert_invoice_summaries(conn, &chunk)?;
        }
    }
    if let Some(chunk) = batch.finish() {
        rebuilt += insert_invoice_summaries(conn, &chunk)?;
    }

    info!(rebuilt, "invoice aggregates rebuilt");
    Ok(rebuilt)
}

fn insert_invoice_summaries(conn: &Connection, chunk: &[InvoiceSummary]) -> Result<usize> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO invoices (date, client_id, client, invoice_ref, seller_ref, total_invoice, status, is_optical) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    for row in chunk {
        stmt.execute(rusqlite::params![
            row.date,
            row.client_id,
            row.client,
            row.invoice_ref,
            row.seller_ref,
            row.total_invoice,
            row.status,
            row.is_optical,
        ])?;
    }
    Ok(chunk.len())
}
