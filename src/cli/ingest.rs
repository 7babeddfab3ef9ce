use std::path::Path;

use colored::Colorize;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::pipeline::process_batch;
use crate::settings::{get_data_dir, load_settings};

pub fn run(file: &str) -> Result<()> {
    let content = std::fs::read_to_string(Path::new(file))?;

    let settings = load_settings();
    let data_dir = get_data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let mut conn = get_connection(&data_dir.join("comptoir.db"))?;
    init_db(&conn)?;

    let summary = process_batch(&mut conn, &settings.ingest_config(), content.lines())?;

    println!(
        "{} period {} to {}",
        "Ingested".green().bold(),
        summary.min_date,
        summary.max_date
    );
    println!(
        "  {} invoice lines, {} quotation lines ({} skipped)",
        summary.invoice_lines, summary.quotation_lines, summary.skipped_lines
    );
    println!(
        "  {} sellers created, {} headers created, {} headers updated, {} invoices rebuilt",
        summary.sellers_created, summary.headers_created, summary.headers_updated, summary.invoices_rebuilt
    );

    Ok(())
}
