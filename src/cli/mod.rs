pub mod ingest;
pub mod init;
pub mod quotations;
pub mod sellers;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "comptoir", about = "Sales export ingestion and quotation reconciliation.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up Comptoir: choose a data directory and initialize the database.
    Init {
        /// Path for Comptoir data (default: ~/Documents/comptoir)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Ingest a semicolon-delimited sales export file.
    Ingest {
        /// Path to the export file (UTF-8, complete file — not a fragment)
        file: String,
    },
    /// List the seller directory.
    Sellers,
    /// List quotation headers.
    Quotations {
        /// Start date: YYYY-MM-DD
        #[arg(long = "from")]
        from_date: Option<String>,
        /// End date: YYYY-MM-DD
        #[arg(long = "to")]
        to_date: Option<String>,
    },
}
