mod cli;
mod db;
mod error;
mod models;
mod parser;
mod pipeline;
mod reconciler;
mod sellers;
mod settings;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("comptoir=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Ingest { file } => cli::ingest::run(&file),
        Commands::Sellers => cli::sellers::list(),
        Commands::Quotations { from_date, to_date } => {
            cli::quotations::list(from_date.as_deref(), to_date.as_deref())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
