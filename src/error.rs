use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComptoirError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No valid dates found in the batch")]
    NoValidDates,

    #[error("Unknown seller reference: {0:?}")]
    UnknownSeller(String),

    #[error("Reconciliation error: {0}")]
    Reconciliation(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, ComptoirError>;
