use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    login TEXT NOT NULL UNIQUE,
    lastname TEXT,
    firstname TEXT,
    role TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS sellers (
    id INTEGER PRIMARY KEY,
    seller_ref TEXT NOT NULL UNIQUE,
    user_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (user_id) REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS invoice_lines (
    id INTEGER PRIMARY KEY,
    date TEXT NOT NULL,
    client_id TEXT NOT NULL,
    client TEXT NOT NULL,
    invoice_ref TEXT NOT NULL,
    family TEXT,
    quantity INTEGER NOT NULL,
    total_ttc REAL NOT NULL,
    total_invoice REAL NOT NULL,
    pair INTEGER,
    status TEXT NOT NULL,
    seller_ref TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (seller_ref) REFERENCES sellers(seller_ref)
);

CREATE TABLE IF NOT EXISTS quotation_lines (
    id INTEGER PRIMARY KEY,
    date TEXT NOT NULL,
    client_id TEXT NOT NULL,
    client TEXT NOT NULL,
    quotation_ref TEXT NOT NULL,
    family TEXT,
    quantity INTEGER NOT NULL,
    total_ttc REAL NOT NULL,
    total_quotation REAL NOT NULL,
    pair INTEGER,
    status TEXT NOT NULL,
    seller_ref TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (seller_ref) REFERENCES sellers(seller_ref)
);

CREATE TABLE IF NOT EXISTS quotations (
    id INTEGER PRIMARY KEY,
    date TEXT NOT NULL,
    client_id TEXT NOT NULL,
    client TEXT NOT NULL,
    seller_ref TEXT NOT NULL,
    is_validated INTEGER NOT NULL DEFAULT 0,
    action TEXT,
    comment TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (seller_ref) REFERENCES sellers(seller_ref)
);

CREATE TABLE IF NOT EXISTS invoices (
    id INTEGER PRIMARY KEY,
    date TEXT NOT NULL,
    client_id TEXT NOT NULL,
    client TEXT NOT NULL,
    invoice_ref TEXT NOT NULL,
    seller_ref TEXT NOT NULL,
    total_invoice REAL NOT NULL,
    status TEXT NOT NULL,
    is_optical INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (seller_ref) REFERENCES sellers(seller_ref)
);

CREATE INDEX IF NOT EXISTS idx_invoice_lines_date ON invoice_lines(date);
CREATE INDEX IF NOT EXISTS idx_quotation_lines_date ON quotation_lines(date);
CREATE INDEX IF NOT EXISTS idx_quotations_client_date ON quotations(client_id, date);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
