use std::collections::HashSet;

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::{ComptoirError, Result};

/// Guarantees every seller reference used in a batch exists in the seller
/// directory before any line referencing it is written. Keeps a set of
/// references already resolved this invocation so each distinct reference is
/// checked and created at most once.
pub struct SellerResolver {
    resolved: HashSet<String>,
    created: usize,
}

impl SellerResolver {
    pub fn new() -> Self {
        Self {
            resolved: HashSet::new(),
            created: 0,
        }
    }

    /// Number of sellers auto-created so far this invocation.
    pub fn created(&self) -> usize {
        self.created
    }

    pub fn ensure(&mut self, conn: &Connection, seller_ref: &str) -> Result<()> {
        if seller_ref.is_empty() {
            return Err(ComptoirError::UnknownSeller(seller_ref.to_string()));
        }
        if self.resolved.contains(seller_ref) {
            return Ok(());
        }

        let exists = conn
            .prepare_cached("SELECT 1 FROM sellers WHERE seller_ref = ?1")?
            .exists([seller_ref])?;
        if !exists {
            // Opportunistically link a user account whose login matches.
            let user_id: Option<i64> = conn
                .prepare_cached("SELECT id FROM users WHERE login = ?1")?
                .query_row([seller_ref], |row| row.get(0))
                .optional()?;
            conn.prepare_cached("INSERT INTO sellers (seller_ref, user_id) VALUES (?1, ?2)")?
                .execute(rusqlite::params![seller_ref, user_id])?;
            match user_id {
                Some(id) => info!(seller_ref, user_id = id, "created seller linked to user"),
                None => info!(seller_ref, "created seller"),
            }
            self.created += 1;
        }

        self.resolved.insert(seller_ref.to_string());
        Ok(())
    }
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

    fn seller_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT count(*) FROM sellers", [], |r| r.get(0)).unwrap()
    }

    #[test]
    fn test_creates_missing_seller_once() {
        let (_dir, conn) = test_db();
        let mut resolver = SellerResolver::new();
        resolver.ensure(&conn, "JDU").unwrap();
        resolver.ensure(&conn, "JDU").unwrap();
        resolver.ensure(&conn, "JDU").unwrap();
        assert_eq!(seller_count(&conn), 1);
        assert_eq!(resolver.created(), 1);
    }

    #[test]
    fn test_existing_seller_is_not_recreated() {
        let (_dir, conn) = test_db();
        conn.execute("INSERT INTO sellers (seller_ref) VALUES ('MLE')", []).unwrap();
        let mut resolver = SellerResolver::new();
        resolver.ensure(&conn, "MLE").unwrap();
        assert_eq!(seller_count(&conn), 1);
        assert_eq!(resolver.created(), 0);
    }

    #[test]
    fn test_links_user_with_matching_login() {
        let (_dir, conn) = test_db();
        conn.execute(
            "INSERT INTO users (login, lastname, firstname, role) VALUES ('JDU', 'Dupont', 'Jean', 'collaborator')",
            [],
        )
        .unwrap();
        let user_id = conn.last_insert_rowid();

        let mut resolver = SellerResolver::new();
        resolver.ensure(&conn, "JDU").unwrap();

        let linked: Option<i64> = conn
            .query_row("SELECT user_id FROM sellers WHERE seller_ref = 'JDU'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(linked, Some(user_id));
    }

    #[test]
    fn test_no_matching_login_leaves_user_null() {
        let (_dir, conn) = test_db();
        let mut resolver = SellerResolver::new();
        resolver.ensure(&conn, "SX").unwrap();
        let linked: Option<i64> = conn
            .query_row("SELECT user_id FROM sellers WHERE seller_ref = 'SX'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(linked, None);
    }

    #[test]
    fn test_blank_reference_is_fatal() {
        let (_dir, conn) = test_db();
        let mut resolver = SellerResolver::new();
        let err = resolver.ensure(&conn, "").unwrap_err();
        assert!(matches!(err, ComptoirError::UnknownSeller(_)));
    }
}
