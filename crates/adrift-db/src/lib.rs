pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::Result;
use rusqlite::{Connection, Transaction};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Single shared SQLite handle. One writer connection behind a mutex; WAL
/// mode keeps readers from blocking it. All lifecycle decisions read through
/// here — no in-memory state is authoritative.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database for tests.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }

    /// Run `f` inside a transaction. Commits on `Ok`; any `Err` (or panic)
    /// rolls the whole unit back when the transaction guard drops, so no
    /// partial lifecycle state ever lands.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        let tx = conn.unchecked_transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_memory_runs_migrations() {
        let db = Database::open_memory().unwrap();
        let version: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                    [],
                    |r| r.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(version, migrations::SCHEMA_VERSION);
    }

    #[test]
    fn open_on_disk_is_reopenable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adrift.db");
        {
            let db = Database::open(&path).unwrap();
            db.with_conn(|conn| {
                conn.execute(
                    "INSERT INTO players (id, morality) VALUES ('ann', 3)",
                    [],
                )?;
                Ok(())
            })
            .unwrap();
        }

        // migrations are idempotent across reopen and data survives
        let db = Database::open(&path).unwrap();
        let score: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT morality FROM players WHERE id = 'ann'",
                    [],
                    |r| r.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(score, 3);
    }

    #[test]
    fn with_tx_rolls_back_on_error() {
        let db = Database::open_memory().unwrap();
        let res: Result<()> = db.with_tx(|tx| {
            tx.execute("INSERT INTO players (id, morality) VALUES ('bob', 1)", [])?;
            anyhow::bail!("boom");
        });
        assert!(res.is_err());

        let count: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM players", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 0);
    }
}
