// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection management: PRAGMA setup, migrations and shutdown.
//!
//! All statements are serialized through tokio-rusqlite's single background
//! thread. Do not open a second connection for writes.

use std::time::Duration;

use leadflow_core::LeadflowError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations;

/// Convert a tokio-rusqlite error into LeadflowError::Storage.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> LeadflowError {
    LeadflowError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the relational database.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `path`, configure it and apply migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, LeadflowError> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| LeadflowError::Storage {
                source: Box::new(e),
            })?;

        let journal_mode = conn
            .call(move |conn| -> Result<Result<String, LeadflowError>, rusqlite::Error> {
                let mode = if wal_mode {
                    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                        row.get::<_, String>(0)
                    })?
                } else {
                    conn.pragma_query_value(None, "journal_mode", |row| row.get::<_, String>(0))?
                };
                conn.pragma_update(None, "synchronous", "NORMAL")?;
                conn.busy_timeout(Duration::from_secs(5))?;
                Ok(migrations::run_migrations(conn).map(|()| mode))
            })
            .await
            .map_err(map_tr_err)??;

        debug!(path, journal_mode = %journal_mode, "remote database opened");
        Ok(Self { conn })
    }

    /// The underlying connection, for query modules.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL so the main file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), LeadflowError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Extract the constraint message from a uniqueness violation, if `e` is one.
pub fn unique_violation(e: &rusqlite::Error) -> Option<&str> {
    match e {
        rusqlite::Error::SqliteFailure(err, message)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            Some(message.as_deref().unwrap_or("constraint failed"))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_applies_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remote.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();

        let tables: Vec<String> = db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .unwrap();

        for expected in [
            "branches",
            "call_logs",
            "enquiries",
            "enquiry_history",
            "message_queue",
            "messages",
            "outbox",
            "products",
            "promotions",
            "users",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing {expected}");
        }
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remote.db");
        let path = path.to_str().unwrap();
        let db = Database::open(path, true).await.unwrap();
        db.checkpoint().await.unwrap();
        drop(db);
        Database::open(path, true).await.unwrap();
    }
}
