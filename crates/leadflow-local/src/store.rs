// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flat key-value persistence: one JSON array per entity collection.
//!
//! The store is a single SQLite table driven through `tokio-rusqlite`, so
//! every read-modify-write closure runs on one background thread in arrival
//! order. Nothing else locks.

use leadflow_core::LeadflowError;
use rusqlite::{params, OptionalExtension, Transaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_rusqlite::Connection;

/// Fixed collection keys.
pub mod keys {
    pub const USERS: &str = "users";
    pub const BRANCHES: &str = "branches";
    pub const PRODUCTS: &str = "products";
    pub const ENQUIRIES: &str = "enquiries";
    pub const PROMOTIONS: &str = "promotions";
    pub const MESSAGES: &str = "messages";
    pub const QUEUE: &str = "queue";
}

pub(crate) fn storage_err(e: impl std::error::Error + Send + Sync + 'static) -> LeadflowError {
    LeadflowError::Storage {
        source: Box::new(e),
    }
}

/// Convert a tokio-rusqlite error into LeadflowError::Storage.
fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> LeadflowError {
    storage_err(e)
}

/// Handle to the key-value database.
pub struct KvStore {
    conn: Connection,
}

impl KvStore {
    /// Open (or create) the store at `path`.
    pub async fn open(path: &str) -> Result<Self, LeadflowError> {
        let conn = Connection::open(path).await.map_err(storage_err)?;
        Self::with_connection(conn).await
    }

    /// Open a throwaway in-memory store.
    pub async fn open_in_memory() -> Result<Self, LeadflowError> {
        let conn = Connection::open_in_memory().await.map_err(storage_err)?;
        Self::with_connection(conn).await
    }

    async fn with_connection(conn: Connection) -> Result<Self, LeadflowError> {
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS kv (
                     key   TEXT PRIMARY KEY NOT NULL,
                     value TEXT NOT NULL
                 );",
            )
        })
        .await
        .map_err(map_tr_err)?;
        Ok(Self { conn })
    }

    /// Run `f` against the collections inside one transaction.
    ///
    /// The transaction commits when `f` returns `Ok` and rolls back otherwise.
    pub async fn with<R, F>(&self, f: F) -> Result<R, LeadflowError>
    where
        F: FnOnce(&Collections<'_>) -> Result<R, LeadflowError> + Send + 'static,
        R: Send + 'static,
    {
        self.conn
            .call(move |conn| -> Result<Result<R, LeadflowError>, rusqlite::Error> {
                let tx = conn.transaction()?;
                let outcome = f(&Collections { tx: &tx });
                if outcome.is_ok() {
                    tx.commit()?;
                }
                Ok(outcome)
            })
            .await
            .map_err(map_tr_err)?
    }

    /// Liveness probe.
    pub async fn ping(&self) -> Result<(), LeadflowError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> { conn.execute_batch("SELECT 1;") })
            .await
            .map_err(map_tr_err)
    }
}

/// Typed access to the stored collections within one transaction.
pub struct Collections<'a> {
    tx: &'a Transaction<'a>,
}

impl Collections<'_> {
    /// Whether `key` has ever been written.
    pub fn contains(&self, key: &str) -> Result<bool, LeadflowError> {
        self.raw(key).map(|value| value.is_some())
    }

    /// Decode a collection, dropping null slots. A missing key is empty.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, LeadflowError> {
        match self.raw(key)? {
            None => Ok(Vec::new()),
            Some(json) => {
                let slots: Vec<Option<T>> = serde_json::from_str(&json)?;
                Ok(slots.into_iter().flatten().collect())
            }
        }
    }

    /// Replace a collection.
    pub fn save<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), LeadflowError> {
        let json = serde_json::to_string(items)?;
        self.tx
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, json],
            )
            .map_err(storage_err)?;
        Ok(())
    }

    /// Write the raw JSON of a collection, bypassing typing.
    pub fn save_raw(&self, key: &str, json: &str) -> Result<(), LeadflowError> {
        self.tx
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, json],
            )
            .map_err(storage_err)?;
        Ok(())
    }

    fn raw(&self, key: &str) -> Result<Option<String>, LeadflowError> {
        self.tx
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(storage_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: String,
    }

    #[tokio::test]
    async fn missing_key_loads_empty() {
        let store = KvStore::open_in_memory().await.unwrap();
        let items: Vec<Item> = store.with(|c| c.load("nothing")).await.unwrap();
        assert!(items.is_empty());
        assert!(!store.with(|c| c.contains("nothing")).await.unwrap());
    }

    #[tokio::test]
    async fn null_slots_are_filtered() {
        let store = KvStore::open_in_memory().await.unwrap();
        store
            .with(|c| c.save_raw("items", r#"[{"id":"a"},null,{"id":"b"},null]"#))
            .await
            .unwrap();

        let items: Vec<Item> = store.with(|c| c.load("items")).await.unwrap();
        assert_eq!(
            items,
            vec![Item { id: "a".into() }, Item { id: "b".into() }]
        );
    }

    #[tokio::test]
    async fn failed_closure_rolls_back() {
        let store = KvStore::open_in_memory().await.unwrap();
        let result: Result<(), LeadflowError> = store
            .with(|c| {
                c.save("items", &[Item { id: "a".into() }])?;
                Err(LeadflowError::Internal("abort".into()))
            })
            .await;
        assert!(result.is_err());

        let items: Vec<Item> = store.with(|c| c.load("items")).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.db");
        let path = path.to_str().unwrap();

        let store = KvStore::open(path).await.unwrap();
        store
            .with(|c| c.save("items", &[Item { id: "x".into() }]))
            .await
            .unwrap();
        drop(store);

        let reopened = KvStore::open(path).await.unwrap();
        let items: Vec<Item> = reopened.with(|c| c.load("items")).await.unwrap();
        assert_eq!(items.len(), 1);
    }
}
