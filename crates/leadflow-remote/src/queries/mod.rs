// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules over [`Database`](crate::database::Database).
//!
//! The generic helpers here drive plain CRUD from an [`EntityMap`]; modules
//! for individual entities add the statements a map cannot express.

pub mod calls;
pub mod enquiries;
pub mod messages;
pub mod outbox;
pub mod products;
pub mod queue;
pub mod users;

use leadflow_core::LeadflowError;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::database::{map_tr_err, unique_violation, Database};
use crate::mapping::EntityMap;

/// A uniqueness violation on insert: the column and the value that collided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub column: String,
    pub value: String,
}

impl Conflict {
    pub fn into_error(self, map: &EntityMap) -> LeadflowError {
        LeadflowError::DuplicateKey {
            entity: map.entity,
            key: self.value,
        }
    }
}

/// Identify which mapped column a constraint message names.
///
/// SQLite reports `UNIQUE constraint failed: <table>.<column>`.
fn conflict_from(map: &EntityMap, message: &str, values: &[SqlValue]) -> Conflict {
    let column = message
        .rsplit_once(&format!("{}.", map.table))
        .map(|(_, column)| column.trim().to_string())
        .unwrap_or_else(|| map.key.to_string());
    let value = map
        .position_of_column(&column)
        .and_then(|i| values.get(i))
        .map(|v| match v {
            SqlValue::Text(s) => s.clone(),
            SqlValue::Integer(i) => i.to_string(),
            SqlValue::Real(f) => f.to_string(),
            SqlValue::Null | SqlValue::Blob(_) => String::new(),
        })
        .unwrap_or_default();
    Conflict { column, value }
}

/// Run `sql` on an existing connection, mapping a uniqueness violation to a [`Conflict`].
pub(crate) fn insert_on(
    conn: &Connection,
    map: &EntityMap,
    sql: &str,
    values: &[SqlValue],
) -> rusqlite::Result<Result<(), Conflict>> {
    match conn.execute(sql, params_from_iter(values.iter())) {
        Ok(_) => Ok(Ok(())),
        Err(e) => match unique_violation(&e) {
            Some(message) => Ok(Err(conflict_from(map, message, values))),
            None => Err(e),
        },
    }
}

/// Load every row of `map`'s table in insertion order.
pub(crate) fn load_all<T: DeserializeOwned>(
    conn: &Connection,
    map: &EntityMap,
) -> rusqlite::Result<Vec<T>> {
    let sql = format!("{} ORDER BY rowid", map.select_sql());
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| map.decode(row, 0))?;
    rows.collect()
}

/// Load one row by primary key.
pub(crate) fn load_one<T: DeserializeOwned>(
    conn: &Connection,
    map: &EntityMap,
    key: &str,
) -> rusqlite::Result<Option<T>> {
    let sql = format!("{} WHERE {} = ?1", map.select_sql(), map.key);
    conn.query_row(&sql, params![key], |row| map.decode(row, 0))
        .optional()
}

pub async fn list<T>(db: &Database, map: &'static EntityMap) -> Result<Vec<T>, LeadflowError>
where
    T: DeserializeOwned + Send + 'static,
{
    db.connection()
        .call(move |conn| load_all(conn, map))
        .await
        .map_err(map_tr_err)
}

pub async fn find<T>(
    db: &Database,
    map: &'static EntityMap,
    key: &str,
) -> Result<Option<T>, LeadflowError>
where
    T: DeserializeOwned + Send + 'static,
{
    let key = key.to_string();
    db.connection()
        .call(move |conn| load_one(conn, map, &key))
        .await
        .map_err(map_tr_err)
}

/// Insert without retry; a uniqueness violation is returned as a [`Conflict`].
pub async fn try_insert<T: Serialize>(
    db: &Database,
    map: &'static EntityMap,
    entity: &T,
) -> Result<Result<(), Conflict>, LeadflowError> {
    let values = map.encode(entity)?;
    db.connection()
        .call(move |conn| insert_on(conn, map, &map.insert_sql(), &values))
        .await
        .map_err(map_tr_err)
}

/// Insert; a uniqueness violation is [`LeadflowError::DuplicateKey`].
pub async fn insert<T: Serialize>(
    db: &Database,
    map: &'static EntityMap,
    entity: &T,
) -> Result<(), LeadflowError> {
    try_insert(db, map, entity)
        .await?
        .map_err(|conflict| conflict.into_error(map))
}

/// Insert or replace by primary key.
///
/// A violation of a secondary unique column is still a [`LeadflowError::DuplicateKey`].
pub async fn upsert<T: Serialize>(
    db: &Database,
    map: &'static EntityMap,
    entity: &T,
) -> Result<(), LeadflowError> {
    let values = map.encode(entity)?;
    db.connection()
        .call(move |conn| insert_on(conn, map, &map.upsert_sql(), &values))
        .await
        .map_err(map_tr_err)?
        .map_err(|conflict| conflict.into_error(map))
}

/// Delete by primary key. Deleting a missing row is not an error.
pub async fn delete(db: &Database, map: &'static EntityMap, key: &str) -> Result<(), LeadflowError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                &format!("DELETE FROM {} WHERE {} = ?1", map.table, map.key),
                params![key],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
