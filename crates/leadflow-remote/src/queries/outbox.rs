// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbox operations for crash-safe conversion notifications.
//!
//! Rows are written by the stage transaction and drained by the
//! dispatcher. A row claimed by a dispatcher that died is reclaimed once
//! its lock expires.

use leadflow_core::LeadflowError;
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::models::{OutboxCounts, OutboxEntry};

const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

/// Claim the oldest deliverable entry and mark it `processing`.
///
/// Deliverable means `pending`, or `processing` with an expired lock. The
/// claim holds for `lock_secs`. Returns `None` when nothing is deliverable.
pub async fn claim_next(db: &Database, lock_secs: u64) -> Result<Option<OutboxEntry>, LeadflowError> {
    claim_next_after(db, lock_secs, 0).await
}

/// Like [`claim_next`], skipping entries with an id at or below `after_id`.
pub async fn claim_next_after(
    db: &Database,
    lock_secs: u64,
    after_id: i64,
) -> Result<Option<OutboxEntry>, LeadflowError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let entry = tx
                .query_row(
                    &format!(
                        "SELECT id, idempotency_key, enquiry_id, payload, status, attempts,
                                max_attempts, last_error, created_at, updated_at
                         FROM outbox
                         WHERE id > ?1
                           AND (status = 'pending'
                                OR (status = 'processing' AND locked_until < {NOW}))
                         ORDER BY id ASC
                         LIMIT 1"
                    ),
                    params![after_id],
                    |row| {
                        Ok(OutboxEntry {
                            id: row.get(0)?,
                            idempotency_key: row.get(1)?,
                            enquiry_id: row.get(2)?,
                            payload: row.get(3)?,
                            status: row.get(4)?,
                            attempts: row.get(5)?,
                            max_attempts: row.get(6)?,
                            last_error: row.get(7)?,
                            created_at: row.get(8)?,
                            updated_at: row.get(9)?,
                        })
                    },
                )
                .optional()?;

            let Some(entry) = entry else {
                tx.commit()?;
                return Ok(None);
            };

            tx.execute(
                &format!(
                    "UPDATE outbox SET status = 'processing',
                     locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?1),
                     updated_at = {NOW}
                     WHERE id = ?2"
                ),
                params![format!("+{lock_secs} seconds"), entry.id],
            )?;
            tx.commit()?;

            Ok(Some(OutboxEntry {
                status: "processing".to_string(),
                ..entry
            }))
        })
        .await
        .map_err(map_tr_err)
}

/// Mark an entry delivered.
pub async fn ack(db: &Database, id: i64) -> Result<(), LeadflowError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "UPDATE outbox SET status = 'delivered', locked_until = NULL,
                     last_error = NULL, updated_at = {NOW}
                     WHERE id = ?1"
                ),
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a failed delivery attempt.
///
/// Increments attempts. At `max_attempts` the entry becomes `failed`;
/// otherwise it returns to `pending`. Returns the new status.
pub async fn fail(db: &Database, id: i64, error: &str) -> Result<String, LeadflowError> {
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let (attempts, max_attempts): (i32, i32) = tx.query_row(
                "SELECT attempts, max_attempts FROM outbox WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let new_attempts = attempts + 1;
            let status = if new_attempts >= max_attempts {
                "failed"
            } else {
                "pending"
            };
            tx.execute(
                &format!(
                    "UPDATE outbox SET status = ?1, attempts = ?2, last_error = ?3,
                     locked_until = NULL, updated_at = {NOW}
                     WHERE id = ?4"
                ),
                params![status, new_attempts, error, id],
            )?;
            tx.commit()?;
            Ok(status.to_string())
        })
        .await
        .map_err(map_tr_err)
}

/// Return every `failed` entry to `pending` with a fresh attempt budget.
pub async fn requeue_failed(db: &Database) -> Result<usize, LeadflowError> {
    db.connection()
        .call(|conn| {
            conn.execute(
                &format!(
                    "UPDATE outbox SET status = 'pending', attempts = 0, updated_at = {NOW}
                     WHERE status = 'failed'"
                ),
                [],
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Row counts by status.
pub async fn counts(db: &Database) -> Result<OutboxCounts, LeadflowError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM outbox GROUP BY status")?;
            let mut counts = OutboxCounts::default();
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (status, n) = row?;
                let n = n.max(0) as u64;
                match status.as_str() {
                    "pending" => counts.pending = n,
                    "processing" => counts.processing = n,
                    "delivered" => counts.delivered = n,
                    "failed" => counts.failed = n,
                    _ => {}
                }
            }
            Ok(counts)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;

    async fn enqueue(db: &Database, key: &str, max_attempts: i32) -> i64 {
        let key = key.to_string();
        db.connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO outbox (idempotency_key, enquiry_id, payload, max_attempts)
                     VALUES (?1, 'e1', '{}', ?2)",
                    params![key, max_attempts],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(map_tr_err)
            .unwrap()
    }

    #[tokio::test]
    async fn claim_ack_lifecycle() {
        let (db, _dir) = setup_db().await;
        let id = enqueue(&db, "conversion-e1-1", 3).await;

        let entry = claim_next(&db, 300).await.unwrap().unwrap();
        assert_eq!(entry.id, id);
        assert_eq!(entry.status, "processing");
        assert_eq!(entry.idempotency_key, "conversion-e1-1");

        // Claimed entries are not handed out twice.
        assert!(claim_next(&db, 300).await.unwrap().is_none());

        ack(&db, id).await.unwrap();
        let counts = counts(&db).await.unwrap();
        assert_eq!(counts.delivered, 1);
        assert_eq!(counts.processing, 0);
    }

    #[tokio::test]
    async fn failures_retry_until_max_attempts() {
        let (db, _dir) = setup_db().await;
        let id = enqueue(&db, "conversion-e1-2", 2).await;

        claim_next(&db, 300).await.unwrap().unwrap();
        assert_eq!(fail(&db, id, "503").await.unwrap(), "pending");

        let retry = claim_next(&db, 300).await.unwrap().unwrap();
        assert_eq!(retry.attempts, 1);
        assert_eq!(fail(&db, id, "503").await.unwrap(), "failed");
        assert!(claim_next(&db, 300).await.unwrap().is_none());

        assert_eq!(requeue_failed(&db).await.unwrap(), 1);
        let revived = claim_next(&db, 300).await.unwrap().unwrap();
        assert_eq!(revived.attempts, 0);
        assert_eq!(revived.last_error.as_deref(), Some("503"));
    }

    #[tokio::test]
    async fn expired_lock_is_reclaimed() {
        let (db, _dir) = setup_db().await;
        let id = enqueue(&db, "conversion-e1-3", 5).await;
        claim_next(&db, 300).await.unwrap().unwrap();

        db.connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE outbox SET locked_until = '2000-01-01T00:00:00.000Z' WHERE id = ?1",
                    params![id],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
            .unwrap();

        let reclaimed = claim_next(&db, 300).await.unwrap().unwrap();
        assert_eq!(reclaimed.id, id);
    }
}
