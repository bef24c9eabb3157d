// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound message queue status transitions.

use chrono::Utc;
use rusqlite::params;

use leadflow_core::{LeadflowError, QueueItem, QueueStatus};

use crate::database::{map_tr_err, Database};
use crate::mapping::{timestamp_text, QUEUE};
use crate::queries::load_one;

/// Move a queue item from `from` to `to`.
///
/// Returns `None` for an unknown id and [`LeadflowError::InvalidState`] when
/// the item is not currently in `from`.
pub async fn transition(
    db: &Database,
    id: &str,
    from: QueueStatus,
    to: QueueStatus,
) -> Result<Option<QueueItem>, LeadflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Result<Option<QueueItem>, LeadflowError>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let Some(mut item) = load_one::<QueueItem>(&tx, &QUEUE, &id)? else {
                return Ok(Ok(None));
            };
            if item.status != from {
                return Ok(Err(LeadflowError::InvalidState(format!(
                    "queue item `{id}` is `{}`, expected `{from}`",
                    item.status
                ))));
            }

            item.status = to;
            item.updated_at = Utc::now();
            tx.execute(
                "UPDATE message_queue SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![to.to_string(), timestamp_text(&item.updated_at), id],
            )?;
            tx.commit()?;
            Ok(Ok(Some(item)))
        })
        .await
        .map_err(map_tr_err)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::{self, test_support::setup_db};

    async fn seed(db: &Database, status: QueueStatus) {
        let now = Utc::now();
        queries::insert(
            db,
            &QUEUE,
            &QueueItem {
                id: "q1".into(),
                recipient: "9443000000".into(),
                message: "Demo on Saturday 10am".into(),
                status,
                enquiry_id: None,
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn draft_to_queued_to_sent() {
        let (db, _dir) = setup_db().await;
        seed(&db, QueueStatus::Draft).await;

        let queued = transition(&db, "q1", QueueStatus::Draft, QueueStatus::Queued)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(queued.status, QueueStatus::Queued);

        let sent = transition(&db, "q1", QueueStatus::Queued, QueueStatus::Sent)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sent.status, QueueStatus::Sent);

        let stored: Option<QueueItem> = queries::find(&db, &QUEUE, "q1").await.unwrap();
        assert_eq!(stored.unwrap().status, QueueStatus::Sent);
    }

    #[tokio::test]
    async fn wrong_source_status_is_invalid_state() {
        let (db, _dir) = setup_db().await;
        seed(&db, QueueStatus::Sent).await;
        assert!(matches!(
            transition(&db, "q1", QueueStatus::Queued, QueueStatus::Draft).await,
            Err(LeadflowError::InvalidState(_))
        ));
        assert!(transition(&db, "q404", QueueStatus::Draft, QueueStatus::Queued)
            .await
            .unwrap()
            .is_none());
    }
}
