// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call log queries.

use chrono::Utc;
use rusqlite::params;

use leadflow_core::{CallLog, CallStatusUpdate, LeadflowError};

use crate::database::{map_tr_err, Database};
use crate::mapping::{timestamp_text, CALL_LOGS};
use crate::queries::load_one;

/// Calls placed for an enquiry, oldest first.
pub async fn for_enquiry(db: &Database, enquiry_id: &str) -> Result<Vec<CallLog>, LeadflowError> {
    let enquiry_id = enquiry_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<CallLog>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE enquiry_id = ?1 ORDER BY created_at, rowid",
                CALL_LOGS.select_sql()
            ))?;
            let rows = stmt.query_map(params![enquiry_id], |row| CALL_LOGS.decode(row, 0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Apply a provider status callback. Unknown call ids return `None`.
///
/// Absent duration or recording fields keep their stored values.
pub async fn apply_status(
    db: &Database,
    update: &CallStatusUpdate,
) -> Result<Option<CallLog>, LeadflowError> {
    let update = update.clone();
    db.connection()
        .call(move |conn| -> Result<Option<CallLog>, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE call_logs
                 SET status = ?1,
                     duration_secs = COALESCE(?2, duration_secs),
                     recording_url = COALESCE(?3, recording_url),
                     updated_at = ?4
                 WHERE call_sid = ?5",
                params![
                    update.status,
                    update.duration_secs,
                    update.recording_url,
                    timestamp_text(&Utc::now()),
                    update.call_sid,
                ],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            load_one(conn, &CALL_LOGS, &update.call_sid)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::{self, test_support::setup_db};

    fn log(sid: &str) -> CallLog {
        let now = Utc::now();
        CallLog {
            call_sid: sid.into(),
            enquiry_id: "e1".into(),
            from_number: "9000000001".into(),
            to_number: "9443000000".into(),
            branch_id: "b1".into(),
            caller_id: "u3".into(),
            status: "queued".into(),
            duration_secs: None,
            recording_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn status_callback_updates_log() {
        let (db, _dir) = setup_db().await;
        queries::insert(&db, &CALL_LOGS, &log("CA1")).await.unwrap();

        let updated = apply_status(
            &db,
            &CallStatusUpdate {
                call_sid: "CA1".into(),
                status: "completed".into(),
                duration_secs: Some(95),
                recording_url: Some("https://rec.example.com/CA1.mp3".into()),
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(updated.status, "completed");
        assert_eq!(updated.duration_secs, Some(95));

        // A later callback without a duration keeps the stored one.
        let again = apply_status(
            &db,
            &CallStatusUpdate {
                call_sid: "CA1".into(),
                status: "archived".into(),
                duration_secs: None,
                recording_url: None,
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(again.duration_secs, Some(95));
        assert_eq!(for_enquiry(&db, "e1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_call_is_none() {
        let (db, _dir) = setup_db().await;
        let result = apply_status(
            &db,
            &CallStatusUpdate {
                call_sid: "CA404".into(),
                status: "completed".into(),
                duration_secs: None,
                recording_url: None,
            },
        )
        .await
        .unwrap();
        assert!(result.is_none());
    }
}
