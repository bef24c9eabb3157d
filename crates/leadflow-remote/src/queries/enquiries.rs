// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Enquiry operations: joined history reads and transactional stage moves.

use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection};
use serde_json::Value;

use leadflow_core::{Enquiry, HistoryEntry, LeadflowError, StageUpdate};

use crate::database::{map_tr_err, Database};
use crate::mapping::{decode_object, timestamp_text, ENQUIRIES, HISTORY};
use crate::queries::insert_on;

fn select_with_history(filter: &str) -> String {
    format!(
        "SELECT {}, {}, h.seq
         FROM enquiries e
         LEFT JOIN enquiry_history h ON h.enquiry_id = e.id
         {filter}
         ORDER BY e.rowid, h.seq",
        ENQUIRIES.column_list(Some("e")),
        HISTORY.column_list(Some("h")),
    )
}

/// Load enquiries with their history, grouped per enquiry.
pub(crate) fn load(conn: &Connection, id: Option<&str>) -> rusqlite::Result<Vec<Enquiry>> {
    let (sql, args): (String, Vec<String>) = match id {
        Some(id) => (select_with_history("WHERE e.id = ?1"), vec![id.to_string()]),
        None => (select_with_history(""), Vec::new()),
    };

    let width = ENQUIRIES.fields.len();
    let seq_idx = width + HISTORY.fields.len();
    let id_idx = ENQUIRIES.position_of_column("id").unwrap_or(0);

    let mut grouped: Vec<(String, serde_json::Map<String, Value>, Vec<Value>)> = Vec::new();
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(args.iter()))?;
    while let Some(row) = rows.next()? {
        let id: String = row.get(id_idx)?;
        if grouped.last().is_none_or(|(last, ..)| *last != id) {
            grouped.push((id, ENQUIRIES.read_object(row, 0)?, Vec::new()));
        }
        let seq: Option<i64> = row.get(seq_idx)?;
        if seq.is_some()
            && let Some((_, _, history)) = grouped.last_mut()
        {
            history.push(Value::Object(HISTORY.read_object(row, width)?));
        }
    }

    grouped
        .into_iter()
        .map(|(_, mut object, history)| {
            object.insert("history".into(), Value::Array(history));
            decode_object(object, 0)
        })
        .collect()
}

fn insert_history(conn: &Connection, enquiry_id: &str, entry: &HistoryEntry) -> Result<i64, LeadflowError> {
    let mut values = vec![rusqlite::types::Value::Text(enquiry_id.to_string())];
    values.extend(HISTORY.encode(entry)?);
    let placeholders = (1..=values.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    conn.execute(
        &format!(
            "INSERT INTO enquiry_history (enquiry_id, {}) VALUES ({placeholders})",
            HISTORY.column_list(None)
        ),
        params_from_iter(values.iter()),
    )
    .map_err(storage)?;
    Ok(conn.last_insert_rowid())
}

fn storage(e: rusqlite::Error) -> LeadflowError {
    LeadflowError::Storage {
        source: Box::new(e),
    }
}

pub async fn list(db: &Database) -> Result<Vec<Enquiry>, LeadflowError> {
    db.connection()
        .call(|conn| load(conn, None))
        .await
        .map_err(map_tr_err)
}

pub async fn find(db: &Database, id: &str) -> Result<Option<Enquiry>, LeadflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| load(conn, Some(&id)).map(|mut found| found.pop()))
        .await
        .map_err(map_tr_err)
}

/// Insert an enquiry and its history in one transaction.
///
/// The enquiry must already carry its creation history.
pub async fn insert(db: &Database, enquiry: &Enquiry) -> Result<Enquiry, LeadflowError> {
    enquiry.check_history()?;
    let enquiry = enquiry.clone();
    let values = ENQUIRIES.encode(&enquiry)?;
    db.connection()
        .call(move |conn| -> Result<Result<Enquiry, LeadflowError>, rusqlite::Error> {
            let tx = conn.transaction()?;
            if let Err(conflict) = insert_on(&tx, &ENQUIRIES, &ENQUIRIES.insert_sql(), &values)? {
                return Ok(Err(conflict.into_error(&ENQUIRIES)));
            }
            for entry in &enquiry.history {
                if let Err(e) = insert_history(&tx, &enquiry.id, entry) {
                    return Ok(Err(e));
                }
            }
            tx.commit()?;
            Ok(Ok(enquiry))
        })
        .await
        .map_err(map_tr_err)?
}

/// Replace an enquiry's own fields; stage, history and branch stay as stored.
///
/// A missing enquiry is inserted with its creation history.
pub async fn update_fields(db: &Database, enquiry: &Enquiry) -> Result<Enquiry, LeadflowError> {
    let incoming = enquiry.clone();
    db.connection()
        .call(move |conn| -> Result<Result<Enquiry, LeadflowError>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let existing = load(&tx, Some(&incoming.id))?.pop();

            let outcome = (|| {
                let record = match existing {
                    Some(existing) => {
                        if existing.branch_id != incoming.branch_id {
                            return Err(LeadflowError::Validation(format!(
                                "enquiry `{}` cannot move from branch `{}` to `{}`",
                                incoming.id, existing.branch_id, incoming.branch_id
                            )));
                        }
                        let record = Enquiry {
                            pipeline_stage: existing.pipeline_stage,
                            history: existing.history,
                            ..incoming
                        };
                        let values = ENQUIRIES.encode(&record)?;
                        tx.execute(&ENQUIRIES.upsert_sql(), params_from_iter(values.iter()))
                            .map_err(storage)?;
                        record
                    }
                    None => {
                        let record = incoming.with_creation_history()?;
                        let values = ENQUIRIES.encode(&record)?;
                        tx.execute(&ENQUIRIES.insert_sql(), params_from_iter(values.iter()))
                            .map_err(storage)?;
                        for entry in &record.history {
                            insert_history(&tx, &record.id, entry)?;
                        }
                        record
                    }
                };
                Ok(record)
            })();

            if outcome.is_ok() {
                tx.commit()?;
            }
            Ok(outcome)
        })
        .await
        .map_err(map_tr_err)?
}

/// Delete an enquiry and its history.
pub async fn delete(db: &Database, id: &str) -> Result<(), LeadflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM enquiry_history WHERE enquiry_id = ?1", params![id])?;
            tx.execute("DELETE FROM enquiries WHERE id = ?1", params![id])?;
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

/// Move an enquiry to a new stage.
///
/// The stage column, the history row and (for a conversion) the outbox row
/// commit together. Returns `None` when the enquiry does not exist.
pub async fn apply_stage(
    db: &Database,
    update: &StageUpdate,
    outbox_max_attempts: u32,
) -> Result<Option<Enquiry>, LeadflowError> {
    let update = update.clone();
    db.connection()
        .call(move |conn| -> Result<Result<Option<Enquiry>, LeadflowError>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let Some(mut enquiry) = load(&tx, Some(&update.enquiry_id))?.pop() else {
                return Ok(Ok(None));
            };

            let now = Utc::now();
            enquiry.apply_stage(&update, now);

            tx.execute(
                "UPDATE enquiries SET pipeline_stage = ?1, closed_amount = ?2 WHERE id = ?3",
                params![enquiry.pipeline_stage.to_string(), enquiry.closed_amount, enquiry.id],
            )?;

            let Some(entry) = enquiry.history.last() else {
                return Ok(Err(LeadflowError::Internal(
                    "stage update produced no history entry".into(),
                )));
            };
            let seq = match insert_history(&tx, &enquiry.id, entry) {
                Ok(seq) => seq,
                Err(e) => return Ok(Err(e)),
            };

            if enquiry.pipeline_stage.is_conversion() {
                let payload = match serde_json::to_string(&enquiry) {
                    Ok(payload) => payload,
                    Err(e) => return Ok(Err(e.into())),
                };
                tx.execute(
                    "INSERT INTO outbox (idempotency_key, enquiry_id, payload, max_attempts, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                    params![
                        format!("conversion-{}-{seq}", enquiry.id),
                        enquiry.id,
                        payload,
                        outbox_max_attempts,
                        timestamp_text(&now),
                    ],
                )?;
            }

            tx.commit()?;
            Ok(Ok(Some(enquiry)))
        })
        .await
        .map_err(map_tr_err)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;
    use leadflow_core::PipelineStage;

    fn enquiry(id: &str) -> Enquiry {
        Enquiry {
            id: id.into(),
            customer_name: "Selvi".into(),
            customer_phone: "9443000000".into(),
            customer_location: "Shoolagiri".into(),
            product_id: "p1".into(),
            branch_id: "b4".into(),
            purchase_intent: "after harvest".into(),
            pipeline_stage: PipelineStage::New,
            created_by: "u5".into(),
            created_at: Utc::now(),
            closed_amount: None,
            warranty_months: Some(12),
            history: Vec::new(),
        }
        .with_creation_history()
        .unwrap()
    }

    async fn outbox_rows(db: &Database) -> i64 {
        db.connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM outbox", [], |row| row.get(0))
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn insert_and_read_back_with_history() {
        let (db, _dir) = setup_db().await;
        let added = insert(&db, &enquiry("e1")).await.unwrap();
        let loaded = find(&db, "e1").await.unwrap().unwrap();
        assert_eq!(loaded, added);
        assert!(find(&db, "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_enquiry_id_is_rejected() {
        let (db, _dir) = setup_db().await;
        insert(&db, &enquiry("e1")).await.unwrap();
        let err = insert(&db, &enquiry("e1")).await.unwrap_err();
        assert!(err.is_duplicate());
        // The failed insert left no extra history rows behind.
        assert_eq!(find(&db, "e1").await.unwrap().unwrap().history.len(), 1);
    }

    #[tokio::test]
    async fn history_is_grouped_per_enquiry_in_order() {
        let (db, _dir) = setup_db().await;
        insert(&db, &enquiry("e1")).await.unwrap();
        insert(&db, &enquiry("e2")).await.unwrap();
        for stage in [PipelineStage::Qualified, PipelineStage::Forwarded, PipelineStage::Contacted] {
            apply_stage(&db, &StageUpdate::new("e1", stage, "u4"), 5)
                .await
                .unwrap();
        }

        let all = list(&db).await.unwrap();
        assert_eq!(all.len(), 2);
        let stages: Vec<PipelineStage> = all[0].history.iter().map(|h| h.stage).collect();
        assert_eq!(
            stages,
            vec![
                PipelineStage::New,
                PipelineStage::Qualified,
                PipelineStage::Forwarded,
                PipelineStage::Contacted
            ]
        );
        assert_eq!(all[1].history.len(), 1);
        all[0].check_history().unwrap();
    }

    #[tokio::test]
    async fn conversion_writes_outbox_row_in_same_transaction() {
        let (db, _dir) = setup_db().await;
        insert(&db, &enquiry("e1")).await.unwrap();

        apply_stage(&db, &StageUpdate::new("e1", PipelineStage::Delivered, "u4"), 5)
            .await
            .unwrap();
        assert_eq!(outbox_rows(&db).await, 0);

        let converted = apply_stage(
            &db,
            &StageUpdate::new("e1", PipelineStage::ClosedConverted, "u4").with_closed_amount(45_500.0),
            5,
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(converted.closed_amount, Some(45_500.0));
        assert_eq!(outbox_rows(&db).await, 1);
    }

    #[tokio::test]
    async fn stage_move_on_missing_enquiry_is_none() {
        let (db, _dir) = setup_db().await;
        let result = apply_stage(&db, &StageUpdate::new("ghost", PipelineStage::Qualified, "u1"), 5)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn update_fields_preserves_stage_and_history() {
        let (db, _dir) = setup_db().await;
        insert(&db, &enquiry("e1")).await.unwrap();
        apply_stage(&db, &StageUpdate::new("e1", PipelineStage::Qualified, "u5"), 5)
            .await
            .unwrap();

        let mut edit = find(&db, "e1").await.unwrap().unwrap();
        edit.customer_phone = "9443111111".into();
        edit.pipeline_stage = PipelineStage::New;
        edit.history.clear();
        let stored = update_fields(&db, &edit).await.unwrap();

        assert_eq!(stored.pipeline_stage, PipelineStage::Qualified);
        assert_eq!(find(&db, "e1").await.unwrap().unwrap(), stored);
    }

    #[tokio::test]
    async fn delete_removes_history() {
        let (db, _dir) = setup_db().await;
        insert(&db, &enquiry("e1")).await.unwrap();
        delete(&db, "e1").await.unwrap();
        delete(&db, "e1").await.unwrap();

        let orphans: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM enquiry_history", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }
}
