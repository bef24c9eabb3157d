// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Staff messaging queries.

use rusqlite::params;

use leadflow_core::{LeadflowError, Message};

use crate::database::{map_tr_err, Database};
use crate::mapping::MESSAGES;

/// Messages a user sent or received, plus broadcasts to their branch (or to everyone).
pub async fn for_user(db: &Database, user_id: &str) -> Result<Vec<Message>, LeadflowError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE sender_id = ?1
                    OR recipient_id = ?1
                    OR (recipient_id IS NULL
                        AND (branch_id IS NULL
                             OR branch_id = (SELECT branch_id FROM users WHERE id = ?1)))
                 ORDER BY created_at, rowid",
                MESSAGES.select_sql()
            ))?;
            let rows = stmt.query_map(params![user_id], |row| MESSAGES.decode(row, 0))?;
            rows.collect::<Result<Vec<Message>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Mark a message read. Unknown ids are [`LeadflowError::NotFound`].
pub async fn mark_read(db: &Database, id: &str) -> Result<(), LeadflowError> {
    let id = id.to_string();
    let lookup = id.clone();
    let changed = db
        .connection()
        .call(move |conn| conn.execute("UPDATE messages SET read = 1 WHERE id = ?1", params![lookup]))
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(LeadflowError::NotFound {
            entity: MESSAGES.entity,
            id,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::USERS;
    use crate::queries::{self, test_support::setup_db};
    use chrono::{Duration, Utc};
    use leadflow_core::{Role, User};

    fn message(id: &str, sender: &str, recipient: Option<&str>, branch: Option<&str>, minutes: i64) -> Message {
        Message {
            id: id.into(),
            sender_id: sender.into(),
            recipient_id: recipient.map(Into::into),
            branch_id: branch.map(Into::into),
            content: format!("message {id}"),
            created_at: Utc::now() + Duration::minutes(minutes),
            read: false,
        }
    }

    #[tokio::test]
    async fn direct_and_broadcast_visibility() {
        let (db, _dir) = setup_db().await;
        queries::insert(
            &db,
            &USERS,
            &User {
                id: "u3".into(),
                username: "kgi.caller".into(),
                role: Role::Caller,
                name: "Arun".into(),
                branch_id: Some("b1".into()),
                password: None,
                password_last_changed: None,
            },
        )
        .await
        .unwrap();

        for m in [
            message("m3", "u2", None, Some("b1"), 3),
            message("m1", "u2", Some("u3"), None, 1),
            message("m2", "u2", None, Some("b4"), 2),
            message("m4", "u1", None, None, 4),
        ] {
            queries::insert(&db, &MESSAGES, &m).await.unwrap();
        }

        let visible = for_user(&db, "u3").await.unwrap();
        let ids: Vec<&str> = visible.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m3", "m4"]);
    }

    #[tokio::test]
    async fn mark_read_unknown_is_not_found() {
        let (db, _dir) = setup_db().await;
        queries::insert(&db, &MESSAGES, &message("m1", "u1", Some("u2"), None, 0))
            .await
            .unwrap();
        mark_read(&db, "m1").await.unwrap();
        let stored: Option<Message> = queries::find(&db, &MESSAGES, "m1").await.unwrap();
        assert!(stored.unwrap().read);
        assert!(matches!(
            mark_read(&db, "m9").await,
            Err(LeadflowError::NotFound { .. })
        ));
    }
}
