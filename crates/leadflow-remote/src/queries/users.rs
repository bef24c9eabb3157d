// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User profile statements beyond plain CRUD.

use rusqlite::{params, OptionalExtension};

use leadflow_core::{LeadflowError, Role, User};

use crate::database::{map_tr_err, Database};
use crate::mapping::{timestamp_text, USERS};

/// Look up a profile by username, ignoring case.
pub async fn find_by_username(db: &Database, username: &str) -> Result<Option<User>, LeadflowError> {
    let username = username.trim().to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("{} WHERE username = ?1 COLLATE NOCASE", USERS.select_sql()),
                params![username],
                |row| USERS.decode(row, 0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Move a profile to a new id, typically the identity account id.
pub async fn rekey(db: &Database, from: &str, to: &str) -> Result<(), LeadflowError> {
    let (from, to) = (from.to_string(), to.to_string());
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute("UPDATE users SET id = ?1 WHERE id = ?2", params![to, from])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Stamp a successful password change.
pub async fn touch_password_changed(
    db: &Database,
    id: &str,
    at: chrono::DateTime<chrono::Utc>,
) -> Result<(), LeadflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE users SET password_last_changed = ?1 WHERE id = ?2",
                params![timestamp_text(&at), id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a branch and every branch admin scoped to it. Returns the number of admins removed.
pub async fn delete_branch_cascade(db: &Database, branch_id: &str) -> Result<usize, LeadflowError> {
    let branch_id = branch_id.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let tx = conn.transaction()?;
            let removed = tx.execute(
                "DELETE FROM users WHERE role = ?1 AND branch_id = ?2",
                params![Role::BranchAdmin.to_string(), branch_id],
            )?;
            tx.execute("DELETE FROM branches WHERE id = ?1", params![branch_id])?;
            tx.commit()?;
            Ok(removed)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::BRANCHES;
    use crate::queries::{self, test_support::setup_db};
    use leadflow_core::Branch;

    fn user(id: &str, username: &str, role: Role, branch: Option<&str>) -> User {
        User {
            id: id.into(),
            username: username.into(),
            role,
            name: username.into(),
            branch_id: branch.map(Into::into),
            password: None,
            password_last_changed: None,
        }
    }

    #[tokio::test]
    async fn username_lookup_and_uniqueness_ignore_case() {
        let (db, _dir) = setup_db().await;
        queries::insert(&db, &USERS, &user("u2", "hosur.admin", Role::BranchAdmin, Some("b4")))
            .await
            .unwrap();

        let found = find_by_username(&db, "  Hosur.Admin ").await.unwrap();
        assert_eq!(found.unwrap().id, "u2");

        let err = queries::insert(&db, &USERS, &user("u9", "HOSUR.ADMIN", Role::Caller, Some("b4")))
            .await
            .unwrap_err();
        assert!(matches!(err, LeadflowError::DuplicateKey { ref key, .. } if key == "HOSUR.ADMIN"));
    }

    #[tokio::test]
    async fn branch_delete_cascades_to_admins_only() {
        let (db, _dir) = setup_db().await;
        queries::insert(
            &db,
            &BRANCHES,
            &Branch {
                id: "b4".into(),
                name: "Hosur".into(),
                location: "Bagalur Road".into(),
                contact_number: "04344".into(),
                active: true,
            },
        )
        .await
        .unwrap();
        for u in [
            user("u4", "hosur.admin", Role::BranchAdmin, Some("b4")),
            user("u5", "hosur.caller", Role::Caller, Some("b4")),
            user("u2", "kgi.admin", Role::BranchAdmin, Some("b1")),
        ] {
            queries::insert(&db, &USERS, &u).await.unwrap();
        }

        assert_eq!(delete_branch_cascade(&db, "b4").await.unwrap(), 1);
        let remaining: Vec<User> = queries::list(&db, &USERS).await.unwrap();
        let ids: Vec<&str> = remaining.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["u5", "u2"]);
        assert_eq!(delete_branch_cascade(&db, "b4").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rekey_moves_profile() {
        let (db, _dir) = setup_db().await;
        queries::insert(&db, &USERS, &user("tmp", "salem.caller", Role::Caller, Some("b3")))
            .await
            .unwrap();
        rekey(&db, "tmp", "acct-42").await.unwrap();

        let moved: Option<User> = queries::find(&db, &USERS, "acct-42").await.unwrap();
        assert_eq!(moved.unwrap().username, "salem.caller");
    }
}
