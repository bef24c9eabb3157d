// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity synchronization between profile records and the identity provider.
//!
//! Every user's login handle is derived from the username, so the same
//! username always resolves to the same identity account.

mod http;

pub use http::HttpIdentityProvider;

use leadflow_core::{IdentityAccount, IdentityProvider, LeadflowError};
use tracing::{debug, info};

/// The email-like handle the identity provider knows a user by.
pub fn login_handle(username: &str, domain: &str) -> String {
    format!("{}@{}", username.trim().to_lowercase(), domain)
}

/// Make sure exactly one identity account exists for `handle` with `password`.
///
/// An existing account keeps its id and gets the new password. Otherwise an
/// account is created with `preferred_id`. The returned account id is the
/// one the profile record must be keyed by.
pub async fn upsert_identity(
    provider: &dyn IdentityProvider,
    handle: &str,
    password: &str,
    preferred_id: &str,
) -> Result<IdentityAccount, LeadflowError> {
    let existing = provider.list_accounts_by_email(handle).await?;
    if let Some(account) = existing.into_iter().next() {
        provider.update_account_password(&account.id, password).await?;
        debug!(account_id = %account.id, "identity password updated");
        return Ok(account);
    }

    let account = provider.create_account(handle, password, preferred_id).await?;
    info!(account_id = %account.id, handle, "identity account created");
    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadflow_test_utils::MockIdentityProvider;

    #[test]
    fn handle_is_normalized() {
        assert_eq!(
            login_handle("  Krishnagiri.Admin ", "leadflow.local"),
            "krishnagiri.admin@leadflow.local"
        );
    }

    #[tokio::test]
    async fn upsert_twice_leaves_one_account() {
        let provider = MockIdentityProvider::new();
        let first = upsert_identity(&provider, "ravi@leadflow.local", "one", "u9")
            .await
            .unwrap();
        let second = upsert_identity(&provider, "ravi@leadflow.local", "two", "u10")
            .await
            .unwrap();

        assert_eq!(first.id, "u9");
        assert_eq!(second.id, "u9");
        assert_eq!(provider.accounts().await.len(), 1);
        provider.sign_in("ravi@leadflow.local", "two").await.unwrap();
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        let provider = MockIdentityProvider::new();
        provider.fail_writes(true);
        let err = upsert_identity(&provider, "ravi@leadflow.local", "one", "u9")
            .await
            .unwrap_err();
        assert!(matches!(err, LeadflowError::External { .. }));
        assert!(provider.accounts().await.is_empty());
    }
}
