// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity provider consumed by the remote backend for credential checks.

use async_trait::async_trait;

use crate::error::LeadflowError;
use crate::types::IdentityAccount;

/// Client of an external identity provider.
///
/// The provider addresses accounts by email; the remote backend derives that
/// email-shaped login handle from the username.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verifies credentials. Rejection is [`LeadflowError::AuthFailed`].
    async fn sign_in(&self, email: &str, password: &str) -> Result<IdentityAccount, LeadflowError>;

    /// Accounts registered under `email` (zero or one in practice).
    async fn list_accounts_by_email(&self, email: &str) -> Result<Vec<IdentityAccount>, LeadflowError>;

    /// Creates an account with a caller-chosen id.
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        id: &str,
    ) -> Result<IdentityAccount, LeadflowError>;

    /// Replaces the password of an existing account.
    async fn update_account_password(&self, account_id: &str, password: &str) -> Result<(), LeadflowError>;
}
