// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory identity provider.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use leadflow_core::{IdentityAccount, IdentityProvider, LeadflowError};

#[derive(Debug, Clone)]
struct Account {
    account: IdentityAccount,
    password: String,
}

/// An identity provider that keeps accounts in memory.
///
/// Emails match case-insensitively. [`fail_writes`](Self::fail_writes)
/// makes account creation and password changes fail with an external error.
#[derive(Clone, Default)]
pub struct MockIdentityProvider {
    accounts: Arc<Mutex<Vec<Account>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account directly, bypassing failure injection.
    pub async fn seed(&self, email: &str, password: &str, id: &str) {
        self.accounts.lock().await.push(Account {
            account: IdentityAccount {
                id: id.to_string(),
                email: email.to_string(),
            },
            password: password.to_string(),
        });
    }

    /// Every account currently held.
    pub async fn accounts(&self) -> Vec<IdentityAccount> {
        self.accounts
            .lock()
            .await
            .iter()
            .map(|a| a.account.clone())
            .collect()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), LeadflowError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LeadflowError::external("identity provider", "service unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<IdentityAccount, LeadflowError> {
        self.accounts
            .lock()
            .await
            .iter()
            .find(|a| a.account.email.eq_ignore_ascii_case(email) && a.password == password)
            .map(|a| a.account.clone())
            .ok_or_else(|| LeadflowError::AuthFailed("invalid username or password".into()))
    }

    async fn list_accounts_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<IdentityAccount>, LeadflowError> {
        Ok(self
            .accounts
            .lock()
            .await
            .iter()
            .filter(|a| a.account.email.eq_ignore_ascii_case(email))
            .map(|a| a.account.clone())
            .collect())
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
        id: &str,
    ) -> Result<IdentityAccount, LeadflowError> {
        self.check_writable()?;
        let mut accounts = self.accounts.lock().await;
        if accounts
            .iter()
            .any(|a| a.account.email.eq_ignore_ascii_case(email))
        {
            return Err(LeadflowError::DuplicateKey {
                entity: "identity account",
                key: email.to_string(),
            });
        }
        let account = IdentityAccount {
            id: id.to_string(),
            email: email.to_string(),
        };
        accounts.push(Account {
            account: account.clone(),
            password: password.to_string(),
        });
        Ok(account)
    }

    async fn update_account_password(
        &self,
        account_id: &str,
        password: &str,
    ) -> Result<(), LeadflowError> {
        self.check_writable()?;
        let mut accounts = self.accounts.lock().await;
        let account = accounts
            .iter_mut()
            .find(|a| a.account.id == account_id)
            .ok_or_else(|| LeadflowError::NotFound {
                entity: "identity account",
                id: account_id.to_string(),
            })?;
        account.password = password.to_string();
        Ok(())
    }
}
