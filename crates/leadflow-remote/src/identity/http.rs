// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the hosted identity provider.
//!
//! Speaks a GoTrue-style API: password grants at `/token`, account
//! administration under `/admin/users` authorized by the service key.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use leadflow_config::model::IdentityConfig;
use leadflow_core::{IdentityAccount, IdentityProvider, LeadflowError};

use crate::http::{build_client, endpoint, json_body, request_failed, unexpected_status};

const SERVICE: &str = "identity provider";

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    user: IdentityAccount,
}

#[derive(Deserialize)]
struct AccountList {
    #[serde(default)]
    users: Vec<IdentityAccount>,
}

#[derive(Serialize)]
struct NewAccount<'a> {
    id: &'a str,
    email: &'a str,
    password: &'a str,
    email_confirm: bool,
}

#[derive(Serialize)]
struct PasswordChange<'a> {
    password: &'a str,
}

/// [`IdentityProvider`] backed by the identity service's REST API.
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIdentityProvider {
    /// Creates a provider from the identity section of the configuration.
    ///
    /// Both `base_url` and `service_key` must be set.
    pub fn new(config: &IdentityConfig) -> Result<Self, LeadflowError> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| LeadflowError::Config("identity.base_url is not set".into()))?;
        let service_key = config
            .service_key
            .as_deref()
            .ok_or_else(|| LeadflowError::Config("identity.service_key is not set".into()))?;

        let client = build_client(SERVICE, config.timeout_secs, Some(service_key))?;
        Ok(Self { client, base_url })
    }

    /// Points the provider at a different base URL (for mock servers).
    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<IdentityAccount, LeadflowError> {
        let url = endpoint(SERVICE, &self.base_url, "token", &[("grant_type", "password")])?;
        let response = self
            .client
            .post(url)
            .json(&PasswordGrant { email, password })
            .send()
            .await
            .map_err(|e| request_failed(SERVICE, e))?;

        match response.status() {
            status if status.is_success() => {
                let token: TokenResponse = json_body(SERVICE, response).await?;
                debug!(account_id = %token.user.id, "identity sign-in succeeded");
                Ok(token.user)
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Err(LeadflowError::AuthFailed(
                "invalid username or password".into(),
            )),
            _ => Err(unexpected_status(SERVICE, response).await),
        }
    }

    async fn list_accounts_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<IdentityAccount>, LeadflowError> {
        let url = endpoint(SERVICE, &self.base_url, "admin/users", &[("email", email)])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_failed(SERVICE, e))?;
        if !response.status().is_success() {
            return Err(unexpected_status(SERVICE, response).await);
        }

        // The filter parameter is advisory on some deployments.
        let list: AccountList = json_body(SERVICE, response).await?;
        Ok(list
            .users
            .into_iter()
            .filter(|account| account.email.eq_ignore_ascii_case(email))
            .collect())
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
        id: &str,
    ) -> Result<IdentityAccount, LeadflowError> {
        let url = endpoint(SERVICE, &self.base_url, "admin/users", &[])?;
        let response = self
            .client
            .post(url)
            .json(&NewAccount {
                id,
                email,
                password,
                email_confirm: true,
            })
            .send()
            .await
            .map_err(|e| request_failed(SERVICE, e))?;

        match response.status() {
            status if status.is_success() => json_body(SERVICE, response).await,
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(LeadflowError::DuplicateKey {
                    entity: "identity account",
                    key: email.to_string(),
                })
            }
            _ => Err(unexpected_status(SERVICE, response).await),
        }
    }

    async fn update_account_password(
        &self,
        account_id: &str,
        password: &str,
    ) -> Result<(), LeadflowError> {
        let url = endpoint(
            SERVICE,
            &self.base_url,
            &format!("admin/users/{account_id}"),
            &[],
        )?;
        let response = self
            .client
            .put(url)
            .json(&PasswordChange { password })
            .send()
            .await
            .map_err(|e| request_failed(SERVICE, e))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(LeadflowError::NotFound {
                entity: "identity account",
                id: account_id.to_string(),
            }),
            _ => Err(unexpected_status(SERVICE, response).await),
        }
    }
}
