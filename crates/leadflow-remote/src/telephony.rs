// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Click-to-call through the telephony provider.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use leadflow_config::model::TelephonyConfig;
use leadflow_core::{CallLog, CallProvider, CallRequest, LeadflowError};

use crate::http::{build_client, endpoint, json_body, request_failed, unexpected_status};

const SERVICE: &str = "telephony provider";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallCreated {
    call_sid: String,
    #[serde(default = "initial_status")]
    status: String,
}

fn initial_status() -> String {
    "queued".to_string()
}

/// [`CallProvider`] that asks the provider to bridge two numbers.
pub struct HttpCallProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCallProvider {
    /// Returns `Ok(None)` when no provider endpoint is configured.
    pub fn from_config(config: &TelephonyConfig) -> Result<Option<Self>, LeadflowError> {
        let Some(base_url) = config.base_url.clone() else {
            return Ok(None);
        };
        let client = build_client(SERVICE, config.timeout_secs, config.api_key.as_deref())?;
        Ok(Some(Self { client, base_url }))
    }
}

#[async_trait]
impl CallProvider for HttpCallProvider {
    async fn initiate_call(&self, request: &CallRequest) -> Result<CallLog, LeadflowError> {
        let url = endpoint(SERVICE, &self.base_url, "calls", &[])?;
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| request_failed(SERVICE, e))?;
        if !response.status().is_success() {
            return Err(unexpected_status(SERVICE, response).await);
        }

        let created: CallCreated = json_body(SERVICE, response).await?;
        info!(call_sid = %created.call_sid, enquiry_id = %request.enquiry_id, "call initiated");

        let now = Utc::now();
        Ok(CallLog {
            call_sid: created.call_sid,
            enquiry_id: request.enquiry_id.clone(),
            from_number: request.from_number.clone(),
            to_number: request.to_number.clone(),
            branch_id: request.branch_id.clone(),
            caller_id: request.caller_id.clone(),
            status: created.status,
            duration_secs: None,
            recording_url: None,
            created_at: now,
            updated_at: now,
        })
    }
}
