// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call provider returning synthetic call ids.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use leadflow_core::{CallLog, CallProvider, CallRequest, LeadflowError};

#[derive(Clone, Default)]
pub struct MockCallProvider {
    placed: Arc<AtomicUsize>,
}

impl MockCallProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls placed so far.
    pub fn placed(&self) -> usize {
        self.placed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CallProvider for MockCallProvider {
    async fn initiate_call(&self, request: &CallRequest) -> Result<CallLog, LeadflowError> {
        let n = self.placed.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Utc::now();
        Ok(CallLog {
            call_sid: format!("CA-mock-{n}"),
            enquiry_id: request.enquiry_id.clone(),
            from_number: request.from_number.clone(),
            to_number: request.to_number.clone(),
            branch_id: request.branch_id.clone(),
            caller_id: request.caller_id.clone(),
            status: "queued".into(),
            duration_secs: None,
            recording_url: None,
            created_at: now,
            updated_at: now,
        })
    }
}
