// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call-initiation provider.

use async_trait::async_trait;

use crate::error::LeadflowError;
use crate::types::{CallLog, CallRequest};

/// Places a bridged call and returns the provider's call record.
#[async_trait]
pub trait CallProvider: Send + Sync {
    async fn initiate_call(&self, request: &CallRequest) -> Result<CallLog, LeadflowError>;
}
