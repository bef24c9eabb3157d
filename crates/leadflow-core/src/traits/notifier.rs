// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound notification sent to the automation webhook on conversion.

use async_trait::async_trait;

use crate::error::LeadflowError;
use crate::types::Enquiry;

/// Delivers a converted enquiry to the external automation endpoint.
#[async_trait]
pub trait ConversionNotifier: Send + Sync {
    /// Sends the full enquiry. `idempotency_key` is stable across redeliveries.
    async fn notify_conversion(&self, enquiry: &Enquiry, idempotency_key: &str) -> Result<(), LeadflowError>;
}
