// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types that exist only in the remote schema.

use serde::{Deserialize, Serialize};

/// A conversion notification awaiting webhook delivery.
///
/// Status moves `pending` → `processing` → `delivered`, or back to `pending`
/// on a failed attempt until `max_attempts` is reached, then `failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: i64,
    pub idempotency_key: String,
    pub enquiry_id: String,
    /// JSON of the enquiry as it was when the conversion committed.
    pub payload: String,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Outbox row counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutboxCounts {
    pub pending: u64,
    pub processing: u64,
    pub delivered: u64,
    pub failed: u64,
}
