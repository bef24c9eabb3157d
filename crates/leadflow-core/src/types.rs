// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entity model shared by every backend.
//!
//! Field names on the wire are camelCase; these are the contract field names
//! that the remote backend maps onto its snake_case columns.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::LeadflowError;
use crate::pipeline::PipelineStage;

/// Authorization role of a staff account.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Owner,
    BranchAdmin,
    Caller,
}

impl Role {
    /// Owners and branch admins may drive every stage transition.
    pub fn is_administrative(self) -> bool {
        matches!(self, Role::Owner | Role::BranchAdmin)
    }
}

/// A staff account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub name: String,
    #[serde(default)]
    pub branch_id: Option<String>,
    /// Write-time input only. Backends never return it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub password_last_changed: Option<DateTime<Utc>>,
}

impl User {
    /// Checks the role/branch invariant: a branch is required iff the role is not owner.
    pub fn validate(&self) -> Result<(), LeadflowError> {
        if self.username.trim().is_empty() {
            return Err(LeadflowError::Validation("username must not be empty".into()));
        }
        match (self.role, self.branch_id.as_deref()) {
            (Role::Owner, Some(branch)) => Err(LeadflowError::Validation(format!(
                "owner `{}` must not be scoped to branch `{branch}`",
                self.username
            ))),
            (Role::BranchAdmin | Role::Caller, None) => Err(LeadflowError::Validation(format!(
                "{} `{}` requires a branch",
                self.role, self.username
            ))),
            _ => Ok(()),
        }
    }

    /// Returns a copy with the write-only password removed.
    pub fn without_password(mut self) -> Self {
        self.password = None;
        self
    }

    /// Case-insensitive username comparison.
    pub fn has_username(&self, username: &str) -> bool {
        self.username.trim().eq_ignore_ascii_case(username.trim())
    }
}

/// A retail branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub id: String,
    pub name: String,
    pub location: String,
    pub contact_number: String,
    pub active: bool,
}

/// A catalog product, optionally scoped to one branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub name_localized: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub category_localized: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub description_localized: Option<BTreeMap<String, String>>,
    pub price_min: f64,
    pub price_max: f64,
    pub active: bool,
    #[serde(default)]
    pub branch_id: Option<String>,
    #[serde(default)]
    pub specifications: Option<BTreeMap<String, String>>,
}

/// One immutable record of a stage transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub stage: PipelineStage,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A customer enquiry moving through the sales pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enquiry {
    pub id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_location: String,
    pub product_id: String,
    pub branch_id: String,
    pub purchase_intent: String,
    pub pipeline_stage: PipelineStage,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_amount: Option<f64>,
    #[serde(default)]
    pub warranty_months: Option<u32>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl Enquiry {
    /// Ensures the history invariants hold, seeding the creation entry when
    /// the caller supplied none.
    ///
    /// An enquiry arriving with history (for example during migration) keeps
    /// it verbatim, provided its last entry matches `pipeline_stage`.
    pub fn with_creation_history(mut self) -> Result<Self, LeadflowError> {
        if self.history.is_empty() {
            self.history.push(HistoryEntry {
                stage: self.pipeline_stage,
                timestamp: self.created_at,
                user_id: self.created_by.clone(),
                notes: None,
            });
        }
        self.check_history()?;
        Ok(self)
    }

    /// Validates that history is non-empty and ends at the current stage.
    pub fn check_history(&self) -> Result<(), LeadflowError> {
        match self.history.last() {
            None => Err(LeadflowError::Validation(format!(
                "enquiry `{}` has no history",
                self.id
            ))),
            Some(last) if last.stage != self.pipeline_stage => {
                Err(LeadflowError::Validation(format!(
                    "enquiry `{}` is at `{}` but its last history entry is `{}`",
                    self.id, self.pipeline_stage, last.stage
                )))
            }
            Some(_) => Ok(()),
        }
    }

    /// Applies a stage transition in memory: one history entry, new stage.
    pub fn apply_stage(&mut self, update: &StageUpdate, at: DateTime<Utc>) {
        self.pipeline_stage = update.stage;
        if update.closed_amount.is_some() {
            self.closed_amount = update.closed_amount;
        }
        self.history.push(HistoryEntry {
            stage: update.stage,
            timestamp: at,
            user_id: update.user_id.clone(),
            notes: update.notes.clone(),
        });
    }
}

/// Input to [`Repository::update_enquiry_stage`](crate::Repository::update_enquiry_stage).
#[derive(Debug, Clone, PartialEq)]
pub struct StageUpdate {
    pub enquiry_id: String,
    pub stage: PipelineStage,
    pub user_id: String,
    pub notes: Option<String>,
    /// Only meaningful for `Closed-Converted`; never required.
    pub closed_amount: Option<f64>,
}

impl StageUpdate {
    pub fn new(enquiry_id: impl Into<String>, stage: PipelineStage, user_id: impl Into<String>) -> Self {
        Self {
            enquiry_id: enquiry_id.into(),
            stage,
            user_id: user_id.into(),
            notes: None,
            closed_amount: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_closed_amount(mut self, amount: f64) -> Self {
        self.closed_amount = Some(amount);
        self
    }
}

/// A time-boxed catalog promotion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub discount_percent: Option<f64>,
    #[serde(default)]
    pub product_ids: Vec<String>,
    #[serde(default)]
    pub branch_id: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub active: bool,
}

/// An internal staff message. No recipient means a branch broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    #[serde(default)]
    pub recipient_id: Option<String>,
    #[serde(default)]
    pub branch_id: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl Message {
    /// Whether `user_id` sent or receives this message.
    pub fn involves(&self, user_id: &str) -> bool {
        self.sender_id == user_id || self.recipient_id.as_deref() == Some(user_id)
    }
}

/// Status of an outbound customer message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QueueStatus {
    Draft,
    Queued,
    Sent,
}

/// An outbound customer message awaiting staff approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: String,
    pub recipient: String,
    pub message: String,
    pub status: QueueStatus,
    #[serde(default)]
    pub enquiry_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QueueItem {
    /// Items enter as `draft` or `queued`; `sent` is set by the backend only.
    pub fn check_ingest(&self) -> Result<(), LeadflowError> {
        if self.status == QueueStatus::Sent {
            return Err(LeadflowError::InvalidState(format!(
                "queue item `{}` cannot be added as `sent`",
                self.id
            )));
        }
        Ok(())
    }
}

/// A request to bridge a staff phone and a customer phone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    pub enquiry_id: String,
    pub from_number: String,
    pub to_number: String,
    pub branch_id: String,
    pub caller_id: String,
}

/// A call placed through the call-initiation provider, keyed by its call id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallLog {
    pub call_sid: String,
    pub enquiry_id: String,
    pub from_number: String,
    pub to_number: String,
    pub branch_id: String,
    pub caller_id: String,
    pub status: String,
    #[serde(default)]
    pub duration_secs: Option<u32>,
    #[serde(default)]
    pub recording_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inbound status callback from the call provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallStatusUpdate {
    pub call_sid: String,
    pub status: String,
    #[serde(default)]
    pub duration_secs: Option<u32>,
    #[serde(default)]
    pub recording_url: Option<String>,
}

/// An account held by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityAccount {
    pub id: String,
    pub email: String,
}

/// Operations a backend may or may not implement.
///
/// Callers consult these instead of discovering gaps through
/// [`LeadflowError::NotSupported`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackendCapabilities {
    pub delete_product: bool,
    /// Duplicate branch-scoped SKUs are rewritten to `<sku>-<branchId>` once.
    pub sku_auto_resolution: bool,
    pub call_initiation: bool,
    /// Conversions are recorded in an outbox for webhook delivery.
    pub conversion_outbox: bool,
}

/// Health status reported by backend health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Backend is fully operational.
    Healthy,
    /// Backend is operational but experiencing issues.
    Degraded(String),
    /// Backend is not operational.
    Unhealthy(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_enquiry() -> Enquiry {
        Enquiry {
            id: "e1".into(),
            customer_name: "Priya".into(),
            customer_phone: "9800000001".into(),
            customer_location: "Hosur".into(),
            product_id: "p1".into(),
            branch_id: "b1".into(),
            purchase_intent: "this week".into(),
            pipeline_stage: PipelineStage::New,
            created_by: "u3".into(),
            created_at: Utc::now(),
            closed_amount: None,
            warranty_months: None,
            history: Vec::new(),
        }
    }

    #[test]
    fn role_string_forms() {
        assert_eq!(Role::BranchAdmin.to_string(), "branch_admin");
        assert_eq!(Role::from_str("caller").unwrap(), Role::Caller);
        assert_eq!(
            serde_json::to_string(&Role::Owner).unwrap(),
            "\"owner\""
        );
    }

    #[test]
    fn non_owner_requires_branch() {
        let user = User {
            id: "u9".into(),
            username: "ravi".into(),
            role: Role::Caller,
            name: "Ravi".into(),
            branch_id: None,
            password: None,
            password_last_changed: None,
        };
        assert!(matches!(user.validate(), Err(LeadflowError::Validation(_))));

        let scoped = User {
            branch_id: Some("b1".into()),
            ..user
        };
        assert!(scoped.validate().is_ok());
    }

    #[test]
    fn owner_must_not_have_branch() {
        let owner = User {
            id: "u1".into(),
            username: "owner".into(),
            role: Role::Owner,
            name: "Owner".into(),
            branch_id: Some("b1".into()),
            password: None,
            password_last_changed: None,
        };
        assert!(owner.validate().is_err());
    }

    #[test]
    fn password_is_not_serialized_when_absent() {
        let user = User {
            id: "u1".into(),
            username: "owner".into(),
            role: Role::Owner,
            name: "Owner".into(),
            branch_id: None,
            password: None,
            password_last_changed: None,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["branchId"], serde_json::Value::Null);
    }

    #[test]
    fn creation_history_is_seeded() {
        let enquiry = sample_enquiry().with_creation_history().unwrap();
        assert_eq!(enquiry.history.len(), 1);
        assert_eq!(enquiry.history[0].stage, PipelineStage::New);
        assert_eq!(enquiry.history[0].user_id, "u3");
    }

    #[test]
    fn mismatched_history_is_rejected() {
        let mut enquiry = sample_enquiry().with_creation_history().unwrap();
        enquiry.pipeline_stage = PipelineStage::Qualified;
        assert!(enquiry.check_history().is_err());
    }

    #[test]
    fn apply_stage_appends_one_entry() {
        let mut enquiry = sample_enquiry().with_creation_history().unwrap();
        let update = StageUpdate::new("e1", PipelineStage::ClosedConverted, "u2")
            .with_closed_amount(42_000.0);
        enquiry.apply_stage(&update, Utc::now());

        assert_eq!(enquiry.history.len(), 2);
        assert_eq!(enquiry.pipeline_stage, PipelineStage::ClosedConverted);
        assert_eq!(enquiry.closed_amount, Some(42_000.0));
        assert!(enquiry.check_history().is_ok());
    }

    #[test]
    fn message_involvement() {
        let msg = Message {
            id: "m1".into(),
            sender_id: "u1".into(),
            recipient_id: Some("u2".into()),
            branch_id: None,
            content: "hi".into(),
            created_at: Utc::now(),
            read: false,
        };
        assert!(msg.involves("u1"));
        assert!(msg.involves("u2"));
        assert!(!msg.involves("u3"));
    }
}
