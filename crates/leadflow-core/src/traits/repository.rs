// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The repository contract: the only persistence API the application uses.
//!
//! Contract-level guarantees, shared by every backend:
//!
//! - `get_*` returns a snapshot with no null slots.
//! - `add_*` fails with [`LeadflowError::DuplicateKey`] when the natural key
//!   exists, unless [`BackendCapabilities::sku_auto_resolution`] applies.
//!   It returns the record as stored.
//! - `update_*` is an upsert-by-id that replaces the whole record.
//!   Callers merge fields before calling.
//! - `delete_*` is idempotent.
//! - Lookup misses are `Ok(None)`, never an error.
//!
//! [`BackendCapabilities::sku_auto_resolution`]: crate::types::BackendCapabilities

use async_trait::async_trait;

use crate::error::LeadflowError;
use crate::traits::backend::Backend;
use crate::types::{
    Branch, CallLog, CallRequest, CallStatusUpdate, Enquiry, Message, Product, Promotion,
    QueueItem, StageUpdate, User,
};

#[async_trait]
pub trait Repository: Backend {
    // --- Users ---

    async fn get_users(&self) -> Result<Vec<User>, LeadflowError>;

    async fn get_user(&self, id: &str) -> Result<Option<User>, LeadflowError>;

    /// Usernames are unique case-insensitively.
    async fn add_user(&self, user: &User) -> Result<User, LeadflowError>;

    /// A `password` on the input is treated as a password change.
    async fn update_user(&self, user: &User) -> Result<User, LeadflowError>;

    async fn delete_user(&self, id: &str) -> Result<(), LeadflowError>;

    /// Returns the profile of the authenticated user, or
    /// [`LeadflowError::AuthFailed`].
    async fn login(&self, username: &str, password: &str) -> Result<User, LeadflowError>;

    // --- Branches ---

    async fn get_branches(&self) -> Result<Vec<Branch>, LeadflowError>;

    async fn add_branch(&self, branch: &Branch) -> Result<Branch, LeadflowError>;

    async fn update_branch(&self, branch: &Branch) -> Result<Branch, LeadflowError>;

    /// Also deletes every `branch_admin` scoped to the branch.
    async fn delete_branch(&self, id: &str) -> Result<(), LeadflowError>;

    // --- Products ---

    async fn get_products(&self) -> Result<Vec<Product>, LeadflowError>;

    async fn add_product(&self, product: &Product) -> Result<Product, LeadflowError>;

    async fn update_product(&self, product: &Product) -> Result<Product, LeadflowError>;

    /// Check [`BackendCapabilities::delete_product`](crate::types::BackendCapabilities)
    /// first; unsupported backends return [`LeadflowError::NotSupported`].
    async fn delete_product(&self, id: &str) -> Result<(), LeadflowError>;

    // --- Enquiries ---

    /// Every enquiry carries its full history in chronological order.
    async fn get_enquiries(&self) -> Result<Vec<Enquiry>, LeadflowError>;

    async fn get_enquiry(&self, id: &str) -> Result<Option<Enquiry>, LeadflowError>;

    /// Seeds the creation history entry when the input has none.
    async fn add_enquiry(&self, enquiry: &Enquiry) -> Result<Enquiry, LeadflowError>;

    /// Replaces the enquiry's own fields. `branch_id` and `history` are
    /// immutable through this call; use
    /// [`update_enquiry_stage`](Repository::update_enquiry_stage) for stage moves.
    async fn update_enquiry(&self, enquiry: &Enquiry) -> Result<Enquiry, LeadflowError>;

    /// Hard-deletes the enquiry and its history.
    async fn delete_enquiry(&self, id: &str) -> Result<(), LeadflowError>;

    /// Sets the stage and appends exactly one history entry.
    ///
    /// Any stage is accepted; role checks belong to the caller. Returns the
    /// updated enquiry, or `None` when the id is unknown.
    async fn update_enquiry_stage(&self, update: &StageUpdate) -> Result<Option<Enquiry>, LeadflowError>;

    // --- Promotions ---

    async fn get_promotions(&self) -> Result<Vec<Promotion>, LeadflowError>;

    async fn add_promotion(&self, promotion: &Promotion) -> Result<Promotion, LeadflowError>;

    async fn update_promotion(&self, promotion: &Promotion) -> Result<Promotion, LeadflowError>;

    async fn delete_promotion(&self, id: &str) -> Result<(), LeadflowError>;

    // --- Staff messaging ---

    /// Messages sent or received by `user_id`, oldest first.
    async fn get_messages(&self, user_id: &str) -> Result<Vec<Message>, LeadflowError>;

    async fn send_message(&self, message: &Message) -> Result<Message, LeadflowError>;

    async fn mark_message_read(&self, id: &str) -> Result<(), LeadflowError>;

    // --- Outbound message queue ---

    async fn get_queue_items(&self) -> Result<Vec<QueueItem>, LeadflowError>;

    /// Ingests an item created by the external automation.
    ///
    /// An item already marked `sent` is [`LeadflowError::InvalidState`].
    async fn add_queue_item(&self, item: &QueueItem) -> Result<QueueItem, LeadflowError>;

    /// `draft` → `queued`. Other source states are [`LeadflowError::InvalidState`].
    async fn approve_queue_item(&self, id: &str) -> Result<Option<QueueItem>, LeadflowError>;

    /// `queued` → `draft`. Other source states are [`LeadflowError::InvalidState`].
    async fn withdraw_queue_item(&self, id: &str) -> Result<Option<QueueItem>, LeadflowError>;

    // --- Calls ---

    async fn initiate_call(&self, request: &CallRequest) -> Result<CallLog, LeadflowError>;

    /// Applies the provider's status callback. Unknown call ids return `None`.
    async fn record_call_status(&self, update: &CallStatusUpdate) -> Result<Option<CallLog>, LeadflowError>;

    async fn get_call_logs(&self, enquiry_id: &str) -> Result<Vec<CallLog>, LeadflowError>;
}
