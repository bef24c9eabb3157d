// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Repository wrapper that records every operation issued to it.
//!
//! Used to assert what a caller did *not* ask the backend to do, such as a
//! rejected stage transition never reaching storage.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::trace;

use leadflow_core::{
    Backend, BackendCapabilities, Branch, CallLog, CallRequest, CallStatusUpdate, Enquiry,
    HealthStatus, LeadflowError, Message, Product, Promotion, QueueItem, Repository, StageUpdate,
    User,
};

pub struct RecordingRepository {
    inner: Arc<dyn Repository>,
    calls: Mutex<Vec<&'static str>>,
}

impl RecordingRepository {
    pub fn new(inner: Arc<dyn Repository>) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Operation names in the order they were issued.
    pub async fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().await.clone()
    }

    /// Number of times `operation` was issued.
    pub async fn count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| **c == operation)
            .count()
    }

    async fn record(&self, operation: &'static str) {
        trace!(operation, "repository call");
        self.calls.lock().await.push(operation);
    }
}

#[async_trait]
impl Backend for RecordingRepository {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn capabilities(&self) -> BackendCapabilities {
        self.inner.capabilities()
    }

    async fn initialize(&self) -> Result<(), LeadflowError> {
        self.record("initialize").await;
        self.inner.initialize().await
    }

    async fn health_check(&self) -> Result<HealthStatus, LeadflowError> {
        self.record("health_check").await;
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), LeadflowError> {
        self.record("shutdown").await;
        self.inner.shutdown().await
    }
}

#[async_trait]
impl Repository for RecordingRepository {
    async fn get_users(&self) -> Result<Vec<User>, LeadflowError> {
        self.record("get_users").await;
        self.inner.get_users().await
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, LeadflowError> {
        self.record("get_user").await;
        self.inner.get_user(id).await
    }

    async fn add_user(&self, user: &User) -> Result<User, LeadflowError> {
        self.record("add_user").await;
        self.inner.add_user(user).await
    }

    async fn update_user(&self, user: &User) -> Result<User, LeadflowError> {
        self.record("update_user").await;
        self.inner.update_user(user).await
    }

    async fn delete_user(&self, id: &str) -> Result<(), LeadflowError> {
        self.record("delete_user").await;
        self.inner.delete_user(id).await
    }

    async fn login(&self, username: &str, password: &str) -> Result<User, LeadflowError> {
        self.record("login").await;
        self.inner.login(username, password).await
    }

    async fn get_branches(&self) -> Result<Vec<Branch>, LeadflowError> {
        self.record("get_branches").await;
        self.inner.get_branches().await
    }

    async fn add_branch(&self, branch: &Branch) -> Result<Branch, LeadflowError> {
        self.record("add_branch").await;
        self.inner.add_branch(branch).await
    }

    async fn update_branch(&self, branch: &Branch) -> Result<Branch, LeadflowError> {
        self.record("update_branch").await;
        self.inner.update_branch(branch).await
    }

    async fn delete_branch(&self, id: &str) -> Result<(), LeadflowError> {
        self.record("delete_branch").await;
        self.inner.delete_branch(id).await
    }

    async fn get_products(&self) -> Result<Vec<Product>, LeadflowError> {
        self.record("get_products").await;
        self.inner.get_products().await
    }

    async fn add_product(&self, product: &Product) -> Result<Product, LeadflowError> {
        self.record("add_product").await;
        self.inner.add_product(product).await
    }

    async fn update_product(&self, product: &Product) -> Result<Product, LeadflowError> {
        self.record("update_product").await;
        self.inner.update_product(product).await
    }

    async fn delete_product(&self, id: &str) -> Result<(), LeadflowError> {
        self.record("delete_product").await;
        self.inner.delete_product(id).await
    }

    async fn get_enquiries(&self) -> Result<Vec<Enquiry>, LeadflowError> {
        self.record("get_enquiries").await;
        self.inner.get_enquiries().await
    }

    async fn get_enquiry(&self, id: &str) -> Result<Option<Enquiry>, LeadflowError> {
        self.record("get_enquiry").await;
        self.inner.get_enquiry(id).await
    }

    async fn add_enquiry(&self, enquiry: &Enquiry) -> Result<Enquiry, LeadflowError> {
        self.record("add_enquiry").await;
        self.inner.add_enquiry(enquiry).await
    }

    async fn update_enquiry(&self, enquiry: &Enquiry) -> Result<Enquiry, LeadflowError> {
        self.record("update_enquiry").await;
        self.inner.update_enquiry(enquiry).await
    }

    async fn delete_enquiry(&self, id: &str) -> Result<(), LeadflowError> {
        self.record("delete_enquiry").await;
        self.inner.delete_enquiry(id).await
    }

    async fn update_enquiry_stage(
        &self,
        update: &StageUpdate,
    ) -> Result<Option<Enquiry>, LeadflowError> {
        self.record("update_enquiry_stage").await;
        self.inner.update_enquiry_stage(update).await
    }

    async fn get_promotions(&self) -> Result<Vec<Promotion>, LeadflowError> {
        self.record("get_promotions").await;
        self.inner.get_promotions().await
    }

    async fn add_promotion(&self, promotion: &Promotion) -> Result<Promotion, LeadflowError> {
        self.record("add_promotion").await;
        self.inner.add_promotion(promotion).await
    }

    async fn update_promotion(&self, promotion: &Promotion) -> Result<Promotion, LeadflowError> {
        self.record("update_promotion").await;
        self.inner.update_promotion(promotion).await
    }

    async fn delete_promotion(&self, id: &str) -> Result<(), LeadflowError> {
        self.record("delete_promotion").await;
        self.inner.delete_promotion(id).await
    }

    async fn get_messages(&self, user_id: &str) -> Result<Vec<Message>, LeadflowError> {
        self.record("get_messages").await;
        self.inner.get_messages(user_id).await
    }

    async fn send_message(&self, message: &Message) -> Result<Message, LeadflowError> {
        self.record("send_message").await;
        self.inner.send_message(message).await
    }

    async fn mark_message_read(&self, id: &str) -> Result<(), LeadflowError> {
        self.record("mark_message_read").await;
        self.inner.mark_message_read(id).await
    }

    async fn get_queue_items(&self) -> Result<Vec<QueueItem>, LeadflowError> {
        self.record("get_queue_items").await;
        self.inner.get_queue_items().await
    }

    async fn add_queue_item(&self, item: &QueueItem) -> Result<QueueItem, LeadflowError> {
        self.record("add_queue_item").await;
        self.inner.add_queue_item(item).await
    }

    async fn approve_queue_item(&self, id: &str) -> Result<Option<QueueItem>, LeadflowError> {
        self.record("approve_queue_item").await;
        self.inner.approve_queue_item(id).await
    }

    async fn withdraw_queue_item(&self, id: &str) -> Result<Option<QueueItem>, LeadflowError> {
        self.record("withdraw_queue_item").await;
        self.inner.withdraw_queue_item(id).await
    }

    async fn initiate_call(&self, request: &CallRequest) -> Result<CallLog, LeadflowError> {
        self.record("initiate_call").await;
        self.inner.initiate_call(request).await
    }

    async fn record_call_status(
        &self,
        update: &CallStatusUpdate,
    ) -> Result<Option<CallLog>, LeadflowError> {
        self.record("record_call_status").await;
        self.inner.record_call_status(update).await
    }

    async fn get_call_logs(&self, enquiry_id: &str) -> Result<Vec<CallLog>, LeadflowError> {
        self.record("get_call_logs").await;
        self.inner.get_call_logs(enquiry_id).await
    }
}
