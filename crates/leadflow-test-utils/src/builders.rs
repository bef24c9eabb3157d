// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sample entities for tests.
//!
//! Every builder returns a fully valid record; tests override the fields
//! they care about with struct update syntax.

use chrono::{Duration, Utc};

use leadflow_core::{
    Branch, CallRequest, Enquiry, Message, PipelineStage, Product, Promotion, QueueItem,
    QueueStatus, Role, User,
};

pub fn user(id: &str, username: &str, role: Role, branch_id: Option<&str>) -> User {
    User {
        id: id.into(),
        username: username.into(),
        role,
        name: username.replace('.', " "),
        branch_id: branch_id.map(Into::into),
        password: None,
        password_last_changed: None,
    }
}

pub fn branch(id: &str, name: &str) -> Branch {
    Branch {
        id: id.into(),
        name: name.into(),
        location: format!("{name} main road"),
        contact_number: "04343 220000".into(),
        active: true,
    }
}

pub fn product(id: &str, sku: &str, branch_id: Option<&str>) -> Product {
    Product {
        id: id.into(),
        sku: sku.into(),
        name: "Power Weeder 7HP".into(),
        category: "Power Weeder".into(),
        description: "Petrol power weeder with rotary tines".into(),
        name_localized: None,
        category_localized: None,
        description_localized: None,
        price_min: 42_000.0,
        price_max: 48_000.0,
        active: true,
        branch_id: branch_id.map(Into::into),
        specifications: None,
    }
}

/// A fresh enquiry with no history; backends seed the creation entry.
pub fn enquiry(id: &str, branch_id: &str, created_by: &str) -> Enquiry {
    Enquiry {
        id: id.into(),
        customer_name: "Arumugam".into(),
        customer_phone: "9443012345".into(),
        customer_location: "Kaveripattinam".into(),
        product_id: "p1".into(),
        branch_id: branch_id.into(),
        purchase_intent: "before monsoon".into(),
        pipeline_stage: PipelineStage::New,
        created_by: created_by.into(),
        created_at: Utc::now(),
        closed_amount: None,
        warranty_months: None,
        history: Vec::new(),
    }
}

pub fn promotion(id: &str, branch_id: Option<&str>) -> Promotion {
    let now = Utc::now();
    Promotion {
        id: id.into(),
        title: "Pongal offer".into(),
        description: "Free service kit with every weeder".into(),
        discount_percent: Some(5.0),
        product_ids: vec!["p1".into()],
        branch_id: branch_id.map(Into::into),
        starts_at: now,
        ends_at: now + Duration::days(14),
        active: true,
    }
}

pub fn message(id: &str, sender_id: &str, recipient_id: Option<&str>, branch_id: Option<&str>) -> Message {
    Message {
        id: id.into(),
        sender_id: sender_id.into(),
        recipient_id: recipient_id.map(Into::into),
        branch_id: branch_id.map(Into::into),
        content: "Demo unit is back at the branch".into(),
        created_at: Utc::now(),
        read: false,
    }
}

pub fn queue_item(id: &str, status: QueueStatus) -> QueueItem {
    let now = Utc::now();
    QueueItem {
        id: id.into(),
        recipient: "9443012345".into(),
        message: "Your demo is confirmed for Saturday".into(),
        status,
        enquiry_id: Some("e1".into()),
        created_at: now,
        updated_at: now,
    }
}

pub fn call_request(enquiry_id: &str) -> CallRequest {
    CallRequest {
        enquiry_id: enquiry_id.into(),
        from_number: "9800000100".into(),
        to_number: "9443012345".into(),
        branch_id: "b1".into(),
        caller_id: "u3".into(),
    }
}
