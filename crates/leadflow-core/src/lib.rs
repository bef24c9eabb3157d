// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Leadflow persistence layer.
//!
//! This crate provides the entity model, the error taxonomy, the enquiry
//! pipeline and the repository contract that every backend implements. The
//! rest of the application depends on this crate only.

pub mod error;
pub mod pipeline;
pub mod traits;
pub mod types;
pub mod workflow;

// Re-export key items at crate root for ergonomic imports.
pub use error::LeadflowError;
pub use pipeline::PipelineStage;
pub use types::{
    BackendCapabilities, Branch, CallLog, CallRequest, CallStatusUpdate, Enquiry, HealthStatus,
    HistoryEntry, IdentityAccount, Message, Product, Promotion, QueueItem, QueueStatus, Role,
    StageUpdate, User,
};
pub use workflow::EnquiryWorkflow;

pub use traits::{Backend, CallProvider, ConversionNotifier, IdentityProvider, Repository};
