// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relational backend for Leadflow.
//!
//! Implements [`leadflow_core::Repository`] over SQLite with embedded
//! refinery migrations, keeps profile records and identity-provider accounts
//! in step, and records closed conversions in an outbox that
//! [`OutboxDispatcher`] drains to the automation webhook.

pub mod database;
pub mod dispatcher;
mod http;
pub mod identity;
pub mod mapping;
pub mod migrations;
pub mod models;
pub mod notifier;
pub mod queries;
pub mod repository;
pub mod telephony;

pub use database::Database;
pub use dispatcher::{DispatchReport, OutboxDispatcher};
pub use identity::{login_handle, upsert_identity, HttpIdentityProvider};
pub use models::{OutboxCounts, OutboxEntry};
pub use notifier::HttpConversionNotifier;
pub use repository::RemoteRepository;
pub use telephony::HttpCallProvider;
