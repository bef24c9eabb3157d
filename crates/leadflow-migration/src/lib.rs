// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-way migration from the local backend to the remote backend.
//!
//! Records are copied through the repository contract, so the target applies
//! its own invariants (identity sync, SKU resolution, history checks).
//! Re-running a migration converges on the same remote state.

pub mod report;
pub mod service;

pub use report::{Category, CategoryCount, MigrationReport, RecordError};
pub use service::{MigrationOptions, MigrationService};
