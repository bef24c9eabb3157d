// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `leadflow migrate` command implementation.
//!
//! Copies branches, products, users and enquiries from the local backend
//! into the remote backend, whichever backend is active.

use leadflow_config::LeadflowConfig;
use leadflow_core::{Backend, LeadflowError};
use leadflow_migration::{Category, MigrationOptions, MigrationReport, MigrationService};
use strum::IntoEnumIterator;
use tracing::info;

use crate::backend;

/// Run the `leadflow migrate` command.
pub async fn run_migrate(
    config: &LeadflowConfig,
    dry_run: bool,
    json: bool,
) -> Result<(), LeadflowError> {
    let local = backend::open_local(config).await?;
    let remote = backend::open_remote(config).await?;

    let service = MigrationService::new(local.clone(), remote.clone());
    let report = service.run(MigrationOptions { dry_run }).await;

    remote.shutdown().await?;
    local.shutdown().await?;
    let report = report?;

    info!(
        dry_run,
        migrated = report.total_migrated(),
        errors = report.errors.len(),
        "migration finished"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_report(&report));
    }

    if report.is_clean() {
        Ok(())
    } else {
        Err(LeadflowError::Internal(format!(
            "{} record(s) failed to migrate",
            report.errors.len()
        )))
    }
}

fn render_report(report: &MigrationReport) -> String {
    let mut out = String::new();
    let verb = if report.dry_run { "would migrate" } else { "migrated" };
    for category in Category::iter() {
        let count = report.count(category);
        out.push_str(&format!(
            "{:<10} {verb} {}, already present {}\n",
            category.to_string(),
            count.migrated,
            count.already_present
        ));
    }
    for error in &report.errors {
        out.push_str(&format!(
            "error: {} {}: {}\n",
            error.category, error.record_id, error.message
        ));
    }
    if !report.credentials_pending.is_empty() {
        out.push_str(&format!(
            "password reset needed: {}\n",
            report.credentials_pending.join(", ")
        ));
    }
    out
}
