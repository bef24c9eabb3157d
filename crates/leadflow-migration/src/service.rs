// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Copy loop: branches, products, users, then enquiries.
//!
//! Enquiries reference branches and products, so those go first.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn};

use leadflow_core::{LeadflowError, Repository};

use crate::report::{Category, MigrationReport, RecordError};

#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationOptions {
    /// Count what would be copied without writing to the target.
    pub dry_run: bool,
}

pub struct MigrationService {
    source: Arc<dyn Repository>,
    target: Arc<dyn Repository>,
}

impl MigrationService {
    /// Both repositories must already be initialized.
    pub fn new(source: Arc<dyn Repository>, target: Arc<dyn Repository>) -> Self {
        Self { source, target }
    }

    /// Run the migration.
    ///
    /// Fails only when a full collection cannot be read from either side.
    /// Individual record failures are collected in the report.
    pub async fn run(&self, options: MigrationOptions) -> Result<MigrationReport, LeadflowError> {
        let mut report = MigrationReport {
            dry_run: options.dry_run,
            ..MigrationReport::default()
        };
        info!(
            source = self.source.name(),
            target = self.target.name(),
            dry_run = options.dry_run,
            "migration started"
        );

        let branches = self.source.get_branches().await?;
        let present = ids(self.target.get_branches().await?.iter().map(|b| &b.id));
        for branch in &branches {
            self.copy(&mut report, options, Category::Branches, &branch.id, &present, || {
                self.target.add_branch(branch)
            })
            .await;
        }

        let products = self.source.get_products().await?;
        let present = ids(self.target.get_products().await?.iter().map(|p| &p.id));
        for product in &products {
            self.copy(&mut report, options, Category::Products, &product.id, &present, || {
                self.target.add_product(product)
            })
            .await;
        }

        let users = self.source.get_users().await?;
        let present = ids(self.target.get_users().await?.iter().map(|u| &u.id));
        for user in &users {
            // Profiles come across without a password.
            let mut profile = user.clone();
            profile.password = None;
            let created = self
                .copy(&mut report, options, Category::Users, &user.id, &present, || {
                    self.target.add_user(&profile)
                })
                .await;
            if created {
                report.credentials_pending.push(user.username.clone());
            }
        }

        let enquiries = self.source.get_enquiries().await?;
        let present = ids(self.target.get_enquiries().await?.iter().map(|e| &e.id));
        for enquiry in &enquiries {
            self.copy(&mut report, options, Category::Enquiries, &enquiry.id, &present, || {
                self.target.add_enquiry(enquiry)
            })
            .await;
        }

        info!(
            migrated = report.total_migrated(),
            errors = report.errors.len(),
            credentials_pending = report.credentials_pending.len(),
            dry_run = options.dry_run,
            "migration finished"
        );
        Ok(report)
    }

    /// Copy one record. Returns `true` when it was (or would be) created.
    async fn copy<F, Fut, T>(
        &self,
        report: &mut MigrationReport,
        options: MigrationOptions,
        category: Category,
        id: &str,
        present: &HashSet<String>,
        add: F,
    ) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, LeadflowError>>,
    {
        if present.contains(id) {
            report.count_mut(category).already_present += 1;
            debug!(%category, id, "already migrated");
            return false;
        }

        if options.dry_run {
            report.count_mut(category).migrated += 1;
            return true;
        }

        match add().await {
            Ok(_) => {
                report.count_mut(category).migrated += 1;
                true
            }
            Err(e) if e.is_duplicate() => {
                report.count_mut(category).already_present += 1;
                debug!(%category, id, error = %e, "already migrated");
                false
            }
            Err(e) => {
                warn!(%category, id, error = %e, "record not migrated");
                report.errors.push(RecordError {
                    category,
                    record_id: id.to_string(),
                    message: e.to_string(),
                });
                false
            }
        }
    }
}

fn ids<'a>(keys: impl Iterator<Item = &'a String>) -> HashSet<String> {
    keys.cloned().collect()
}
