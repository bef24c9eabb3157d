// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Migration outcome reporting.

use serde::Serialize;
use strum::{Display, EnumIter};

/// Entity categories, in copy order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    Branches,
    Products,
    Users,
    Enquiries,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    /// Copied by this run (or, in a dry run, that would be copied).
    pub migrated: usize,
    /// Already present in the target.
    pub already_present: usize,
}

/// A record that could not be copied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordError {
    pub category: Category,
    pub record_id: String,
    pub message: String,
}

/// What a migration run did.
///
/// Record failures do not fail the run; they are collected in `errors`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub dry_run: bool,
    pub branches: CategoryCount,
    pub products: CategoryCount,
    pub users: CategoryCount,
    pub enquiries: CategoryCount,
    pub errors: Vec<RecordError>,
    /// Usernames created without credentials. Local password hashes cannot
    /// be exported, so these users need a password reset on the remote side.
    pub credentials_pending: Vec<String>,
}

impl MigrationReport {
    pub fn count(&self, category: Category) -> &CategoryCount {
        match category {
            Category::Branches => &self.branches,
            Category::Products => &self.products,
            Category::Users => &self.users,
            Category::Enquiries => &self.enquiries,
        }
    }

    pub(crate) fn count_mut(&mut self, category: Category) -> &mut CategoryCount {
        match category {
            Category::Branches => &mut self.branches,
            Category::Products => &mut self.products,
            Category::Users => &mut self.users,
            Category::Enquiries => &mut self.enquiries,
        }
    }

    pub fn total_migrated(&self) -> usize {
        self.branches.migrated + self.products.migrated + self.users.migrated + self.enquiries.migrated
    }

    /// No record errors. Pending credentials do not count.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
