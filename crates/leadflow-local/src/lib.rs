// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded key-value backend for Leadflow.
//!
//! Every entity collection lives as one JSON array in a single SQLite `kv`
//! table. A fresh store is seeded with fixture users, branches and products.
//! This backend supports neither product deletion nor call initiation.

pub mod credentials;
pub mod fixtures;
pub mod repository;
pub mod store;

pub use repository::LocalRepository;
pub use store::KvStore;
