// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for backends and the external services they consume.
//!
//! All traits use `#[async_trait]` so they can be used as trait objects.

pub mod backend;
pub mod identity;
pub mod notifier;
pub mod repository;
pub mod telephony;

pub use backend::Backend;
pub use identity::IdentityProvider;
pub use notifier::ConversionNotifier;
pub use repository::Repository;
pub use telephony::CallProvider;
