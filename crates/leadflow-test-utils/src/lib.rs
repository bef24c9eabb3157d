// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Leadflow integration tests.
//!
//! Provides in-memory doubles for the external collaborators and a
//! recording repository wrapper, so backend and workflow tests run without
//! network services.
//!
//! # Components
//!
//! - [`MockIdentityProvider`] - Identity accounts held in memory, with failure injection
//! - [`MockNotifier`] - Captures conversion notifications, optionally failing first
//! - [`MockCallProvider`] - Returns synthetic call logs
//! - [`RecordingRepository`] - Delegating repository that records every call
//! - [`builders`] - Sample entities

pub mod builders;
pub mod mock_calls;
pub mod mock_identity;
pub mod mock_notifier;
pub mod recording;

pub use mock_calls::MockCallProvider;
pub use mock_identity::MockIdentityProvider;
pub use mock_notifier::MockNotifier;
pub use recording::RecordingRepository;
