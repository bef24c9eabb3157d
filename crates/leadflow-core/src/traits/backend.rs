// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base trait every persistence backend implements.

use async_trait::async_trait;

use crate::error::LeadflowError;
use crate::types::{BackendCapabilities, HealthStatus};

/// Identity, capability and lifecycle surface of a persistence backend.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Short backend name used in logs and `NotSupported` errors.
    fn name(&self) -> &'static str;

    /// Operations this backend implements.
    fn capabilities(&self) -> BackendCapabilities;

    /// Opens connections, runs migrations and seeds fixtures.
    ///
    /// Calling it twice is an error.
    async fn initialize(&self) -> Result<(), LeadflowError>;

    /// Performs a health check and returns the backend's current status.
    async fn health_check(&self) -> Result<HealthStatus, LeadflowError>;

    /// Flushes pending writes and releases connections.
    async fn shutdown(&self) -> Result<(), LeadflowError>;
}
