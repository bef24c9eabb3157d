// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared by every repository backend and collaborator.

use thiserror::Error;

/// The primary error type returned by the repository contract and its collaborators.
///
/// Lookup misses are not errors: `get_*` operations return `Ok(None)` or an
/// empty snapshot. [`LeadflowError::NotFound`] exists for the few operations
/// that cannot express absence in their return type.
#[derive(Debug, Error)]
pub enum LeadflowError {
    /// A record that must exist for the operation to proceed was missing.
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },

    /// A unique constraint (natural key) was violated on insert.
    #[error("duplicate {entity}: `{key}` already exists")]
    DuplicateKey { entity: &'static str, key: String },

    /// The active backend does not implement this operation.
    #[error("{operation} is not supported by the {backend} backend")]
    NotSupported {
        backend: &'static str,
        operation: &'static str,
    },

    /// Credentials were rejected.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// One write of a multi-write operation succeeded and the other did not.
    ///
    /// `completed` names the half that is durable, `failed` the half that is not.
    #[error("partial failure: {completed}, but {failed}")]
    PartialFailure {
        completed: String,
        failed: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The acting role may not perform this stage transition.
    #[error("role `{role}` may not move an enquiry from `{from}` to `{to}`")]
    Forbidden {
        role: String,
        from: String,
        to: String,
    },

    /// A record is in the wrong state for the requested transition.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Input failed a data-model invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Storage engine failure (connection, query, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An external HTTP service (identity provider, webhook, telephony) failed.
    #[error("{service} error: {message}")]
    External {
        service: &'static str,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A stored record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LeadflowError {
    /// Returns `true` for unique-constraint violations.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }

    /// Convenience constructor for an external-service failure without a source.
    pub fn external(service: &'static str, message: impl Into<String>) -> Self {
        Self::External {
            service,
            message: message.into(),
            source: None,
        }
    }
}
