// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend selection.
//!
//! The backend is chosen once from configuration and handed to callers as a
//! trait object. Nothing else in the process decides which store is active.

use std::sync::Arc;

use tracing::info;

use leadflow_config::{BackendKind, LeadflowConfig};
use leadflow_core::{Backend, LeadflowError, Repository};
use leadflow_local::LocalRepository;
use leadflow_remote::RemoteRepository;

/// Open and initialize the configured backend.
pub async fn open_repository(config: &LeadflowConfig) -> Result<Arc<dyn Repository>, LeadflowError> {
    let repository: Arc<dyn Repository> = match config.backend.kind {
        BackendKind::Local => open_local(config).await?,
        BackendKind::Remote => open_remote(config).await?,
    };
    info!(backend = repository.name(), "repository ready");
    Ok(repository)
}

pub async fn open_local(config: &LeadflowConfig) -> Result<Arc<LocalRepository>, LeadflowError> {
    let repository = LocalRepository::new(config.local.clone());
    repository.initialize().await?;
    Ok(Arc::new(repository))
}

pub async fn open_remote(config: &LeadflowConfig) -> Result<Arc<RemoteRepository>, LeadflowError> {
    let repository = RemoteRepository::from_config(config)?;
    repository.initialize().await?;
    Ok(Arc::new(repository))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_kind_opens_local_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = LeadflowConfig::default();
        config.local.database_path = dir.path().join("local.db").to_string_lossy().into_owned();

        let repository = open_repository(&config).await.unwrap();
        assert_eq!(repository.name(), "local");
        assert!(!repository.capabilities().delete_product);
    }

    #[tokio::test]
    async fn remote_kind_without_identity_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = LeadflowConfig::default();
        config.backend.kind = BackendKind::Remote;
        config.remote.database_path = dir.path().join("remote.db").to_string_lossy().into_owned();

        let err = open_repository(&config).await.err().unwrap();
        assert!(matches!(err, LeadflowError::Config(_)));
    }

    #[tokio::test]
    async fn remote_kind_opens_remote_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = LeadflowConfig::default();
        config.backend.kind = BackendKind::Remote;
        config.remote.database_path = dir.path().join("remote.db").to_string_lossy().into_owned();
        config.identity.base_url = Some("http://127.0.0.1:9".into());
        config.identity.service_key = Some("service-key".into());

        let repository = open_repository(&config).await.unwrap();
        assert_eq!(repository.name(), "remote");
        assert!(repository.capabilities().conversion_outbox);
    }
}
