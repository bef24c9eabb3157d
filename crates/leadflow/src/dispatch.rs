// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `leadflow dispatch` command implementation.
//!
//! Drains the remote backend's conversion outbox into the automation
//! webhook, either once or until SIGINT/SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use leadflow_config::{BackendKind, LeadflowConfig};
use leadflow_core::{Backend, LeadflowError};
use leadflow_remote::HttpConversionNotifier;
use tracing::info;

use crate::backend;
use crate::shutdown;

/// Run the `leadflow dispatch` command.
pub async fn run_dispatch(
    config: &LeadflowConfig,
    once: bool,
    requeue_failed: bool,
) -> Result<(), LeadflowError> {
    if config.backend.kind != BackendKind::Remote {
        return Err(LeadflowError::Config(
            "dispatch requires backend.kind = \"remote\"; the local backend has no outbox"
                .to_string(),
        ));
    }

    let notifier = Arc::new(HttpConversionNotifier::new(&config.automation)?);
    let repo = backend::open_remote(config).await?;

    if requeue_failed {
        repo.requeue_failed_notifications().await?;
    }

    let dispatcher = repo.dispatcher(
        notifier,
        Duration::from_secs(config.automation.poll_interval_secs),
    )?;

    let outcome = if once {
        dispatcher.dispatch_once().await.map(|report| {
            println!(
                "delivered {}, retried {}, failed {}",
                report.delivered, report.retried, report.failed
            );
        })
    } else {
        dispatcher.run(shutdown::install_signal_handler()).await
    };

    repo.shutdown().await?;
    info!("dispatcher stopped");
    outcome
}
