// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `leadflow status` command implementation.
//!
//! Opens the configured backend and reports its capabilities and health.
//! The remote backend also reports the conversion outbox.

use leadflow_config::{BackendKind, LeadflowConfig};
use leadflow_core::{Backend, BackendCapabilities, HealthStatus, LeadflowError};
use leadflow_remote::OutboxCounts;
use serde::Serialize;

use crate::backend;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub backend: &'static str,
    pub health: String,
    pub detail: Option<String>,
    pub capabilities: BackendCapabilities,
    pub outbox: Option<OutboxCounts>,
}

fn health_parts(health: &HealthStatus) -> (String, Option<String>) {
    match health {
        HealthStatus::Healthy => ("healthy".to_string(), None),
        HealthStatus::Degraded(why) => ("degraded".to_string(), Some(why.clone())),
        HealthStatus::Unhealthy(why) => ("unhealthy".to_string(), Some(why.clone())),
    }
}

/// Run the `leadflow status` command.
pub async fn run_status(config: &LeadflowConfig, json: bool) -> Result<(), LeadflowError> {
    let response = match config.backend.kind {
        BackendKind::Local => {
            let repo = backend::open_local(config).await?;
            let response = collect(repo.as_ref(), None).await?;
            repo.shutdown().await?;
            response
        }
        BackendKind::Remote => {
            let repo = backend::open_remote(config).await?;
            let counts = repo.outbox_counts().await?;
            let response = collect(repo.as_ref(), Some(counts)).await?;
            repo.shutdown().await?;
            response
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_status(&response);
    }
    Ok(())
}

async fn collect(
    backend: &dyn Backend,
    outbox: Option<OutboxCounts>,
) -> Result<StatusResponse, LeadflowError> {
    let health = backend.health_check().await?;
    let (health, detail) = health_parts(&health);
    Ok(StatusResponse {
        backend: backend.name(),
        health,
        detail,
        capabilities: backend.capabilities(),
        outbox,
    })
}

fn print_status(status: &StatusResponse) {
    println!("Backend:  {}", status.backend);
    match &status.detail {
        Some(detail) => println!("Health:   {} ({detail})", status.health),
        None => println!("Health:   {}", status.health),
    }

    let caps = &status.capabilities;
    let flag = |on: bool| if on { "yes" } else { "no" };
    println!("Capabilities:");
    println!("  delete product       {}", flag(caps.delete_product));
    println!("  sku auto-resolution  {}", flag(caps.sku_auto_resolution));
    println!("  call initiation      {}", flag(caps.call_initiation));
    println!("  conversion outbox    {}", flag(caps.conversion_outbox));

    if let Some(outbox) = &status.outbox {
        println!(
            "Outbox:   {} pending, {} processing, {} delivered, {} failed",
            outbox.pending, outbox.processing, outbox.delivered, outbox.failed
        );
    }
}
