// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that serde attributes cannot express, such
//! as the remote backend's dependency on an identity provider.

use crate::diagnostic::ConfigError;
use crate::model::{BackendKind, LeadflowConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns all collected validation errors (does not fail fast).
pub fn validate_config(config: &LeadflowConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        errors.push(validation(format!(
            "logging.level `{}` must be one of {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        )));
    }

    if config.local.database_path.trim().is_empty() {
        errors.push(validation("local.database_path must not be empty".into()));
    }

    if config.backend.kind == BackendKind::Remote {
        if config.remote.database_path.trim().is_empty() {
            errors.push(validation("remote.database_path must not be empty".into()));
        }
        match config.identity.base_url.as_deref() {
            None => errors.push(validation(
                "identity.base_url is required when backend.kind = \"remote\"".into(),
            )),
            Some(url) => check_url("identity.base_url", url, &mut errors),
        }
        if config
            .identity
            .service_key
            .as_deref()
            .is_none_or(|k| k.trim().is_empty())
        {
            errors.push(validation(
                "identity.service_key is required when backend.kind = \"remote\"".into(),
            ));
        }
    }

    let domain = config.identity.handle_domain.trim();
    if domain.is_empty() || domain.contains('@') || domain.contains(char::is_whitespace) {
        errors.push(validation(format!(
            "identity.handle_domain `{domain}` must be a bare domain such as `leads.example.com`"
        )));
    }

    if let Some(url) = config.automation.webhook_url.as_deref() {
        check_url("automation.webhook_url", url, &mut errors);
    }
    if config.automation.max_attempts < 1 {
        errors.push(validation("automation.max_attempts must be at least 1".into()));
    }
    if config.automation.poll_interval_secs < 1 {
        errors.push(validation(
            "automation.poll_interval_secs must be at least 1".into(),
        ));
    }

    if let Some(url) = config.telephony.base_url.as_deref() {
        check_url("telephony.base_url", url, &mut errors);
    }

    for (key, secs) in [
        ("identity.timeout_secs", config.identity.timeout_secs),
        ("automation.timeout_secs", config.automation.timeout_secs),
        ("telephony.timeout_secs", config.telephony.timeout_secs),
    ] {
        if secs == 0 {
            errors.push(validation(format!("{key} must be greater than 0")));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validation(message: String) -> ConfigError {
    ConfigError::Validation { message }
}

fn check_url(key: &str, url: &str, errors: &mut Vec<ConfigError>) {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(validation(format!(
            "{key} `{url}` must start with http:// or https://"
        )));
    }
}
