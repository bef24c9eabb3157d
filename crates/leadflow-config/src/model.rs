// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Leadflow configuration.
///
/// Loaded once at process start and handed to the backend factory; nothing
/// reads it through global state.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LeadflowConfig {
    /// Which backend serves the repository contract.
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Local key-value backend settings.
    #[serde(default)]
    pub local: LocalConfig,

    /// Remote relational backend settings.
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Identity provider used by the remote backend.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Conversion webhook and outbox dispatcher settings.
    #[serde(default)]
    pub automation: AutomationConfig,

    /// Call-initiation provider settings.
    #[serde(default)]
    pub telephony: TelephonyConfig,
}

/// Backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Embedded key-value store seeded with fixtures.
    #[default]
    Local,
    /// Relational store plus identity provider.
    Remote,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Local backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LocalConfig {
    /// Path to the key-value database file.
    #[serde(default = "default_local_path")]
    pub database_path: String,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            database_path: default_local_path(),
        }
    }
}

fn default_local_path() -> String {
    data_file("local.db")
}

/// Remote backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    /// Path to the relational database file.
    #[serde(default = "default_remote_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            database_path: default_remote_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_remote_path() -> String {
    data_file("remote.db")
}

fn default_wal_mode() -> bool {
    true
}

fn data_file(name: &str) -> String {
    dirs::data_dir()
        .map(|p| p.join("leadflow").join(name))
        .unwrap_or_else(|| std::path::PathBuf::from(name))
        .to_string_lossy()
        .into_owned()
}

/// Identity provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    /// Base URL of the identity provider's REST API. Required for the remote backend.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Service key sent as a bearer token on admin calls.
    #[serde(default)]
    pub service_key: Option<String>,

    /// Domain appended to usernames to form login handles.
    #[serde(default = "default_handle_domain")]
    pub handle_domain: String,

    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            service_key: None,
            handle_domain: default_handle_domain(),
            timeout_secs: default_http_timeout_secs(),
        }
    }
}

fn default_handle_domain() -> String {
    "leadflow.local".to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

/// Conversion webhook configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AutomationConfig {
    /// Webhook receiving converted enquiries. `None` leaves outbox rows pending.
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Seconds between outbox polls when the outbox is empty.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Delivery attempts before an outbox row is marked failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            poll_interval_secs: default_poll_interval_secs(),
            max_attempts: default_max_attempts(),
            timeout_secs: default_http_timeout_secs(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_max_attempts() -> u32 {
    5
}

/// Call-initiation provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelephonyConfig {
    /// Provider endpoint. `None` disables call initiation.
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout_secs: default_http_timeout_secs(),
        }
    }
}
