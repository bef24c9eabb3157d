// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs the `leadflow` binary against a temporary local backend.

use std::path::Path;
use std::process::{Command, Output};

fn write_config(dir: &Path) -> std::path::PathBuf {
    let db = dir.join("local.db");
    let config = dir.join("leadflow.toml");
    std::fs::write(
        &config,
        format!(
            "[backend]\nkind = \"local\"\n\n[local]\ndatabase_path = \"{}\"\n",
            db.display()
        ),
    )
    .unwrap();
    config
}

fn leadflow(config: &Path, args: &[&str], password: Option<&str>) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_leadflow"));
    cmd.arg("--config").arg(config).args(args);
    cmd.env_remove("LEADFLOW_PASSWORD").env("RUST_LOG", "off");
    if let Some(password) = password {
        cmd.env("LEADFLOW_PASSWORD", password);
    }
    cmd.output().unwrap()
}

#[test]
fn status_json_reports_local_backend() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let output = leadflow(&config, &["status", "--json"], None);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["backend"], "local");
    assert_eq!(status["health"], "healthy");
    assert_eq!(status["capabilities"]["conversion_outbox"], false);
}

#[test]
fn login_accepts_fixture_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let output = leadflow(&config, &["login", "owner"], Some("owner123"));
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("signed in as owner"));
}

#[test]
fn login_rejects_wrong_password() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let output = leadflow(&config, &["login", "owner"], Some("not-the-password"));
    assert!(!output.status.success());
}

#[test]
fn unknown_config_key_fails_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("leadflow.toml");
    std::fs::write(&config, "[backend]\nkindd = \"local\"\n").unwrap();

    let output = leadflow(&config, &["status"], None);
    assert_eq!(output.status.code(), Some(1));
}
