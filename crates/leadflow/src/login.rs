// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `leadflow login`: check credentials against the active backend.

use leadflow_config::LeadflowConfig;
use leadflow_core::{Backend, LeadflowError};

use crate::backend;

/// Environment variable consulted before prompting for a password.
pub const PASSWORD_ENV_VAR: &str = "LEADFLOW_PASSWORD";

/// Password from `LEADFLOW_PASSWORD`, or a TTY prompt.
fn read_password() -> Result<String, LeadflowError> {
    if let Ok(password) = std::env::var(PASSWORD_ENV_VAR)
        && !password.is_empty()
    {
        return Ok(password);
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        eprint!("Password: ");
        let password = rpassword::read_password()
            .map_err(|e| LeadflowError::Internal(format!("failed to read password: {e}")))?;
        if password.is_empty() {
            return Err(LeadflowError::Validation("empty password not allowed".to_string()));
        }
        return Ok(password);
    }

    Err(LeadflowError::Validation(format!(
        "no password provided. Set {PASSWORD_ENV_VAR} or run interactively."
    )))
}

/// Run the `leadflow login` command.
pub async fn run_login(config: &LeadflowConfig, username: &str) -> Result<(), LeadflowError> {
    let password = read_password()?;
    let repo = backend::open_repository(config).await?;
    let outcome = repo.login(username, &password).await;
    repo.shutdown().await?;

    let user = outcome?;
    println!("{} ({}) signed in as {}", user.name, user.username, user.role);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn password_from_env_var() {
        // SAFETY: env mutation is serialized across this module's tests.
        unsafe { std::env::set_var(PASSWORD_ENV_VAR, "owner123") };
        let result = read_password();
        unsafe { std::env::remove_var(PASSWORD_ENV_VAR) };

        assert_eq!(result.unwrap(), "owner123");
    }

    #[test]
    #[serial]
    fn empty_env_var_without_tty_is_rejected() {
        unsafe { std::env::set_var(PASSWORD_ENV_VAR, "") };
        // stdin is not a terminal under the test harness.
        let result = read_password();
        unsafe { std::env::remove_var(PASSWORD_ENV_VAR) };

        assert!(matches!(result, Err(LeadflowError::Validation(_))));
    }
}
