// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared plumbing for the HTTP collaborators.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Response, Url};

use leadflow_core::LeadflowError;

/// Build a client with a request timeout and an optional bearer token.
pub(crate) fn build_client(
    service: &'static str,
    timeout_secs: u64,
    bearer: Option<&str>,
) -> Result<reqwest::Client, LeadflowError> {
    let mut headers = HeaderMap::new();
    if let Some(token) = bearer {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| LeadflowError::Config(format!("invalid {service} credential: {e}")))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| LeadflowError::External {
            service,
            message: format!("failed to build HTTP client: {e}"),
            source: Some(Box::new(e)),
        })
}

/// Join `path` onto `base`, tolerating a trailing slash on the base.
pub(crate) fn endpoint(
    service: &'static str,
    base: &str,
    path: &str,
    query: &[(&str, &str)],
) -> Result<Url, LeadflowError> {
    let joined = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    let parsed = if query.is_empty() {
        Url::parse(&joined)
    } else {
        Url::parse_with_params(&joined, query)
    };
    parsed.map_err(|e| LeadflowError::Config(format!("invalid {service} URL `{joined}`: {e}")))
}

pub(crate) fn request_failed(service: &'static str, e: reqwest::Error) -> LeadflowError {
    LeadflowError::External {
        service,
        message: format!("HTTP request failed: {e}"),
        source: Some(Box::new(e)),
    }
}

/// Turn a non-success response into an error carrying the status and body.
pub(crate) async fn unexpected_status(service: &'static str, response: Response) -> LeadflowError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    LeadflowError::external(service, format!("returned {status}: {body}"))
}

/// Decode a JSON body.
pub(crate) async fn json_body<T: serde::de::DeserializeOwned>(
    service: &'static str,
    response: Response,
) -> Result<T, LeadflowError> {
    let body = response.text().await.map_err(|e| request_failed(service, e))?;
    serde_json::from_str(&body).map_err(|e| LeadflowError::External {
        service,
        message: format!("failed to parse response: {e}"),
        source: Some(Box::new(e)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_and_encodes() {
        let url = endpoint("identity", "https://auth.example.com/v1/", "/admin/users", &[(
            "email",
            "ravi+1@leadflow.local",
        )])
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://auth.example.com/v1/admin/users?email=ravi%2B1%40leadflow.local"
        );
    }

    #[test]
    fn bad_bearer_is_config_error() {
        let err = build_client("identity", 5, Some("bad\nkey")).unwrap_err();
        assert!(matches!(err, LeadflowError::Config(_)));
    }
}
