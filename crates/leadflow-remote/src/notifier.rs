// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion webhook delivery.

use async_trait::async_trait;
use tracing::debug;

use leadflow_config::model::AutomationConfig;
use leadflow_core::{ConversionNotifier, Enquiry, LeadflowError};

use crate::http::{build_client, request_failed, unexpected_status};

const SERVICE: &str = "automation webhook";

/// Header carrying the outbox key so the receiver can drop redeliveries.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Posts converted enquiries to the automation webhook as JSON.
pub struct HttpConversionNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl HttpConversionNotifier {
    pub fn new(config: &AutomationConfig) -> Result<Self, LeadflowError> {
        let webhook_url = config
            .webhook_url
            .clone()
            .ok_or_else(|| LeadflowError::Config("automation.webhook_url is not set".into()))?;
        let client = build_client(SERVICE, config.timeout_secs, None)?;
        Ok(Self {
            client,
            webhook_url,
        })
    }
}

#[async_trait]
impl ConversionNotifier for HttpConversionNotifier {
    async fn notify_conversion(
        &self,
        enquiry: &Enquiry,
        idempotency_key: &str,
    ) -> Result<(), LeadflowError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .header(IDEMPOTENCY_HEADER, idempotency_key)
            .json(enquiry)
            .send()
            .await
            .map_err(|e| request_failed(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(unexpected_status(SERVICE, response).await);
        }
        debug!(enquiry_id = %enquiry.id, idempotency_key, "conversion delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use leadflow_core::PipelineStage;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notifier(server: &MockServer) -> HttpConversionNotifier {
        HttpConversionNotifier::new(&AutomationConfig {
            webhook_url: Some(format!("{}/hooks/conversion", server.uri())),
            ..AutomationConfig::default()
        })
        .unwrap()
    }

    fn converted() -> Enquiry {
        Enquiry {
            id: "e1".into(),
            customer_name: "Priya".into(),
            customer_phone: "9800000001".into(),
            customer_location: "Hosur".into(),
            product_id: "p1".into(),
            branch_id: "b1".into(),
            purchase_intent: "this week".into(),
            pipeline_stage: PipelineStage::ClosedConverted,
            created_by: "u3".into(),
            created_at: Utc::now(),
            closed_amount: Some(45_000.0),
            warranty_months: None,
            history: Vec::new(),
        }
    }

    #[test]
    fn missing_webhook_is_config_error() {
        let err = HttpConversionNotifier::new(&AutomationConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, LeadflowError::Config(_)));
    }

    #[tokio::test]
    async fn posts_enquiry_with_idempotency_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hooks/conversion"))
            .and(header("Idempotency-Key", "conversion-e1-7"))
            .and(body_partial_json(serde_json::json!({
                "id": "e1",
                "pipelineStage": "Closed-Converted",
                "closedAmount": 45000.0
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        notifier(&server)
            .notify_conversion(&converted(), "conversion-e1-7")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_success_is_external_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = notifier(&server)
            .notify_conversion(&converted(), "conversion-e1-7")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
