// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion notifier that captures deliveries.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use leadflow_core::{ConversionNotifier, Enquiry, LeadflowError};

/// A delivered notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub enquiry_id: String,
    pub idempotency_key: String,
    pub closed_amount: Option<f64>,
}

/// Records every successful delivery. The first `failures` calls fail.
#[derive(Clone, Default)]
pub struct MockNotifier {
    deliveries: Arc<Mutex<Vec<Delivery>>>,
    failures: Arc<Mutex<usize>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose first `failures` deliveries return an error.
    pub fn failing(failures: usize) -> Self {
        Self {
            deliveries: Arc::default(),
            failures: Arc::new(Mutex::new(failures)),
        }
    }

    pub async fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().await.clone()
    }
}

#[async_trait]
impl ConversionNotifier for MockNotifier {
    async fn notify_conversion(
        &self,
        enquiry: &Enquiry,
        idempotency_key: &str,
    ) -> Result<(), LeadflowError> {
        {
            let mut failures = self.failures.lock().await;
            if *failures > 0 {
                *failures -= 1;
                return Err(LeadflowError::external("automation webhook", "returned 503"));
            }
        }
        self.deliveries.lock().await.push(Delivery {
            enquiry_id: enquiry.id.clone(),
            idempotency_key: idempotency_key.to_string(),
            closed_amount: enquiry.closed_amount,
        });
        Ok(())
    }
}
