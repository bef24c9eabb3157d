// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbox dispatcher: drains conversion notifications to the webhook.
//!
//! Delivery is at-least-once. Every attempt carries the entry's idempotency
//! key so the receiver can drop duplicates after a crash between the HTTP
//! call and the acknowledgement.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use leadflow_core::{ConversionNotifier, Enquiry, LeadflowError};

use crate::database::Database;
use crate::queries::outbox;

/// Outcome of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    /// Failed attempts that will be retried.
    pub retried: usize,
    /// Entries that exhausted their attempts.
    pub failed: usize,
}

pub struct OutboxDispatcher {
    db: Arc<Database>,
    notifier: Arc<dyn ConversionNotifier>,
    poll_interval: Duration,
    lock_secs: u64,
}

impl OutboxDispatcher {
    pub fn new(
        db: Arc<Database>,
        notifier: Arc<dyn ConversionNotifier>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            db,
            notifier,
            poll_interval,
            lock_secs: 300,
        }
    }

    /// How long a claimed entry stays invisible to other dispatchers.
    pub fn with_lock_secs(mut self, lock_secs: u64) -> Self {
        self.lock_secs = lock_secs;
        self
    }

    /// Deliver every currently deliverable entry once.
    ///
    /// An entry that fails is released back to `pending` and not retried
    /// within the same pass.
    pub async fn dispatch_once(&self) -> Result<DispatchReport, LeadflowError> {
        let mut report = DispatchReport::default();
        let mut cursor = 0;

        while let Some(entry) = outbox::claim_next_after(&self.db, self.lock_secs, cursor).await? {
            cursor = entry.id;

            let delivery = match serde_json::from_str::<Enquiry>(&entry.payload) {
                Ok(enquiry) => {
                    self.notifier
                        .notify_conversion(&enquiry, &entry.idempotency_key)
                        .await
                }
                Err(e) => Err(e.into()),
            };

            match delivery {
                Ok(()) => {
                    outbox::ack(&self.db, entry.id).await?;
                    report.delivered += 1;
                    debug!(entry_id = entry.id, enquiry_id = %entry.enquiry_id, "outbox entry delivered");
                }
                Err(e) => {
                    let status = outbox::fail(&self.db, entry.id, &e.to_string()).await?;
                    if status == "failed" {
                        report.failed += 1;
                        error!(
                            entry_id = entry.id,
                            enquiry_id = %entry.enquiry_id,
                            attempts = entry.attempts + 1,
                            error = %e,
                            "outbox entry exhausted its attempts"
                        );
                    } else {
                        report.retried += 1;
                        warn!(entry_id = entry.id, error = %e, "outbox delivery failed, will retry");
                    }
                }
            }
        }

        Ok(report)
    }

    /// Poll the outbox until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), LeadflowError> {
        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            "outbox dispatcher running"
        );

        loop {
            match self.dispatch_once().await {
                Ok(report) if report != DispatchReport::default() => {
                    info!(
                        delivered = report.delivered,
                        retried = report.retried,
                        failed = report.failed,
                        "outbox pass complete"
                    );
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, "outbox pass failed"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping outbox dispatcher");
                    break;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::{enquiries, test_support::setup_db};
    use async_trait::async_trait;
    use chrono::Utc;
    use leadflow_core::{PipelineStage, StageUpdate};
    use std::sync::Mutex;

    /// Fails the first `failures` calls, then records keys.
    struct FlakyNotifier {
        failures: Mutex<usize>,
        delivered: Mutex<Vec<String>>,
    }

    impl FlakyNotifier {
        fn new(failures: usize) -> Arc<Self> {
            Arc::new(Self {
                failures: Mutex::new(failures),
                delivered: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ConversionNotifier for FlakyNotifier {
        async fn notify_conversion(&self, _enquiry: &Enquiry, key: &str) -> Result<(), LeadflowError> {
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(LeadflowError::external("automation webhook", "503"));
            }
            self.delivered.lock().unwrap().push(key.to_string());
            Ok(())
        }
    }

    async fn converted(db: &Database, id: &str, max_attempts: u32) {
        let enquiry = Enquiry {
            id: id.into(),
            customer_name: "Murugan".into(),
            customer_phone: "9443222222".into(),
            customer_location: "Denkanikottai".into(),
            product_id: "p1".into(),
            branch_id: "b4".into(),
            purchase_intent: "now".into(),
            pipeline_stage: PipelineStage::New,
            created_by: "u5".into(),
            created_at: Utc::now(),
            closed_amount: None,
            warranty_months: None,
            history: Vec::new(),
        }
        .with_creation_history()
        .unwrap();
        enquiries::insert(db, &enquiry).await.unwrap();
        enquiries::apply_stage(
            db,
            &StageUpdate::new(id, PipelineStage::ClosedConverted, "u4").with_closed_amount(44_000.0),
            max_attempts,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn delivers_pending_conversions() {
        let (db, _dir) = setup_db().await;
        let db = Arc::new(db);
        converted(&db, "e1", 5).await;
        converted(&db, "e2", 5).await;

        let notifier = FlakyNotifier::new(0);
        let dispatcher = OutboxDispatcher::new(db.clone(), notifier.clone(), Duration::from_secs(1));
        let report = dispatcher.dispatch_once().await.unwrap();

        assert_eq!(report.delivered, 2);
        let keys = notifier.delivered.lock().unwrap().clone();
        assert!(keys[0].starts_with("conversion-e1-"));
        assert!(keys[1].starts_with("conversion-e2-"));

        let again = dispatcher.dispatch_once().await.unwrap();
        assert_eq!(again, DispatchReport::default());
    }

    #[tokio::test]
    async fn failed_delivery_is_retried_next_pass() {
        let (db, _dir) = setup_db().await;
        let db = Arc::new(db);
        converted(&db, "e1", 5).await;

        let notifier = FlakyNotifier::new(1);
        let dispatcher = OutboxDispatcher::new(db.clone(), notifier.clone(), Duration::from_secs(1));

        let first = dispatcher.dispatch_once().await.unwrap();
        assert_eq!(first.retried, 1);
        assert_eq!(first.delivered, 0);

        let second = dispatcher.dispatch_once().await.unwrap();
        assert_eq!(second.delivered, 1);
        assert_eq!(notifier.delivered.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn exhausted_entry_is_marked_failed() {
        let (db, _dir) = setup_db().await;
        let db = Arc::new(db);
        converted(&db, "e1", 1).await;

        let dispatcher = OutboxDispatcher::new(db.clone(), FlakyNotifier::new(10), Duration::from_secs(1));
        let report = dispatcher.dispatch_once().await.unwrap();
        assert_eq!(report.failed, 1);

        let counts = outbox::counts(&db).await.unwrap();
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.pending, 0);
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let (db, _dir) = setup_db().await;
        let db = Arc::new(db);
        converted(&db, "e1", 5).await;

        let notifier = FlakyNotifier::new(0);
        let dispatcher = OutboxDispatcher::new(db.clone(), notifier.clone(), Duration::from_millis(20));
        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            stopper.cancel();
        });

        dispatcher.run(cancel).await.unwrap();
        assert_eq!(notifier.delivered.lock().unwrap().len(), 1);
    }
}
