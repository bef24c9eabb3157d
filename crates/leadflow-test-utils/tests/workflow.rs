// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Behaviour both backends must agree on, driven through the repository
//! contract and the client-side stage workflow.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use leadflow_config::model::{LocalConfig, RemoteConfig};
use leadflow_core::{
    Backend, Enquiry, EnquiryWorkflow, LeadflowError, PipelineStage, Product, QueueStatus,
    Repository, Role, StageUpdate, User,
};
use leadflow_local::LocalRepository;
use leadflow_remote::RemoteRepository;
use leadflow_test_utils::{builders, MockIdentityProvider, RecordingRepository};

struct Harness {
    repo: Arc<RecordingRepository>,
    _dir: Option<tempfile::TempDir>,
}

impl Harness {
    async fn user(&self, id: &str) -> User {
        self.repo.get_user(id).await.unwrap().unwrap()
    }

    async fn workflow(&self, user_id: &str) -> EnquiryWorkflow {
        EnquiryWorkflow::new(self.repo.clone(), self.user(user_id).await)
    }
}

async fn local() -> Harness {
    let repo = LocalRepository::new(LocalConfig {
        database_path: ":memory:".into(),
    });
    repo.initialize().await.unwrap();
    Harness {
        repo: Arc::new(RecordingRepository::new(Arc::new(repo))),
        _dir: None,
    }
}

/// Remote backend holding the same branches and staff as the local fixtures.
async fn remote() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let repo = RemoteRepository::new(
        RemoteConfig {
            database_path: dir.path().join("remote.db").to_string_lossy().into_owned(),
            wal_mode: true,
        },
        "leadflow.local",
        Arc::new(MockIdentityProvider::new()),
    );
    repo.initialize().await.unwrap();

    for (id, name) in [("b1", "Krishnagiri"), ("b4", "Hosur")] {
        repo.add_branch(&builders::branch(id, name)).await.unwrap();
    }
    for (id, username, role, branch) in [
        ("u1", "owner", Role::Owner, None),
        ("u2", "krishnagiri.admin", Role::BranchAdmin, Some("b1")),
        ("u3", "krishnagiri.caller", Role::Caller, Some("b1")),
        ("u4", "hosur.admin", Role::BranchAdmin, Some("b4")),
        ("u5", "hosur.caller", Role::Caller, Some("b4")),
    ] {
        repo.add_user(&builders::user(id, username, role, branch))
            .await
            .unwrap();
    }

    Harness {
        repo: Arc::new(RecordingRepository::new(Arc::new(repo))),
        _dir: Some(dir),
    }
}

async fn backends() -> Vec<Harness> {
    vec![local().await, remote().await]
}

#[tokio::test]
async fn caller_stage_change_to_delivered_is_never_issued() {
    for h in backends().await {
        let name = h.repo.name();
        h.repo
            .add_enquiry(&builders::enquiry("e1", "b1", "u3"))
            .await
            .unwrap();

        let admin = h.workflow("u2").await;
        for stage in [
            PipelineStage::Qualified,
            PipelineStage::Forwarded,
            PipelineStage::Contacted,
            PipelineStage::DemoScheduled,
            PipelineStage::DemoVisitDone,
            PipelineStage::DeliveryScheduled,
        ] {
            admin.advance("e1", stage, None, None).await.unwrap().unwrap();
        }
        assert_eq!(h.repo.count("update_enquiry_stage").await, 6, "{name}");

        let caller = h.workflow("u3").await;
        let err = caller
            .advance("e1", PipelineStage::Delivered, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LeadflowError::Forbidden { .. }), "{name}: {err}");
        assert_eq!(h.repo.count("update_enquiry_stage").await, 6, "{name}");

        let stored = h.repo.get_enquiry("e1").await.unwrap().unwrap();
        assert_eq!(stored.pipeline_stage, PipelineStage::DeliveryScheduled, "{name}");
    }
}

#[tokio::test]
async fn caller_may_only_qualify_new_enquiries() {
    for h in backends().await {
        let name = h.repo.name();
        let created = h
            .repo
            .add_enquiry(&builders::enquiry("e1", "b1", "u3"))
            .await
            .unwrap();

        let caller = h.workflow("u3").await;
        assert_eq!(
            caller.available_transitions(&created),
            vec![PipelineStage::Qualified],
            "{name}"
        );

        let qualified = caller
            .advance("e1", PipelineStage::Qualified, Some("wants a demo".into()), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(qualified.pipeline_stage, PipelineStage::Qualified, "{name}");
        assert!(caller.available_transitions(&qualified).is_empty(), "{name}");

        let err = caller
            .advance("e1", PipelineStage::Forwarded, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LeadflowError::Forbidden { .. }), "{name}");
        assert_eq!(h.repo.count("update_enquiry_stage").await, 1, "{name}");
    }
}

#[tokio::test]
async fn unknown_enquiry_advances_to_nothing() {
    for h in backends().await {
        let admin = h.workflow("u1").await;
        let outcome = admin
            .advance("missing", PipelineStage::Qualified, None, None)
            .await
            .unwrap();
        assert!(outcome.is_none(), "{}", h.repo.name());
        assert_eq!(h.repo.count("update_enquiry_stage").await, 0);
    }
}

#[tokio::test]
async fn each_transition_appends_exactly_one_history_entry() {
    for h in backends().await {
        let name = h.repo.name();
        h.repo
            .add_enquiry(&builders::enquiry("e1", "b4", "u5"))
            .await
            .unwrap();

        let created = h.repo.get_enquiry("e1").await.unwrap().unwrap();
        assert_eq!(created.history.len(), 1, "{name}");
        assert_eq!(created.history[0].stage, PipelineStage::New, "{name}");

        let admin = h.workflow("u4").await;
        let path = [
            PipelineStage::Qualified,
            PipelineStage::Forwarded,
            PipelineStage::Contacted,
            PipelineStage::VisitScheduled,
        ];
        for (i, stage) in path.into_iter().enumerate() {
            admin
                .advance("e1", stage, Some(format!("step {i}")), None)
                .await
                .unwrap();

            let first = h.repo.get_enquiry("e1").await.unwrap().unwrap();
            let second = h.repo.get_enquiry("e1").await.unwrap().unwrap();
            assert_eq!(first.history, second.history, "{name}: history must be stable");
            assert_eq!(first.history.len(), i + 2, "{name}");
            assert_eq!(first.pipeline_stage, stage, "{name}");

            let last = first.history.last().unwrap();
            assert_eq!(last.stage, stage, "{name}");
            assert_eq!(last.user_id, "u4", "{name}");
            assert_eq!(last.notes.as_deref(), Some(format!("step {i}").as_str()), "{name}");
        }
    }
}

#[tokio::test]
async fn branch_delete_cascades_to_its_admins_only() {
    for h in backends().await {
        let name = h.repo.name();
        h.repo.delete_branch("b4").await.unwrap();

        assert!(h.repo.get_user("u4").await.unwrap().is_none(), "{name}");
        assert!(h.repo.get_user("u5").await.unwrap().is_some(), "{name}");
        assert!(h.repo.get_user("u2").await.unwrap().is_some(), "{name}");
        assert!(
            h.repo.get_branches().await.unwrap().iter().all(|b| b.id != "b4"),
            "{name}"
        );
    }
}

#[tokio::test]
async fn duplicate_branch_sku_resolution_differs_by_capability() {
    for h in backends().await {
        let name = h.repo.name();
        h.repo
            .add_product(&builders::product("p75", "PW-P-075", Some("b4")))
            .await
            .unwrap();

        let outcome = h
            .repo
            .add_product(&builders::product("p76", "PW-P-075", Some("b1")))
            .await;

        if h.repo.capabilities().sku_auto_resolution {
            assert_eq!(outcome.unwrap().sku, "PW-P-075-b1", "{name}");
        } else {
            assert!(
                matches!(outcome, Err(LeadflowError::DuplicateKey { .. })),
                "{name}: {outcome:?}"
            );
        }
    }
}

#[tokio::test]
async fn capabilities_match_backend() {
    let local = local().await;
    let remote = remote().await;
    assert!(!local.repo.capabilities().sku_auto_resolution);
    assert!(!local.repo.capabilities().conversion_outbox);
    assert!(remote.repo.capabilities().sku_auto_resolution);
    assert!(remote.repo.capabilities().conversion_outbox);
}

#[tokio::test]
async fn history_keeps_append_order_when_created_at_is_ahead() {
    for h in backends().await {
        let name = h.repo.name();
        let ahead = Enquiry {
            created_at: Utc::now() + Duration::minutes(1),
            ..builders::enquiry("e1", "b1", "u3")
        };
        h.repo.add_enquiry(&ahead).await.unwrap();

        let returned = h
            .repo
            .update_enquiry_stage(&StageUpdate::new("e1", PipelineStage::Qualified, "u3"))
            .await
            .unwrap()
            .unwrap();
        let reread = h.repo.get_enquiry("e1").await.unwrap().unwrap();

        assert_eq!(reread.history, returned.history, "{name}");
        assert_eq!(reread.pipeline_stage, PipelineStage::Qualified, "{name}");
        let stages: Vec<PipelineStage> = reread.history.iter().map(|e| e.stage).collect();
        assert_eq!(stages, [PipelineStage::New, PipelineStage::Qualified], "{name}");
        reread.check_history().unwrap();
    }
}

#[tokio::test]
async fn queue_item_cannot_be_added_as_sent() {
    for h in backends().await {
        let name = h.repo.name();
        let err = h
            .repo
            .add_queue_item(&builders::queue_item("q1", QueueStatus::Sent))
            .await
            .unwrap_err();
        assert!(matches!(err, LeadflowError::InvalidState(_)), "{name}: {err}");
        assert!(h.repo.get_queue_items().await.unwrap().iter().all(|q| q.id != "q1"), "{name}");
    }
}

fn map(pairs: &[(&str, &str)]) -> Option<BTreeMap<String, String>> {
    Some(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
}

#[tokio::test]
async fn user_round_trips() {
    for h in backends().await {
        let user = User {
            password_last_changed: Some(Utc::now() - Duration::days(3)),
            ..builders::user("u9", "salem.caller", Role::Caller, Some("b1"))
        };
        let added = h.repo.add_user(&user).await.unwrap();
        assert_eq!(added, user, "{}", h.repo.name());
        assert_eq!(h.repo.get_user("u9").await.unwrap(), Some(added), "{}", h.repo.name());
    }
}

#[tokio::test]
async fn branch_round_trips() {
    for h in backends().await {
        let branch = builders::branch("b9", "Vellore");
        let added = h.repo.add_branch(&branch).await.unwrap();
        assert_eq!(added, branch, "{}", h.repo.name());
        let stored = h.repo.get_branches().await.unwrap();
        assert_eq!(stored.iter().find(|b| b.id == "b9"), Some(&added), "{}", h.repo.name());
    }
}

#[tokio::test]
async fn product_round_trips_with_maps() {
    for h in backends().await {
        let product = Product {
            name_localized: map(&[("ta", "பவர் வீடர்")]),
            category_localized: map(&[("ta", "களையெடுப்பான்")]),
            description_localized: map(&[("ta", "பெட்ரோல் களையெடுப்பான்")]),
            specifications: map(&[("engine", "7HP petrol"), ("tines", "rotary")]),
            ..builders::product("p90", "PW-P-090", Some("b1"))
        };
        let added = h.repo.add_product(&product).await.unwrap();
        assert_eq!(added, product, "{}", h.repo.name());
        let stored = h.repo.get_products().await.unwrap();
        assert_eq!(stored.iter().find(|p| p.id == "p90"), Some(&added), "{}", h.repo.name());
    }
}

#[tokio::test]
async fn enquiry_round_trips() {
    for h in backends().await {
        let added = h
            .repo
            .add_enquiry(&builders::enquiry("e9", "b1", "u3"))
            .await
            .unwrap();
        assert_eq!(added.history.len(), 1, "{}", h.repo.name());
        assert_eq!(h.repo.get_enquiry("e9").await.unwrap(), Some(added), "{}", h.repo.name());
    }
}

#[tokio::test]
async fn promotion_round_trips() {
    for h in backends().await {
        let promotion = builders::promotion("pr9", Some("b1"));
        let added = h.repo.add_promotion(&promotion).await.unwrap();
        assert_eq!(added, promotion, "{}", h.repo.name());
        let stored = h.repo.get_promotions().await.unwrap();
        assert_eq!(stored.iter().find(|p| p.id == "pr9"), Some(&added), "{}", h.repo.name());
    }
}

#[tokio::test]
async fn message_round_trips() {
    for h in backends().await {
        let message = builders::message("m9", "u2", Some("u3"), Some("b1"));
        let added = h.repo.send_message(&message).await.unwrap();
        assert_eq!(added, message, "{}", h.repo.name());
        let stored = h.repo.get_messages("u3").await.unwrap();
        assert_eq!(stored.iter().find(|m| m.id == "m9"), Some(&added), "{}", h.repo.name());
    }
}

#[tokio::test]
async fn queue_item_round_trips() {
    for h in backends().await {
        let item = builders::queue_item("q9", QueueStatus::Draft);
        let added = h.repo.add_queue_item(&item).await.unwrap();
        assert_eq!(added, item, "{}", h.repo.name());
        let stored = h.repo.get_queue_items().await.unwrap();
        assert_eq!(stored.iter().find(|q| q.id == "q9"), Some(&added), "{}", h.repo.name());
    }
}
