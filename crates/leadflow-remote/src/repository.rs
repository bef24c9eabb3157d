// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relational implementation of the Repository trait.
//!
//! Profiles, catalog and pipeline data live in SQLite. Credentials live in
//! the identity provider and never touch the profile table.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use leadflow_config::model::RemoteConfig;
use leadflow_config::LeadflowConfig;
use leadflow_core::{
    Backend, BackendCapabilities, Branch, CallLog, CallProvider, CallRequest, CallStatusUpdate,
    ConversionNotifier, Enquiry, HealthStatus, IdentityProvider, LeadflowError, Message, Product,
    Promotion, QueueItem, QueueStatus, Repository, StageUpdate, User,
};

use crate::database::{map_tr_err, Database};
use crate::dispatcher::OutboxDispatcher;
use crate::identity::{login_handle, upsert_identity, HttpIdentityProvider};
use crate::mapping::{self, BRANCHES, CALL_LOGS, MESSAGES, PRODUCTS, PROMOTIONS, QUEUE, USERS};
use crate::models::OutboxCounts;
use crate::queries::{self, calls, enquiries, messages, outbox, products, queue, users};
use crate::telephony::HttpCallProvider;

const BACKEND: &str = "remote";

fn ensure_id(id: &mut String) {
    if id.trim().is_empty() {
        *id = uuid::Uuid::new_v4().to_string();
    }
}

/// Remote backend: SQLite tables plus the hosted identity provider.
///
/// The database is opened on [`Backend::initialize`]; every operation
/// before that fails with a storage error.
pub struct RemoteRepository {
    config: RemoteConfig,
    handle_domain: String,
    outbox_max_attempts: u32,
    db: OnceCell<Arc<Database>>,
    identity: Arc<dyn IdentityProvider>,
    calls: Option<Arc<dyn CallProvider>>,
}

impl RemoteRepository {
    pub fn new(
        config: RemoteConfig,
        handle_domain: impl Into<String>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            config,
            handle_domain: handle_domain.into(),
            outbox_max_attempts: 5,
            db: OnceCell::new(),
            identity,
            calls: None,
        }
    }

    /// Build the backend and its HTTP collaborators from configuration.
    pub fn from_config(config: &LeadflowConfig) -> Result<Self, LeadflowError> {
        let identity = Arc::new(HttpIdentityProvider::new(&config.identity)?);
        let mut repo = Self::new(
            config.remote.clone(),
            config.identity.handle_domain.clone(),
            identity,
        )
        .with_outbox_max_attempts(config.automation.max_attempts);
        if let Some(provider) = HttpCallProvider::from_config(&config.telephony)? {
            repo = repo.with_call_provider(Arc::new(provider));
        }
        Ok(repo)
    }

    /// Delivery attempts for each conversion notification.
    pub fn with_outbox_max_attempts(mut self, max_attempts: u32) -> Self {
        self.outbox_max_attempts = max_attempts;
        self
    }

    pub fn with_call_provider(mut self, provider: Arc<dyn CallProvider>) -> Self {
        self.calls = Some(provider);
        self
    }

    fn db(&self) -> Result<&Database, LeadflowError> {
        self.db.get().map(Arc::as_ref).ok_or_else(not_initialized)
    }

    /// Shared handle to the open database.
    pub fn database(&self) -> Result<Arc<Database>, LeadflowError> {
        self.db.get().cloned().ok_or_else(not_initialized)
    }

    /// An outbox dispatcher over this backend's database.
    pub fn dispatcher(
        &self,
        notifier: Arc<dyn ConversionNotifier>,
        poll_interval: Duration,
    ) -> Result<OutboxDispatcher, LeadflowError> {
        Ok(OutboxDispatcher::new(self.database()?, notifier, poll_interval))
    }

    /// `queued` → `sent`, once the automation has delivered the message.
    pub async fn mark_queue_item_sent(&self, id: &str) -> Result<Option<QueueItem>, LeadflowError> {
        queue::transition(self.db()?, id, QueueStatus::Queued, QueueStatus::Sent).await
    }

    pub async fn outbox_counts(&self) -> Result<OutboxCounts, LeadflowError> {
        outbox::counts(self.db()?).await
    }

    /// Give exhausted conversion notifications a fresh attempt budget.
    pub async fn requeue_failed_notifications(&self) -> Result<usize, LeadflowError> {
        let requeued = outbox::requeue_failed(self.db()?).await?;
        if requeued > 0 {
            info!(requeued, "failed conversion notifications requeued");
        }
        Ok(requeued)
    }

    /// Push `password` to the identity account for `profile` and return the
    /// id the profile must carry.
    async fn sync_identity(&self, profile: &User, password: &str) -> Result<String, SyncFailure> {
        let handle = login_handle(&profile.username, &self.handle_domain);
        let account = upsert_identity(self.identity.as_ref(), &handle, password, &profile.id)
            .await
            .map_err(SyncFailure::Credentials)?;
        if account.id != profile.id {
            let rekeyed = match self.db() {
                Ok(db) => users::rekey(db, &profile.id, &account.id).await,
                Err(e) => Err(e),
            };
            if let Err(source) = rekeyed {
                return Err(SyncFailure::Rekey {
                    account_id: account.id,
                    source,
                });
            }
            info!(from = %profile.id, to = %account.id, "profile re-keyed to identity account");
        }
        Ok(account.id)
    }
}

/// Which half of an identity sync did not stick.
enum SyncFailure {
    /// The identity provider write failed; credentials are unchanged.
    Credentials(LeadflowError),
    /// Credentials were written but the profile still carries its old id.
    Rekey {
        account_id: String,
        source: LeadflowError,
    },
}

impl SyncFailure {
    /// `profile_done` names the profile write that already committed.
    fn into_partial(self, profile_done: &str, credentials_failed: &str) -> LeadflowError {
        match self {
            SyncFailure::Credentials(e) => LeadflowError::PartialFailure {
                completed: profile_done.to_string(),
                failed: credentials_failed.to_string(),
                source: Some(Box::new(e)),
            },
            SyncFailure::Rekey { account_id, source } => LeadflowError::PartialFailure {
                completed: format!("{profile_done} and credentials set"),
                failed: format!("profile id not re-keyed to identity account `{account_id}`"),
                source: Some(Box::new(source)),
            },
        }
    }
}

fn not_initialized() -> LeadflowError {
    LeadflowError::Storage {
        source: "remote database not initialized -- call initialize() first".into(),
    }
}

#[async_trait]
impl Backend for RemoteRepository {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            delete_product: true,
            sku_auto_resolution: true,
            call_initiation: self.calls.is_some(),
            conversion_outbox: true,
        }
    }

    async fn initialize(&self) -> Result<(), LeadflowError> {
        mapping::validate_all()?;
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(Arc::new(db)).map_err(|_| LeadflowError::Storage {
            source: "remote database already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "remote backend initialized");
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, LeadflowError> {
        let Some(db) = self.db.get() else {
            return Ok(HealthStatus::Unhealthy("not initialized".into()));
        };
        db.connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT 1", [], |row| row.get(0))
            })
            .await
            .map_err(map_tr_err)?;

        let counts = outbox::counts(db).await?;
        if counts.failed > 0 {
            return Ok(HealthStatus::Degraded(format!(
                "{} conversion notification(s) failed delivery",
                counts.failed
            )));
        }
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LeadflowError> {
        if let Some(db) = self.db.get()
            && self.config.wal_mode
        {
            db.checkpoint().await?;
        }
        debug!("remote backend shut down");
        Ok(())
    }
}

#[async_trait]
impl Repository for RemoteRepository {
    // --- Users ---

    async fn get_users(&self) -> Result<Vec<User>, LeadflowError> {
        queries::list(self.db()?, &USERS).await
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, LeadflowError> {
        queries::find(self.db()?, &USERS, id).await
    }

    async fn add_user(&self, user: &User) -> Result<User, LeadflowError> {
        user.validate()?;
        let mut profile = user.clone();
        ensure_id(&mut profile.id);
        let password = profile.password.take();

        queries::insert(self.db()?, &USERS, &profile).await?;

        let Some(password) = password else {
            warn!(user_id = %profile.id, "user created without credentials");
            return Ok(profile);
        };

        match self.sync_identity(&profile, &password).await {
            Ok(account_id) => {
                profile.id = account_id;
                Ok(profile)
            }
            Err(failure) => {
                let e = failure.into_partial("profile record created", "credentials not set");
                warn!(user_id = %profile.id, error = %e, "identity sync failed after profile insert");
                Err(e)
            }
        }
    }

    async fn update_user(&self, user: &User) -> Result<User, LeadflowError> {
        user.validate()?;
        let mut profile = user.clone();
        let password = profile.password.take();

        queries::upsert(self.db()?, &USERS, &profile).await?;

        let Some(password) = password else {
            return Ok(profile);
        };

        match self.sync_identity(&profile, &password).await {
            Ok(account_id) => {
                let now = Utc::now();
                if let Err(e) = users::touch_password_changed(self.db()?, &account_id, now).await {
                    return Err(LeadflowError::PartialFailure {
                        completed: "profile record updated and password changed".into(),
                        failed: "password change time not recorded".into(),
                        source: Some(Box::new(e)),
                    });
                }
                profile.id = account_id;
                profile.password_last_changed = Some(now);
                Ok(profile)
            }
            Err(failure) => {
                let e = failure.into_partial("profile record updated", "password not changed");
                warn!(user_id = %profile.id, error = %e, "identity sync failed after profile update");
                Err(e)
            }
        }
    }

    async fn delete_user(&self, id: &str) -> Result<(), LeadflowError> {
        // The identity account is left in place; without a profile it cannot log in.
        queries::delete(self.db()?, &USERS, id).await
    }

    async fn login(&self, username: &str, password: &str) -> Result<User, LeadflowError> {
        let handle = login_handle(username, &self.handle_domain);
        let account = self.identity.sign_in(&handle, password).await?;

        let db = self.db()?;
        let profile = match queries::find::<User>(db, &USERS, &account.id).await? {
            Some(profile) => Some(profile),
            None => users::find_by_username(db, username).await?,
        };

        match profile {
            Some(profile) => {
                debug!(user_id = %profile.id, "remote login succeeded");
                Ok(profile)
            }
            None => {
                warn!(account_id = %account.id, "identity account has no profile");
                Err(LeadflowError::AuthFailed(
                    "no profile for this account".into(),
                ))
            }
        }
    }

    // --- Branches ---

    async fn get_branches(&self) -> Result<Vec<Branch>, LeadflowError> {
        queries::list(self.db()?, &BRANCHES).await
    }

    async fn add_branch(&self, branch: &Branch) -> Result<Branch, LeadflowError> {
        let mut branch = branch.clone();
        ensure_id(&mut branch.id);
        queries::insert(self.db()?, &BRANCHES, &branch).await?;
        Ok(branch)
    }

    async fn update_branch(&self, branch: &Branch) -> Result<Branch, LeadflowError> {
        queries::upsert(self.db()?, &BRANCHES, branch).await?;
        Ok(branch.clone())
    }

    async fn delete_branch(&self, id: &str) -> Result<(), LeadflowError> {
        let removed_admins = users::delete_branch_cascade(self.db()?, id).await?;
        debug!(branch_id = id, removed_admins, "branch deleted");
        Ok(())
    }

    // --- Products ---

    async fn get_products(&self) -> Result<Vec<Product>, LeadflowError> {
        queries::list(self.db()?, &PRODUCTS).await
    }

    async fn add_product(&self, product: &Product) -> Result<Product, LeadflowError> {
        let mut product = product.clone();
        ensure_id(&mut product.id);
        products::insert(self.db()?, &product).await
    }

    async fn update_product(&self, product: &Product) -> Result<Product, LeadflowError> {
        queries::upsert(self.db()?, &PRODUCTS, product).await?;
        Ok(product.clone())
    }

    async fn delete_product(&self, id: &str) -> Result<(), LeadflowError> {
        queries::delete(self.db()?, &PRODUCTS, id).await
    }

    // --- Enquiries ---

    async fn get_enquiries(&self) -> Result<Vec<Enquiry>, LeadflowError> {
        enquiries::list(self.db()?).await
    }

    async fn get_enquiry(&self, id: &str) -> Result<Option<Enquiry>, LeadflowError> {
        enquiries::find(self.db()?, id).await
    }

    async fn add_enquiry(&self, enquiry: &Enquiry) -> Result<Enquiry, LeadflowError> {
        let mut enquiry = enquiry.clone();
        ensure_id(&mut enquiry.id);
        let enquiry = enquiry.with_creation_history()?;
        enquiries::insert(self.db()?, &enquiry).await
    }

    async fn update_enquiry(&self, enquiry: &Enquiry) -> Result<Enquiry, LeadflowError> {
        enquiries::update_fields(self.db()?, enquiry).await
    }

    async fn delete_enquiry(&self, id: &str) -> Result<(), LeadflowError> {
        enquiries::delete(self.db()?, id).await
    }

    async fn update_enquiry_stage(
        &self,
        update: &StageUpdate,
    ) -> Result<Option<Enquiry>, LeadflowError> {
        let updated = enquiries::apply_stage(self.db()?, update, self.outbox_max_attempts).await?;
        if let Some(enquiry) = &updated {
            debug!(enquiry_id = %enquiry.id, stage = %enquiry.pipeline_stage, "stage updated");
        }
        Ok(updated)
    }

    // --- Promotions ---

    async fn get_promotions(&self) -> Result<Vec<Promotion>, LeadflowError> {
        queries::list(self.db()?, &PROMOTIONS).await
    }

    async fn add_promotion(&self, promotion: &Promotion) -> Result<Promotion, LeadflowError> {
        let mut promotion = promotion.clone();
        ensure_id(&mut promotion.id);
        queries::insert(self.db()?, &PROMOTIONS, &promotion).await?;
        Ok(promotion)
    }

    async fn update_promotion(&self, promotion: &Promotion) -> Result<Promotion, LeadflowError> {
        queries::upsert(self.db()?, &PROMOTIONS, promotion).await?;
        Ok(promotion.clone())
    }

    async fn delete_promotion(&self, id: &str) -> Result<(), LeadflowError> {
        queries::delete(self.db()?, &PROMOTIONS, id).await
    }

    // --- Staff messaging ---

    async fn get_messages(&self, user_id: &str) -> Result<Vec<Message>, LeadflowError> {
        messages::for_user(self.db()?, user_id).await
    }

    async fn send_message(&self, message: &Message) -> Result<Message, LeadflowError> {
        let mut message = message.clone();
        ensure_id(&mut message.id);
        queries::insert(self.db()?, &MESSAGES, &message).await?;
        Ok(message)
    }

    async fn mark_message_read(&self, id: &str) -> Result<(), LeadflowError> {
        messages::mark_read(self.db()?, id).await
    }

    // --- Outbound message queue ---

    async fn get_queue_items(&self) -> Result<Vec<QueueItem>, LeadflowError> {
        queries::list(self.db()?, &QUEUE).await
    }

    async fn add_queue_item(&self, item: &QueueItem) -> Result<QueueItem, LeadflowError> {
        item.check_ingest()?;
        let mut item = item.clone();
        ensure_id(&mut item.id);
        queries::insert(self.db()?, &QUEUE, &item).await?;
        Ok(item)
    }

    async fn approve_queue_item(&self, id: &str) -> Result<Option<QueueItem>, LeadflowError> {
        queue::transition(self.db()?, id, QueueStatus::Draft, QueueStatus::Queued).await
    }

    async fn withdraw_queue_item(&self, id: &str) -> Result<Option<QueueItem>, LeadflowError> {
        queue::transition(self.db()?, id, QueueStatus::Queued, QueueStatus::Draft).await
    }

    // --- Calls ---

    async fn initiate_call(&self, request: &CallRequest) -> Result<CallLog, LeadflowError> {
        let Some(provider) = &self.calls else {
            return Err(LeadflowError::NotSupported {
                backend: BACKEND,
                operation: "initiate_call",
            });
        };
        let db = self.db()?;
        let log = provider.initiate_call(request).await?;
        queries::insert(db, &CALL_LOGS, &log).await?;
        Ok(log)
    }

    async fn record_call_status(
        &self,
        update: &CallStatusUpdate,
    ) -> Result<Option<CallLog>, LeadflowError> {
        let applied = calls::apply_status(self.db()?, update).await?;
        if applied.is_none() {
            debug!(call_sid = %update.call_sid, "status callback for unknown call");
        }
        Ok(applied)
    }

    async fn get_call_logs(&self, enquiry_id: &str) -> Result<Vec<CallLog>, LeadflowError> {
        calls::for_enquiry(self.db()?, enquiry_id).await
    }
}
