// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value implementation of the Repository trait.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use leadflow_config::model::LocalConfig;
use leadflow_core::{
    Backend, BackendCapabilities, Branch, CallLog, CallRequest, CallStatusUpdate, Enquiry,
    HealthStatus, LeadflowError, Message, Product, Promotion, QueueItem, QueueStatus, Repository,
    Role, StageUpdate, User,
};

use crate::credentials::{hash_password, verify_password};
use crate::fixtures;
use crate::store::{keys, Collections, KvStore};

const BACKEND: &str = "local";

/// A user as persisted locally: the profile plus its password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredUser {
    #[serde(flatten)]
    profile: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password_hash: Option<String>,
}

/// Records addressable by id inside a flat collection.
trait Keyed {
    fn key(&self) -> &str;
}

macro_rules! keyed_by_id {
    ($($ty:ty),*) => {
        $(impl Keyed for $ty {
            fn key(&self) -> &str {
                &self.id
            }
        })*
    };
}

keyed_by_id!(Branch, Product, Enquiry, Promotion, Message, QueueItem);

impl Keyed for StoredUser {
    fn key(&self) -> &str {
        &self.profile.id
    }
}

fn ensure_id(id: &mut String) {
    if id.trim().is_empty() {
        *id = uuid::Uuid::new_v4().to_string();
    }
}

fn upsert_in<T: Keyed>(items: &mut Vec<T>, item: T) {
    match items.iter_mut().find(|existing| existing.key() == item.key()) {
        Some(slot) => *slot = item,
        None => items.push(item),
    }
}

/// Overlay the fixture catalog onto the stored products.
///
/// Fixture products replace their stored copies unless `overrides` names
/// them; non-fixture products are left alone.
fn reseed_products(
    c: &Collections<'_>,
    overrides: &HashSet<String>,
) -> Result<Vec<Product>, LeadflowError> {
    let mut stored: Vec<Product> = c.load(keys::PRODUCTS)?;
    for fixture in fixtures::products() {
        match stored.iter_mut().find(|p| p.id == fixture.id) {
            Some(slot) if !overrides.contains(&fixture.id) => *slot = fixture,
            Some(_) => {}
            None => stored.push(fixture),
        }
    }
    c.save(keys::PRODUCTS, &stored)?;
    Ok(stored)
}

/// Local backend over a single key-value table.
///
/// The store is opened on [`Backend::initialize`]; every operation before
/// that fails with a storage error.
pub struct LocalRepository {
    config: LocalConfig,
    store: OnceCell<KvStore>,
    /// Fixture products explicitly updated during this process session.
    product_overrides: Arc<Mutex<HashSet<String>>>,
}

impl LocalRepository {
    pub fn new(config: LocalConfig) -> Self {
        Self {
            config,
            store: OnceCell::new(),
            product_overrides: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    fn store(&self) -> Result<&KvStore, LeadflowError> {
        self.store.get().ok_or_else(|| LeadflowError::Storage {
            source: "local store not initialized -- call initialize() first".into(),
        })
    }

    fn overrides(&self) -> HashSet<String> {
        self.product_overrides
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    async fn seed_fixtures(&self) -> Result<(), LeadflowError> {
        let store = self.store()?;

        if !store.with(|c| c.contains(keys::USERS)).await? {
            let mut users = Vec::new();
            for fixture in fixtures::users() {
                users.push(StoredUser {
                    profile: fixture.user,
                    password_hash: Some(hash_password(fixture.password)?),
                });
            }
            let count = users.len();
            store
                .with(move |c| {
                    if !c.contains(keys::USERS)? {
                        c.save(keys::USERS, &users)?;
                    }
                    Ok(())
                })
                .await?;
            info!(count, "seeded fixture users");
        }

        store
            .with(|c| {
                if !c.contains(keys::BRANCHES)? {
                    c.save(keys::BRANCHES, &fixtures::branches())?;
                }
                Ok(())
            })
            .await?;

        let overrides = self.overrides();
        store
            .with(move |c| reseed_products(c, &overrides).map(|_| ()))
            .await
    }

    async fn list<T>(&self, key: &'static str) -> Result<Vec<T>, LeadflowError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.store()?.with(move |c| c.load(key)).await
    }

    async fn insert<T>(
        &self,
        key: &'static str,
        entity: &'static str,
        mut item: T,
        id: impl FnOnce(&mut T) -> &mut String,
    ) -> Result<T, LeadflowError>
    where
        T: Keyed + Clone + Serialize + DeserializeOwned + Send + 'static,
    {
        ensure_id(id(&mut item));
        self.store()?
            .with(move |c| {
                let mut items: Vec<T> = c.load(key)?;
                if items.iter().any(|existing| existing.key() == item.key()) {
                    return Err(LeadflowError::DuplicateKey {
                        entity,
                        key: item.key().to_string(),
                    });
                }
                items.push(item.clone());
                c.save(key, &items)?;
                Ok(item)
            })
            .await
    }

    async fn upsert<T>(&self, key: &'static str, item: T) -> Result<T, LeadflowError>
    where
        T: Keyed + Clone + Serialize + DeserializeOwned + Send + 'static,
    {
        self.store()?
            .with(move |c| {
                let mut items: Vec<T> = c.load(key)?;
                upsert_in(&mut items, item.clone());
                c.save(key, &items)?;
                Ok(item)
            })
            .await
    }

    async fn remove<T>(&self, key: &'static str, id: &str) -> Result<(), LeadflowError>
    where
        T: Keyed + Serialize + DeserializeOwned + Send + 'static,
    {
        let id = id.to_string();
        self.store()?
            .with(move |c| {
                let mut items: Vec<T> = c.load(key)?;
                let before = items.len();
                items.retain(|item| item.key() != id);
                if items.len() != before {
                    c.save(key, &items)?;
                }
                Ok(())
            })
            .await
    }

    async fn transition_queue_item(
        &self,
        id: &str,
        from: QueueStatus,
        to: QueueStatus,
    ) -> Result<Option<QueueItem>, LeadflowError> {
        let id = id.to_string();
        self.store()?
            .with(move |c| {
                let mut items: Vec<QueueItem> = c.load(keys::QUEUE)?;
                let Some(item) = items.iter_mut().find(|item| item.id == id) else {
                    return Ok(None);
                };
                if item.status != from {
                    return Err(LeadflowError::InvalidState(format!(
                        "queue item `{id}` is `{}`, expected `{from}`",
                        item.status
                    )));
                }
                item.status = to;
                item.updated_at = Utc::now();
                let updated = item.clone();
                c.save(keys::QUEUE, &items)?;
                Ok(Some(updated))
            })
            .await
    }
}

#[async_trait]
impl Backend for LocalRepository {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            delete_product: false,
            sku_auto_resolution: false,
            call_initiation: false,
            conversion_outbox: false,
        }
    }

    async fn initialize(&self) -> Result<(), LeadflowError> {
        let store = KvStore::open(&self.config.database_path).await?;
        self.store.set(store).map_err(|_| LeadflowError::Storage {
            source: "local store already initialized".into(),
        })?;
        self.seed_fixtures().await?;
        debug!(path = %self.config.database_path, "local store initialized");
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, LeadflowError> {
        match self.store.get() {
            None => Ok(HealthStatus::Unhealthy("not initialized".into())),
            Some(store) => {
                store.ping().await?;
                Ok(HealthStatus::Healthy)
            }
        }
    }

    async fn shutdown(&self) -> Result<(), LeadflowError> {
        debug!("local store shut down");
        Ok(())
    }
}

#[async_trait]
impl Repository for LocalRepository {
    // --- Users ---

    async fn get_users(&self) -> Result<Vec<User>, LeadflowError> {
        let stored: Vec<StoredUser> = self.list(keys::USERS).await?;
        Ok(stored
            .into_iter()
            .map(|u| u.profile.without_password())
            .collect())
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, LeadflowError> {
        Ok(self.get_users().await?.into_iter().find(|u| u.id == id))
    }

    async fn add_user(&self, user: &User) -> Result<User, LeadflowError> {
        user.validate()?;
        let mut profile = user.clone();
        ensure_id(&mut profile.id);
        let password_hash = match profile.password.take() {
            Some(password) => Some(hash_password(&password)?),
            None => None,
        };

        self.store()?
            .with(move |c| {
                let mut users: Vec<StoredUser> = c.load(keys::USERS)?;
                if users.iter().any(|u| u.profile.has_username(&profile.username)) {
                    return Err(LeadflowError::DuplicateKey {
                        entity: "user",
                        key: profile.username.clone(),
                    });
                }
                if users.iter().any(|u| u.profile.id == profile.id) {
                    return Err(LeadflowError::DuplicateKey {
                        entity: "user",
                        key: profile.id.clone(),
                    });
                }
                users.push(StoredUser {
                    profile: profile.clone(),
                    password_hash,
                });
                c.save(keys::USERS, &users)?;
                Ok(profile)
            })
            .await
    }

    async fn update_user(&self, user: &User) -> Result<User, LeadflowError> {
        user.validate()?;
        let mut profile = user.clone();
        let new_hash = match profile.password.take() {
            Some(password) => {
                profile.password_last_changed = Some(Utc::now());
                Some(hash_password(&password)?)
            }
            None => None,
        };

        self.store()?
            .with(move |c| {
                let mut users: Vec<StoredUser> = c.load(keys::USERS)?;
                if users
                    .iter()
                    .any(|u| u.profile.id != profile.id && u.profile.has_username(&profile.username))
                {
                    return Err(LeadflowError::DuplicateKey {
                        entity: "user",
                        key: profile.username.clone(),
                    });
                }
                let existing_hash = users
                    .iter()
                    .find(|u| u.profile.id == profile.id)
                    .and_then(|u| u.password_hash.clone());
                upsert_in(
                    &mut users,
                    StoredUser {
                        profile: profile.clone(),
                        password_hash: new_hash.or(existing_hash),
                    },
                );
                c.save(keys::USERS, &users)?;
                Ok(profile)
            })
            .await
    }

    async fn delete_user(&self, id: &str) -> Result<(), LeadflowError> {
        self.remove::<StoredUser>(keys::USERS, id).await
    }

    async fn login(&self, username: &str, password: &str) -> Result<User, LeadflowError> {
        let stored: Vec<StoredUser> = self.list(keys::USERS).await?;
        let matched = stored.into_iter().find(|u| u.profile.has_username(username));

        match matched {
            Some(StoredUser {
                profile,
                password_hash: Some(hash),
            }) if verify_password(password, &hash) => {
                debug!(user_id = %profile.id, "local login succeeded");
                Ok(profile.without_password())
            }
            _ => {
                debug!(username, "local login rejected");
                Err(LeadflowError::AuthFailed(
                    "invalid username or password".into(),
                ))
            }
        }
    }

    // --- Branches ---

    async fn get_branches(&self) -> Result<Vec<Branch>, LeadflowError> {
        self.list(keys::BRANCHES).await
    }

    async fn add_branch(&self, branch: &Branch) -> Result<Branch, LeadflowError> {
        self.insert(keys::BRANCHES, "branch", branch.clone(), |b| &mut b.id)
            .await
    }

    async fn update_branch(&self, branch: &Branch) -> Result<Branch, LeadflowError> {
        self.upsert(keys::BRANCHES, branch.clone()).await
    }

    async fn delete_branch(&self, id: &str) -> Result<(), LeadflowError> {
        let id = id.to_string();
        let removed_admins = self
            .store()?
            .with(move |c| {
                let mut branches: Vec<Branch> = c.load(keys::BRANCHES)?;
                branches.retain(|b| b.id != id);
                c.save(keys::BRANCHES, &branches)?;

                let mut users: Vec<StoredUser> = c.load(keys::USERS)?;
                let before = users.len();
                users.retain(|u| {
                    !(u.profile.role == Role::BranchAdmin
                        && u.profile.branch_id.as_deref() == Some(id.as_str()))
                });
                c.save(keys::USERS, &users)?;
                Ok(before - users.len())
            })
            .await?;
        debug!(removed_admins, "branch deleted");
        Ok(())
    }

    // --- Products ---

    async fn get_products(&self) -> Result<Vec<Product>, LeadflowError> {
        let overrides = self.overrides();
        self.store()?
            .with(move |c| reseed_products(c, &overrides))
            .await
    }

    async fn add_product(&self, product: &Product) -> Result<Product, LeadflowError> {
        let mut product = product.clone();
        ensure_id(&mut product.id);
        let overrides = self.overrides();

        self.store()?
            .with(move |c| {
                let mut products = reseed_products(c, &overrides)?;
                if products.iter().any(|p| p.id == product.id) {
                    return Err(LeadflowError::DuplicateKey {
                        entity: "product",
                        key: product.id.clone(),
                    });
                }
                if products.iter().any(|p| p.sku == product.sku) {
                    return Err(LeadflowError::DuplicateKey {
                        entity: "product",
                        key: product.sku.clone(),
                    });
                }
                products.push(product.clone());
                c.save(keys::PRODUCTS, &products)?;
                Ok(product)
            })
            .await
    }

    async fn update_product(&self, product: &Product) -> Result<Product, LeadflowError> {
        let mut overrides = self.overrides();
        overrides.insert(product.id.clone());
        let product = product.clone();

        let updated = self
            .store()?
            .with(move |c| {
                let mut products = reseed_products(c, &overrides)?;
                if products
                    .iter()
                    .any(|p| p.id != product.id && p.sku == product.sku)
                {
                    return Err(LeadflowError::DuplicateKey {
                        entity: "product",
                        key: product.sku.clone(),
                    });
                }
                upsert_in(&mut products, product.clone());
                c.save(keys::PRODUCTS, &products)?;
                Ok(product)
            })
            .await?;

        if fixtures::is_fixture_product(&updated.id) {
            self.product_overrides
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .insert(updated.id.clone());
        }
        Ok(updated)
    }

    async fn delete_product(&self, _id: &str) -> Result<(), LeadflowError> {
        Err(LeadflowError::NotSupported {
            backend: BACKEND,
            operation: "delete_product",
        })
    }

    // --- Enquiries ---

    async fn get_enquiries(&self) -> Result<Vec<Enquiry>, LeadflowError> {
        self.list(keys::ENQUIRIES).await
    }

    async fn get_enquiry(&self, id: &str) -> Result<Option<Enquiry>, LeadflowError> {
        Ok(self
            .get_enquiries()
            .await?
            .into_iter()
            .find(|e| e.id == id))
    }

    async fn add_enquiry(&self, enquiry: &Enquiry) -> Result<Enquiry, LeadflowError> {
        let enquiry = enquiry.clone().with_creation_history()?;
        self.insert(keys::ENQUIRIES, "enquiry", enquiry, |e| &mut e.id)
            .await
    }

    async fn update_enquiry(&self, enquiry: &Enquiry) -> Result<Enquiry, LeadflowError> {
        let mut incoming = enquiry.clone();
        self.store()?
            .with(move |c| {
                let mut enquiries: Vec<Enquiry> = c.load(keys::ENQUIRIES)?;
                let incoming = match enquiries.iter().find(|e| e.id == incoming.id) {
                    Some(existing) => {
                        if existing.branch_id != incoming.branch_id {
                            return Err(LeadflowError::Validation(format!(
                                "enquiry `{}` cannot move from branch `{}` to `{}`",
                                incoming.id, existing.branch_id, incoming.branch_id
                            )));
                        }
                        incoming.pipeline_stage = existing.pipeline_stage;
                        incoming.history = existing.history.clone();
                        incoming
                    }
                    None => incoming.with_creation_history()?,
                };
                upsert_in(&mut enquiries, incoming.clone());
                c.save(keys::ENQUIRIES, &enquiries)?;
                Ok(incoming)
            })
            .await
    }

    async fn delete_enquiry(&self, id: &str) -> Result<(), LeadflowError> {
        self.remove::<Enquiry>(keys::ENQUIRIES, id).await
    }

    async fn update_enquiry_stage(
        &self,
        update: &StageUpdate,
    ) -> Result<Option<Enquiry>, LeadflowError> {
        let update = update.clone();
        self.store()?
            .with(move |c| {
                let mut enquiries: Vec<Enquiry> = c.load(keys::ENQUIRIES)?;
                let Some(enquiry) = enquiries.iter_mut().find(|e| e.id == update.enquiry_id)
                else {
                    return Ok(None);
                };
                enquiry.apply_stage(&update, Utc::now());
                let updated = enquiry.clone();
                c.save(keys::ENQUIRIES, &enquiries)?;
                debug!(enquiry_id = %updated.id, stage = %updated.pipeline_stage, "stage updated");
                Ok(Some(updated))
            })
            .await
    }

    // --- Promotions ---

    async fn get_promotions(&self) -> Result<Vec<Promotion>, LeadflowError> {
        self.list(keys::PROMOTIONS).await
    }

    async fn add_promotion(&self, promotion: &Promotion) -> Result<Promotion, LeadflowError> {
        self.insert(keys::PROMOTIONS, "promotion", promotion.clone(), |p| &mut p.id)
            .await
    }

    async fn update_promotion(&self, promotion: &Promotion) -> Result<Promotion, LeadflowError> {
        self.upsert(keys::PROMOTIONS, promotion.clone()).await
    }

    async fn delete_promotion(&self, id: &str) -> Result<(), LeadflowError> {
        self.remove::<Promotion>(keys::PROMOTIONS, id).await
    }

    // --- Staff messaging ---

    async fn get_messages(&self, user_id: &str) -> Result<Vec<Message>, LeadflowError> {
        let user_id = user_id.to_string();
        self.store()?
            .with(move |c| {
                let users: Vec<StoredUser> = c.load(keys::USERS)?;
                let branch = users
                    .iter()
                    .find(|u| u.profile.id == user_id)
                    .and_then(|u| u.profile.branch_id.clone());

                let mut messages: Vec<Message> = c.load(keys::MESSAGES)?;
                messages.retain(|m| {
                    m.involves(&user_id)
                        || (m.recipient_id.is_none()
                            && (m.branch_id.is_none() || m.branch_id == branch))
                });
                messages.sort_by_key(|m| m.created_at);
                Ok(messages)
            })
            .await
    }

    async fn send_message(&self, message: &Message) -> Result<Message, LeadflowError> {
        self.insert(keys::MESSAGES, "message", message.clone(), |m| &mut m.id)
            .await
    }

    async fn mark_message_read(&self, id: &str) -> Result<(), LeadflowError> {
        let id = id.to_string();
        self.store()?
            .with(move |c| {
                let mut messages: Vec<Message> = c.load(keys::MESSAGES)?;
                let Some(message) = messages.iter_mut().find(|m| m.id == id) else {
                    return Err(LeadflowError::NotFound {
                        entity: "message",
                        id,
                    });
                };
                message.read = true;
                c.save(keys::MESSAGES, &messages)
            })
            .await
    }

    // --- Outbound message queue ---

    async fn get_queue_items(&self) -> Result<Vec<QueueItem>, LeadflowError> {
        self.list(keys::QUEUE).await
    }

    async fn add_queue_item(&self, item: &QueueItem) -> Result<QueueItem, LeadflowError> {
        item.check_ingest()?;
        self.insert(keys::QUEUE, "queue item", item.clone(), |q| &mut q.id)
            .await
    }

    async fn approve_queue_item(&self, id: &str) -> Result<Option<QueueItem>, LeadflowError> {
        self.transition_queue_item(id, QueueStatus::Draft, QueueStatus::Queued)
            .await
    }

    async fn withdraw_queue_item(&self, id: &str) -> Result<Option<QueueItem>, LeadflowError> {
        self.transition_queue_item(id, QueueStatus::Queued, QueueStatus::Draft)
            .await
    }

    // --- Calls ---

    async fn initiate_call(&self, request: &CallRequest) -> Result<CallLog, LeadflowError> {
        warn!(enquiry_id = %request.enquiry_id, "call initiation requested on local backend");
        Err(LeadflowError::NotSupported {
            backend: BACKEND,
            operation: "initiate_call",
        })
    }

    async fn record_call_status(
        &self,
        _update: &CallStatusUpdate,
    ) -> Result<Option<CallLog>, LeadflowError> {
        Err(LeadflowError::NotSupported {
            backend: BACKEND,
            operation: "record_call_status",
        })
    }

    async fn get_call_logs(&self, _enquiry_id: &str) -> Result<Vec<CallLog>, LeadflowError> {
        Ok(Vec::new())
    }
}
