//! # Sync Facade
//!
//! The single entry point the REST layer calls. Every operation goes to the
//! authoritative backend first (the remote adapter when one is configured,
//! the local JSON file store otherwise). Successes are mirrored into the
//! cache — reads replace the owner's whole partition, writes merge the one
//! affected record — and any authoritative failure falls back to the
//! cache's equivalent operation, so callers cannot tell which backend
//! served them except through latency.

use anyhow::Result;
use shared::{Bill, BillPatch, NewBill, User};
use std::sync::Arc;
use tracing::{info, warn};

use super::cache::CacheStore;
use super::traits::RecordStore;
use super::DEFAULT_ACCOUNTS;

pub struct SyncService {
    primary: Arc<dyn RecordStore>,
    cache: CacheStore,
}

impl SyncService {
    pub fn new(primary: Arc<dyn RecordStore>, cache: CacheStore) -> Self {
        Self { primary, cache }
    }

    /// Ensure the two default accounts exist, find-then-create. Idempotent:
    /// a second run finds the users and creates nothing.
    pub async fn ensure_default_users(&self) -> Result<()> {
        for (username, password) in DEFAULT_ACCOUNTS {
            if self.find_user(username).await?.is_none() {
                self.create_user(username, password).await?;
                info!("seeded default account {}", username);
            }
        }
        Ok(())
    }

    pub async fn list_bills(&self, owner_id: &str) -> Result<Vec<Bill>> {
        match self.primary.list_bills(owner_id).await {
            Ok(bills) => {
                if let Err(e) = self.cache.replace_bills(owner_id, &bills).await {
                    warn!("failed to mirror bills for {}: {:#}", owner_id, e);
                }
                Ok(bills)
            }
            Err(e) => {
                warn!("serving cached bills for {}: {:#}", owner_id, e);
                self.cache.list_bills(owner_id).await
            }
        }
    }

    pub async fn add_bill(&self, draft: NewBill) -> Result<Bill> {
        match self.primary.add_bill(draft.clone()).await {
            Ok(bill) => {
                if let Err(e) = self.cache.upsert_bill(&bill).await {
                    warn!("failed to mirror bill {}: {:#}", bill.id, e);
                }
                Ok(bill)
            }
            Err(e) => {
                warn!("caching bill instead: {:#}", e);
                self.cache.add_bill(draft).await
            }
        }
    }

    pub async fn update_bill(&self, id: &str, patch: &BillPatch) -> Result<bool> {
        match self.primary.update_bill(id, patch).await {
            Ok(updated) => {
                if updated {
                    if let Err(e) = self.cache.update_bill(id, patch).await {
                        warn!("failed to mirror update of {}: {:#}", id, e);
                    }
                }
                Ok(updated)
            }
            Err(e) => {
                warn!("updating cached bill instead: {:#}", e);
                self.cache.update_bill(id, patch).await
            }
        }
    }

    pub async fn remove_bill(&self, id: &str) -> Result<bool> {
        match self.primary.remove_bill(id).await {
            Ok(removed) => {
                if removed {
                    if let Err(e) = self.cache.remove_bill(id).await {
                        warn!("failed to mirror removal of {}: {:#}", id, e);
                    }
                }
                Ok(removed)
            }
            Err(e) => {
                warn!("removing cached bill instead: {:#}", e);
                self.cache.remove_bill(id).await
            }
        }
    }

    pub async fn find_user(&self, username: &str) -> Result<Option<User>> {
        match self.primary.find_user(username).await {
            Ok(found) => {
                if let Some(user) = &found {
                    if let Err(e) = self.cache.upsert_user(user).await {
                        warn!("failed to mirror user {}: {:#}", user.username, e);
                    }
                }
                Ok(found)
            }
            Err(e) => {
                warn!("serving cached user lookup for {}: {:#}", username, e);
                self.cache.find_user(username).await
            }
        }
    }

    pub async fn create_user(&self, username: &str, password: &str) -> Result<User> {
        match self.primary.create_user(username, password).await {
            Ok(user) => {
                if let Err(e) = self.cache.upsert_user(&user).await {
                    warn!("failed to mirror user {}: {:#}", user.username, e);
                }
                Ok(user)
            }
            Err(e) => {
                warn!("caching user instead: {:#}", e);
                self.cache.create_user(username, password).await
            }
        }
    }
}
