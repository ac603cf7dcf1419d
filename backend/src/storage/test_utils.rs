//! Shared fixtures for storage tests: an in-memory key/value fake and a
//! record store that always fails, for exercising the fallback path.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use shared::{Bill, BillPatch, NewBill, User};
use std::collections::HashMap;
use std::sync::Mutex;

use super::traits::{KeyValueStore, RecordStore};

/// Build a bill draft with the fields tests care about.
pub fn bill_draft(name: &str, amount: f64, due_date: &str, owner_id: &str) -> NewBill {
    NewBill {
        name: name.to_string(),
        amount,
        due_date: NaiveDate::parse_from_str(due_date, "%Y-%m-%d").unwrap(),
        paid: false,
        attachment: None,
        barcode: Some("00190500954014481606906809350314".to_string()),
        owner_id: owner_id.to_string(),
    }
}

/// In-memory stand-in for the SQLite key/value handle.
#[derive(Default)]
pub struct MemoryKeyValue {
    entries: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl KeyValueStore for MemoryKeyValue {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.entries.lock().unwrap().remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.lock().unwrap().keys().cloned().collect())
    }
}

/// A record store whose every operation fails, simulating an unreachable
/// remote service.
pub struct FailingStore;

#[async_trait]
impl RecordStore for FailingStore {
    async fn list_bills(&self, _owner_id: &str) -> Result<Vec<Bill>> {
        Err(anyhow!("remote unavailable"))
    }

    async fn add_bill(&self, _draft: NewBill) -> Result<Bill> {
        Err(anyhow!("remote unavailable"))
    }

    async fn update_bill(&self, _id: &str, _patch: &BillPatch) -> Result<bool> {
        Err(anyhow!("remote unavailable"))
    }

    async fn remove_bill(&self, _id: &str) -> Result<bool> {
        Err(anyhow!("remote unavailable"))
    }

    async fn find_user(&self, _username: &str) -> Result<Option<User>> {
        Err(anyhow!("remote unavailable"))
    }

    async fn create_user(&self, _username: &str, _password: &str) -> Result<User> {
        Err(anyhow!("remote unavailable"))
    }
}
