//! # JSON File Store
//!
//! Durable document storage rooted at a data directory:
//!
//! ```text
//! data/
//!   usuarios.json   # array of User
//!   boletos.json    # array of Bill
//!   assets/         # uploaded attachments, by exact filename
//! ```
//!
//! Every operation loads the whole document, mutates the collection in
//! memory and writes the whole document back. There is no partial write and
//! no indexing; two concurrent writers can race and the later write wins.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::{generate_record_id, Bill, BillPatch, NewBill, User};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::traits::RecordStore;
use super::DEFAULT_ACCOUNTS;

pub const USERS_DOCUMENT: &str = "usuarios.json";
pub const BILLS_DOCUMENT: &str = "boletos.json";
pub const ASSETS_SUBDIR: &str = "assets";

/// File-backed record store over two JSON documents.
#[derive(Clone)]
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.data_dir.join(ASSETS_SUBDIR)
    }

    fn users_path(&self) -> PathBuf {
        self.data_dir.join(USERS_DOCUMENT)
    }

    fn bills_path(&self) -> PathBuf {
        self.data_dir.join(BILLS_DOCUMENT)
    }

    /// Parse a document, returning the supplied default when the file is
    /// absent or unreadable. Never errors.
    fn read_document<T: DeserializeOwned>(&self, path: &Path, default: T) -> T {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => return default,
        };
        match serde_json::from_str(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("treating unparsable document {:?} as empty: {}", path, e);
                default
            }
        }
    }

    /// Serialize and overwrite a document. Filesystem failures propagate.
    fn write_document<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let raw = serde_json::to_string_pretty(data)?;
        fs::write(path, raw).with_context(|| format!("failed to write document {:?}", path))
    }

    fn read_users(&self) -> Vec<User> {
        self.read_document(&self.users_path(), Vec::new())
    }

    fn read_bills(&self) -> Vec<Bill> {
        self.read_document(&self.bills_path(), Vec::new())
    }

    fn write_users(&self, users: &[User]) -> Result<()> {
        self.write_document(&self.users_path(), &users)
    }

    fn write_bills(&self, bills: &[Bill]) -> Result<()> {
        self.write_document(&self.bills_path(), &bills)
    }

    /// Ensure the data layout exists and seed the default accounts when the
    /// users document is empty. Safe to call before every operation; after
    /// the first successful run it is equivalent to a no-op.
    pub fn bootstrap(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create data directory {:?}", self.data_dir))?;
        fs::create_dir_all(self.assets_dir())
            .with_context(|| format!("failed to create assets directory {:?}", self.assets_dir()))?;

        let users = self.read_users();
        if users.is_empty() {
            let now = Utc::now();
            let seeded: Vec<User> = DEFAULT_ACCOUNTS
                .iter()
                .map(|(username, password)| User {
                    id: generate_record_id(),
                    username: (*username).to_string(),
                    password: (*password).to_string(),
                    created_at: now,
                })
                .collect();
            self.write_users(&seeded)?;
            info!("seeded {} default accounts", seeded.len());
        }

        if !self.bills_path().exists() {
            self.write_bills(&[])?;
        }

        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn list_bills(&self, owner_id: &str) -> Result<Vec<Bill>> {
        let mut bills: Vec<Bill> = self
            .read_bills()
            .into_iter()
            .filter(|b| b.owner_id == owner_id)
            .collect();
        bills.sort_by_key(|b| b.due_date);
        Ok(bills)
    }

    async fn add_bill(&self, draft: NewBill) -> Result<Bill> {
        let mut bills = self.read_bills();
        let bill = draft.into_bill(generate_record_id(), Utc::now());
        bills.push(bill.clone());
        self.write_bills(&bills)?;
        info!("added bill {} ({})", bill.id, bill.name);
        Ok(bill)
    }

    async fn update_bill(&self, id: &str, patch: &BillPatch) -> Result<bool> {
        let mut bills = self.read_bills();
        let Some(bill) = bills.iter_mut().find(|b| b.id == id) else {
            warn!("bill not found for update: {}", id);
            return Ok(false);
        };
        patch.apply_to(bill);
        self.write_bills(&bills)?;
        info!("updated bill {}", id);
        Ok(true)
    }

    async fn remove_bill(&self, id: &str) -> Result<bool> {
        let mut bills = self.read_bills();
        let before = bills.len();
        bills.retain(|b| b.id != id);
        if bills.len() == before {
            warn!("bill not found for removal: {}", id);
            return Ok(false);
        }
        self.write_bills(&bills)?;
        info!("removed bill {}", id);
        Ok(true)
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .read_users()
            .into_iter()
            .find(|u| u.username == username))
    }

    async fn create_user(&self, username: &str, password: &str) -> Result<User> {
        let mut users = self.read_users();
        let user = User {
            id: generate_record_id(),
            username: username.to_string(),
            password: password.to_string(),
            created_at: Utc::now(),
        };
        users.push(user.clone());
        self.write_users(&users)?;
        info!("created user {}", user.username);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_utils::bill_draft;
    use tempfile::TempDir;

    fn setup_test_store() -> (JsonFileStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp_dir.path());
        store.bootstrap().expect("bootstrap failed");
        (store, temp_dir)
    }

    #[tokio::test]
    async fn bootstrap_is_idempotent() {
        let (store, _temp_dir) = setup_test_store();

        store.bootstrap().expect("second bootstrap failed");

        let users: Vec<User> = store.read_users();
        assert_eq!(users.len(), 2);

        let user = store.find_user("aecreboque").await.unwrap();
        assert_eq!(user.unwrap().password, "123");
    }

    #[tokio::test]
    async fn missing_document_reads_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp_dir.path());

        let bills = store.list_bills("nobody").await.unwrap();
        assert!(bills.is_empty());
    }

    #[tokio::test]
    async fn add_then_list_round_trips_every_field() {
        let (store, _temp_dir) = setup_test_store();

        let draft = bill_draft("Internet", 99.9, "2025-04-02", "user-1");
        let added = store.add_bill(draft.clone()).await.unwrap();
        assert!(!added.id.is_empty());

        let bills = store.list_bills("user-1").await.unwrap();
        assert_eq!(bills.len(), 1);
        assert_eq!(bills[0].name, draft.name);
        assert_eq!(bills[0].amount, draft.amount);
        assert_eq!(bills[0].due_date, draft.due_date);
        assert_eq!(bills[0].paid, draft.paid);
        assert_eq!(bills[0].barcode, draft.barcode);
        assert_eq!(bills[0].owner_id, draft.owner_id);
    }

    #[tokio::test]
    async fn list_filters_by_owner_and_sorts_by_due_date() {
        let (store, _temp_dir) = setup_test_store();

        store
            .add_bill(bill_draft("Later", 10.0, "2025-06-01", "user-1"))
            .await
            .unwrap();
        store
            .add_bill(bill_draft("Other owner", 5.0, "2025-01-01", "user-2"))
            .await
            .unwrap();
        store
            .add_bill(bill_draft("Sooner", 20.0, "2025-02-15", "user-1"))
            .await
            .unwrap();

        let bills = store.list_bills("user-1").await.unwrap();
        assert_eq!(bills.len(), 2);
        assert_eq!(bills[0].name, "Sooner");
        assert_eq!(bills[1].name, "Later");
        assert!(bills.iter().all(|b| b.owner_id == "user-1"));
    }

    #[tokio::test]
    async fn update_patches_only_present_fields() {
        let (store, _temp_dir) = setup_test_store();

        let added = store
            .add_bill(bill_draft("Agua", 55.0, "2025-03-20", "user-1"))
            .await
            .unwrap();

        let patch = BillPatch {
            paid: Some(true),
            ..Default::default()
        };
        assert!(store.update_bill(&added.id, &patch).await.unwrap());

        let bills = store.list_bills("user-1").await.unwrap();
        assert!(bills[0].paid);
        assert_eq!(bills[0].name, "Agua");
        assert_eq!(bills[0].amount, 55.0);
        assert_eq!(bills[0].created_at, added.created_at);
    }

    #[tokio::test]
    async fn remove_unknown_bill_reports_not_found() {
        let (store, _temp_dir) = setup_test_store();

        store
            .add_bill(bill_draft("Luz", 80.0, "2025-05-05", "user-1"))
            .await
            .unwrap();

        assert!(!store.remove_bill("does-not-exist").await.unwrap());
        assert_eq!(store.list_bills("user-1").await.unwrap().len(), 1);

        let added = &store.list_bills("user-1").await.unwrap()[0];
        assert!(store.remove_bill(&added.id).await.unwrap());
        assert!(store.list_bills("user-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_and_find_user() {
        let (store, _temp_dir) = setup_test_store();

        let user = store.create_user("marina", "segredo").await.unwrap();
        assert!(!user.id.is_empty());

        let found = store.find_user("marina").await.unwrap().unwrap();
        assert_eq!(found.password, "segredo");
        assert!(store.find_user("ghost").await.unwrap().is_none());
    }
}
