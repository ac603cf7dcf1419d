//! # Cache Store
//!
//! Key/value mirror of the record collections, used when the authoritative
//! backend is unreachable and kept warm by the sync facade otherwise.
//!
//! Layout: one `bills_<owner_id>` key per owner holding that owner's bills
//! as a JSON array, and a single `usuarios` key holding all users. Updates
//! and removals are keyed by bill id alone, so they scan every `bills_*`
//! partition; a known cost of the id-only lookup, kept deliberately.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use shared::{generate_record_id, Bill, BillPatch, NewBill, User};
use sqlx::{migrate::MigrateDatabase, Row, Sqlite, SqlitePool};
use std::sync::Arc;
use tracing::{info, warn};

use super::traits::{KeyValueStore, RecordStore};

pub const USERS_KEY: &str = "usuarios";
pub const BILLS_KEY_PREFIX: &str = "bills_";

fn bills_key(owner_id: &str) -> String {
    format!("{}{}", BILLS_KEY_PREFIX, owner_id)
}

/// Record store over an injected key/value handle.
#[derive(Clone)]
pub struct CacheStore {
    kv: Arc<dyn KeyValueStore>,
}

impl CacheStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    async fn read_partition(&self, key: &str) -> Result<Vec<Bill>> {
        match self.kv.get(key).await? {
            Some(raw) => {
                serde_json::from_str(&raw).with_context(|| format!("corrupt cache entry {}", key))
            }
            None => Ok(Vec::new()),
        }
    }

    async fn write_partition(&self, key: &str, bills: &[Bill]) -> Result<()> {
        let raw = serde_json::to_string(bills)?;
        self.kv.put(key, &raw).await
    }

    async fn read_users(&self) -> Result<Vec<User>> {
        match self.kv.get(USERS_KEY).await? {
            Some(raw) => serde_json::from_str(&raw).context("corrupt cached user collection"),
            None => Ok(Vec::new()),
        }
    }

    async fn write_users(&self, users: &[User]) -> Result<()> {
        let raw = serde_json::to_string(users)?;
        self.kv.put(USERS_KEY, &raw).await
    }

    async fn bill_partition_keys(&self) -> Result<Vec<String>> {
        Ok(self
            .kv
            .keys()
            .await?
            .into_iter()
            .filter(|k| k.starts_with(BILLS_KEY_PREFIX))
            .collect())
    }

    /// Replace one owner's entire bill partition with a freshly fetched
    /// collection. Used by the facade after a successful read.
    pub async fn replace_bills(&self, owner_id: &str, bills: &[Bill]) -> Result<()> {
        self.write_partition(&bills_key(owner_id), bills).await
    }

    /// Insert or replace a single bill inside its owner's partition. Used by
    /// the facade after a successful write, so the cache stays consistent
    /// without a full refetch.
    pub async fn upsert_bill(&self, bill: &Bill) -> Result<()> {
        let key = bills_key(&bill.owner_id);
        let mut bills = self.read_partition(&key).await?;
        match bills.iter_mut().find(|b| b.id == bill.id) {
            Some(existing) => *existing = bill.clone(),
            None => bills.push(bill.clone()),
        }
        self.write_partition(&key, &bills).await
    }

    /// Insert or replace a single user in the cached user collection.
    pub async fn upsert_user(&self, user: &User) -> Result<()> {
        let mut users = self.read_users().await?;
        match users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => *existing = user.clone(),
            None => users.push(user.clone()),
        }
        self.write_users(&users).await
    }
}

#[async_trait]
impl RecordStore for CacheStore {
    async fn list_bills(&self, owner_id: &str) -> Result<Vec<Bill>> {
        let mut bills = self.read_partition(&bills_key(owner_id)).await?;
        bills.sort_by_key(|b| b.due_date);
        Ok(bills)
    }

    async fn add_bill(&self, draft: NewBill) -> Result<Bill> {
        let key = bills_key(&draft.owner_id);
        let mut bills = self.read_partition(&key).await?;
        let bill = draft.into_bill(generate_record_id(), Utc::now());
        bills.push(bill.clone());
        self.write_partition(&key, &bills).await?;
        info!("cached new bill {}", bill.id);
        Ok(bill)
    }

    async fn update_bill(&self, id: &str, patch: &BillPatch) -> Result<bool> {
        // The caller supplies only the bill id, so every owner partition is
        // a candidate; mutate the first one that contains the record.
        for key in self.bill_partition_keys().await? {
            let mut bills = self.read_partition(&key).await?;
            if let Some(bill) = bills.iter_mut().find(|b| b.id == id) {
                patch.apply_to(bill);
                self.write_partition(&key, &bills).await?;
                return Ok(true);
            }
        }
        warn!("bill not found in any cached partition: {}", id);
        Ok(false)
    }

    async fn remove_bill(&self, id: &str) -> Result<bool> {
        for key in self.bill_partition_keys().await? {
            let mut bills = self.read_partition(&key).await?;
            let before = bills.len();
            bills.retain(|b| b.id != id);
            if bills.len() != before {
                self.write_partition(&key, &bills).await?;
                return Ok(true);
            }
        }
        warn!("bill not found in any cached partition: {}", id);
        Ok(false)
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .read_users()
            .await?
            .into_iter()
            .find(|u| u.username == username))
    }

    async fn create_user(&self, username: &str, password: &str) -> Result<User> {
        let mut users = self.read_users().await?;
        let user = User {
            id: generate_record_id(),
            username: username.to_string(),
            password: password.to_string(),
            created_at: Utc::now(),
        };
        users.push(user.clone());
        self.write_users(&users).await?;
        info!("cached new user {}", user.username);
        Ok(user)
    }
}

/// SQLite-backed key/value handle: a single `key_values` table.
#[derive(Clone)]
pub struct SqliteKeyValue {
    pool: Arc<SqlitePool>,
}

impl SqliteKeyValue {
    pub async fn new(url: &str) -> Result<Self> {
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            Sqlite::create_database(url).await?;
        }

        let pool = SqlitePool::connect(url).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS key_values (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// A throwaway in-memory database with a unique name per test.
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        let test_id = uuid::Uuid::new_v4().to_string();
        let url = format!("file:memdb_{}?mode=memory&cache=shared", test_id);
        Self::new(&url).await
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValue {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM key_values WHERE key = ?")
            .bind(key)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.map(|r| r.get("value")))
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO key_values (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&*self.pool)
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM key_values WHERE key = ?")
            .bind(key)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT key FROM key_values")
            .fetch_all(&*self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("key")).collect())
    }
}
