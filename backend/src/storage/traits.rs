//! # Storage Traits
//!
//! Abstractions that let the sync facade treat the remote service, the local
//! JSON documents, and the key/value cache as interchangeable backends.

use anyhow::Result;
use async_trait::async_trait;
use shared::{Bill, BillPatch, NewBill, User};

/// The record-management contract every storage backend implements.
///
/// All three implementations (remote relational service, local JSON files,
/// key/value cache) must behave identically: same filtering, same sort
/// order, same id generation, same field-merge-on-update. Not-found is a
/// value (`false` / `None`), never an error; `Err` means the backend itself
/// failed and the caller may try another one.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// List one owner's bills, sorted ascending by due date.
    async fn list_bills(&self, owner_id: &str) -> Result<Vec<Bill>>;

    /// Insert a bill, assigning `id` and `created_at`, and return the
    /// stored record.
    async fn add_bill(&self, draft: NewBill) -> Result<Bill>;

    /// Merge the present patch fields into the bill with the given id.
    /// Returns `false` when no such bill exists.
    async fn update_bill(&self, id: &str, patch: &BillPatch) -> Result<bool>;

    /// Permanently delete a bill. Returns `false` when no such bill exists.
    async fn remove_bill(&self, id: &str) -> Result<bool>;

    /// Look up a user by username.
    async fn find_user(&self, username: &str) -> Result<Option<User>>;

    /// Insert a user, assigning `id` and `created_at`, and return the
    /// stored record.
    async fn create_user(&self, username: &str, password: &str) -> Result<User>;
}

/// A minimal key/value handle backing the cache store.
///
/// Injected rather than ambient so tests can substitute an in-memory fake
/// for the SQLite table used in production.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Returns `true` if the key existed.
    async fn remove(&self, key: &str) -> Result<bool>;

    /// Every key currently present, in no particular order.
    async fn keys(&self) -> Result<Vec<String>>;
}
