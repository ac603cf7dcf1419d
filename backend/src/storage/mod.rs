//! # Storage Layer
//!
//! One record-management contract, three interchangeable backends:
//!
//! - [`json_file::JsonFileStore`] — JSON documents on local disk
//! - [`remote::RemoteStore`] — relational service over HTTP
//! - [`cache::CacheStore`] — key/value mirror used for failover
//!
//! [`sync::SyncService`] arbitrates between them; [`assets::AssetStore`]
//! handles uploaded attachments separately from the record documents.

pub mod assets;
pub mod cache;
pub mod json_file;
pub mod remote;
pub mod sync;
pub mod traits;

#[cfg(test)]
pub mod test_utils;

pub use assets::{AssetError, AssetStore};
pub use cache::{CacheStore, SqliteKeyValue};
pub use json_file::JsonFileStore;
pub use remote::RemoteStore;
pub use sync::SyncService;
pub use traits::{KeyValueStore, RecordStore};

/// Accounts seeded when the user collection is empty.
pub const DEFAULT_ACCOUNTS: &[(&str, &str)] = &[("aecreboque", "123"), ("gabriel", "laranja42")];
