//! Environment-driven settings, collected once at startup.

use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_CACHE_URL: &str = "sqlite:cache.db";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the JSON documents and the assets subdirectory.
    pub data_dir: PathBuf,
    /// SQLite URL backing the key/value cache.
    pub cache_url: String,
    /// Base URL of the remote relational service. When absent the local
    /// file store is the authoritative backend.
    pub remote_url: Option<String>,
    /// API key sent to the remote service.
    pub remote_key: String,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let data_dir = env::var("BILLS_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
        let cache_url =
            env::var("BILLS_CACHE_URL").unwrap_or_else(|_| DEFAULT_CACHE_URL.to_string());
        let remote_url = env::var("BILLS_REMOTE_URL").ok().filter(|v| !v.is_empty());
        let remote_key = env::var("BILLS_REMOTE_KEY").unwrap_or_default();
        let bind_addr = env::var("BILLS_BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("BILLS_BIND_ADDR is not a valid socket address")?;

        Ok(Self {
            data_dir: PathBuf::from(data_dir),
            cache_url,
            remote_url,
            remote_key,
            bind_addr,
        })
    }
}
