//! # Remote Store
//!
//! Adapter translating [`RecordStore`] calls into HTTP requests against a
//! PostgREST-style relational service exposing `bills` and `users`
//! resources. The service speaks snake_case columns (`due_date`,
//! `owner_id`); everything else in this crate speaks camelCase, so the
//! mapping lives in the row structs here and nowhere else.
//!
//! Failures (transport errors, non-success statuses, malformed payloads)
//! are logged and returned as `Err`; the sync facade treats that as the
//! signal to fall back to the cache. Not-found stays a value: an update or
//! delete that matches no row is `Ok(false)`.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::{Bill, BillPatch, NewBill, User};
use tracing::warn;

use super::traits::RecordStore;

pub struct RemoteStore {
    client: reqwest::Client,
    base_url: String,
}

/// Bill row as the relational service stores it.
#[derive(Debug, Serialize, Deserialize)]
struct BillRow {
    id: String,
    name: String,
    amount: f64,
    due_date: NaiveDate,
    paid: bool,
    attachment: Option<String>,
    barcode: Option<String>,
    created_at: DateTime<Utc>,
    owner_id: String,
}

impl From<BillRow> for Bill {
    fn from(row: BillRow) -> Self {
        Bill {
            id: row.id,
            name: row.name,
            amount: row.amount,
            due_date: row.due_date,
            paid: row.paid,
            attachment: row.attachment,
            barcode: row.barcode,
            created_at: row.created_at,
            owner_id: row.owner_id,
        }
    }
}

/// Insert payload; `id` and `created_at` are assigned by the service.
#[derive(Debug, Serialize)]
struct NewBillRow<'a> {
    name: &'a str,
    amount: f64,
    due_date: NaiveDate,
    paid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    attachment: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    barcode: Option<&'a str>,
    owner_id: &'a str,
}

impl<'a> NewBillRow<'a> {
    fn from_draft(draft: &'a NewBill) -> Self {
        Self {
            name: &draft.name,
            amount: draft.amount,
            due_date: draft.due_date,
            paid: draft.paid,
            attachment: draft.attachment.as_deref(),
            barcode: draft.barcode.as_deref(),
            owner_id: &draft.owner_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserRow {
    id: String,
    username: String,
    password: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            password: row.password,
            created_at: row.created_at,
        }
    }
}

/// Column map for partial updates: only the fields present in the patch.
fn patch_payload(patch: &BillPatch) -> serde_json::Map<String, Value> {
    let mut payload = serde_json::Map::new();
    if let Some(name) = &patch.name {
        payload.insert("name".to_string(), json!(name));
    }
    if let Some(amount) = patch.amount {
        payload.insert("amount".to_string(), json!(amount));
    }
    if let Some(due_date) = patch.due_date {
        payload.insert("due_date".to_string(), json!(due_date));
    }
    if let Some(paid) = patch.paid {
        payload.insert("paid".to_string(), json!(paid));
    }
    if let Some(attachment) = &patch.attachment {
        payload.insert("attachment".to_string(), json!(attachment));
    }
    if let Some(barcode) = &patch.barcode {
        payload.insert("barcode".to_string(), json!(barcode));
    }
    payload
}

fn log_remote(op: &'static str) -> impl FnOnce(anyhow::Error) -> anyhow::Error {
    move |e| {
        warn!("remote {} failed: {:#}", op, e);
        e
    }
}

impl RemoteStore {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .context("remote api key is not a valid header value")?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(
            "apikey",
            HeaderValue::from_str(api_key).context("remote api key is not a valid header value")?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("failed to build remote http client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn resource_url(&self, resource: &str) -> String {
        format!("{}/{}", self.base_url, resource)
    }

    async fn fetch_bills(&self, owner_id: &str) -> Result<Vec<Bill>> {
        let rows: Vec<BillRow> = self
            .client
            .get(self.resource_url("bills"))
            .query(&[
                ("owner_id", format!("eq.{}", owner_id)),
                ("order", "due_date.asc".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("malformed bill payload from remote")?;
        Ok(rows.into_iter().map(Bill::from).collect())
    }

    async fn insert_bill(&self, draft: &NewBill) -> Result<Bill> {
        let rows: Vec<BillRow> = self
            .client
            .post(self.resource_url("bills"))
            .header("Prefer", "return=representation")
            .json(&NewBillRow::from_draft(draft))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("malformed insert response from remote")?;
        rows.into_iter()
            .next()
            .map(Bill::from)
            .ok_or_else(|| anyhow!("remote insert returned no row"))
    }

    async fn bill_exists(&self, id: &str) -> Result<bool> {
        let rows: Vec<Value> = self
            .client
            .get(self.resource_url("bills"))
            .query(&[("id", format!("eq.{}", id)), ("select", "id".to_string())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("malformed lookup response from remote")?;
        Ok(!rows.is_empty())
    }

    async fn patch_bill(&self, id: &str, patch: &BillPatch) -> Result<bool> {
        // An empty patch has no payload to send; report whether the row
        // exists so the semantics match the other backends.
        if patch.is_empty() {
            return self.bill_exists(id).await;
        }

        let rows: Vec<Value> = self
            .client
            .patch(self.resource_url("bills"))
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(&patch_payload(patch))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("malformed update response from remote")?;
        Ok(!rows.is_empty())
    }

    async fn delete_bill(&self, id: &str) -> Result<bool> {
        let rows: Vec<Value> = self
            .client
            .delete(self.resource_url("bills"))
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("malformed delete response from remote")?;
        Ok(!rows.is_empty())
    }

    async fn fetch_user(&self, username: &str) -> Result<Option<User>> {
        let rows: Vec<UserRow> = self
            .client
            .get(self.resource_url("users"))
            .query(&[("username", format!("eq.{}", username))])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("malformed user payload from remote")?;
        Ok(rows.into_iter().next().map(User::from))
    }

    async fn insert_user(&self, username: &str, password: &str) -> Result<User> {
        let rows: Vec<UserRow> = self
            .client
            .post(self.resource_url("users"))
            .header("Prefer", "return=representation")
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("malformed insert response from remote")?;
        rows.into_iter()
            .next()
            .map(User::from)
            .ok_or_else(|| anyhow!("remote insert returned no row"))
    }
}

#[async_trait]
impl RecordStore for RemoteStore {
    async fn list_bills(&self, owner_id: &str) -> Result<Vec<Bill>> {
        self.fetch_bills(owner_id)
            .await
            .map_err(log_remote("list_bills"))
    }

    async fn add_bill(&self, draft: NewBill) -> Result<Bill> {
        self.insert_bill(&draft).await.map_err(log_remote("add_bill"))
    }

    async fn update_bill(&self, id: &str, patch: &BillPatch) -> Result<bool> {
        self.patch_bill(id, patch)
            .await
            .map_err(log_remote("update_bill"))
    }

    async fn remove_bill(&self, id: &str) -> Result<bool> {
        self.delete_bill(id).await.map_err(log_remote("remove_bill"))
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>> {
        self.fetch_user(username)
            .await
            .map_err(log_remote("find_user"))
    }

    async fn create_user(&self, username: &str, password: &str) -> Result<User> {
        self.insert_user(username, password)
            .await
            .map_err(log_remote("create_user"))
    }
}
