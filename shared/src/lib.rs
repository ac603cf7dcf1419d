use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A bill owned by one user.
///
/// Serialized with camelCase field names on every wire and document surface
/// (`dueDate`, `createdAt`, `ownerId`); the remote relational service is the
/// only place that sees snake_case columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: String,
    /// Display label, required and non-empty
    pub name: String,
    /// Monetary value, non-negative
    pub amount: f64,
    /// Calendar due date (YYYY-MM-DD)
    pub due_date: NaiveDate,
    pub paid: bool,
    /// Filename of a stored attachment, if one was uploaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
    /// Free-text payment code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    /// Set once at creation, immutable
    pub created_at: DateTime<Utc>,
    /// ID of the user this bill belongs to, immutable
    pub owner_id: String,
}

/// Caller-supplied fields for creating a bill; `id` and `created_at` are
/// assigned by whichever store performs the insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBill {
    pub name: String,
    pub amount: f64,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub paid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    pub owner_id: String,
}

impl NewBill {
    /// Promote to a full record with a store-assigned id and creation time.
    pub fn into_bill(self, id: String, created_at: DateTime<Utc>) -> Bill {
        Bill {
            id,
            name: self.name,
            amount: self.amount,
            due_date: self.due_date,
            paid: self.paid,
            attachment: self.attachment,
            barcode: self.barcode,
            created_at,
            owner_id: self.owner_id,
        }
    }
}

/// Partial update for a bill. Only the fields that are present are applied;
/// `id`, `created_at` and `owner_id` are never patchable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
}

impl BillPatch {
    /// Merge the present fields into an existing record, leaving everything
    /// else untouched.
    pub fn apply_to(&self, bill: &mut Bill) {
        if let Some(name) = &self.name {
            bill.name = name.clone();
        }
        if let Some(amount) = self.amount {
            bill.amount = amount;
        }
        if let Some(due_date) = self.due_date {
            bill.due_date = due_date;
        }
        if let Some(paid) = self.paid {
            bill.paid = paid;
        }
        if let Some(attachment) = &self.attachment {
            bill.attachment = Some(attachment.clone());
        }
        if let Some(barcode) = &self.barcode {
            bill.barcode = Some(barcode.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.amount.is_none()
            && self.due_date.is_none()
            && self.paid.is_none()
            && self.attachment.is_none()
            && self.barcode.is_none()
    }
}

/// A login identity. Passwords are stored and compared in plaintext, a
/// carried-over weakness of the system this replaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
}

/// Generate a record ID from the current epoch-millis plus a short random
/// suffix. Unique enough for a single-tenant, low-volume store; not
/// cryptographic, and collisions are possible under heavy concurrency.
pub fn generate_record_id() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards");
    let millis = now.as_millis();
    let suffix = format!("{:x}", now.as_nanos() % (16_u128.pow(8)));
    format!("{}{}", millis, suffix)
}

/// Envelope for every JSON response: a success flag, and on failure an error
/// message string. No structured error codes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn ok_empty() -> Self {
        Self {
            success: true,
            data: None,
            message: None,
            error: None,
        }
    }

    pub fn ok_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bill() -> Bill {
        Bill {
            id: "17000000000000abcd".to_string(),
            name: "Energia".to_string(),
            amount: 180.5,
            due_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            paid: false,
            attachment: None,
            barcode: Some("8366000018".to_string()),
            created_at: Utc::now(),
            owner_id: "user-1".to_string(),
        }
    }

    #[test]
    fn patch_applies_only_present_fields() {
        let mut bill = sample_bill();
        let before = bill.clone();

        let patch = BillPatch {
            paid: Some(true),
            ..Default::default()
        };
        patch.apply_to(&mut bill);

        assert!(bill.paid);
        assert_eq!(bill.name, before.name);
        assert_eq!(bill.amount, before.amount);
        assert_eq!(bill.due_date, before.due_date);
        assert_eq!(bill.barcode, before.barcode);
    }

    #[test]
    fn bill_serializes_with_camel_case_names() {
        let bill = sample_bill();
        let json = serde_json::to_value(&bill).unwrap();
        assert_eq!(json["dueDate"], "2025-03-10");
        assert!(json.get("ownerId").is_some());
        assert!(json.get("createdAt").is_some());
        // absent attachment is omitted entirely
        assert!(json.get("attachment").is_none());
    }

    #[test]
    fn generated_ids_are_distinct() {
        let a = generate_record_id();
        let b = generate_record_id();
        assert_ne!(a, b);
        assert!(a.len() > 13);
    }
}
