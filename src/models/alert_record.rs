use std::fmt;

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Document,
    Dividend,
    Price,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Document => "document",
            AlertKind::Dividend => "dividend",
            AlertKind::Price => "price",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Claimed by a run that has not finished sending yet.
    Pending,
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
        }
    }

    /// Pending and sent records both hold the (subscriber, event key) slot.
    pub fn holds_slot(&self) -> bool {
        matches!(self, DeliveryStatus::Pending | DeliveryStatus::Sent)
    }
}

/// Ledger entry. A pending claim is settled once; a retry is a new record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub subscriber_id: ObjectId,
    pub ticker: String,
    pub kind: AlertKind,

    // "{source}-{documentId}" or "{ticker}-{bucket}-price-{direction}"
    pub event_key: String,
    pub message: String,

    pub status: DeliveryStatus,
    pub external_message_id: Option<String>,
    pub error: Option<String>,

    pub created_at: i64,
}

impl AlertRecord {
    pub fn new(
        subscriber_id: ObjectId,
        ticker: &str,
        kind: AlertKind,
        event_key: &str,
        message: &str,
        status: DeliveryStatus,
        created_at: i64,
    ) -> Self {
        Self {
            id: ObjectId::new(),
            subscriber_id,
            ticker: ticker.to_string(),
            kind,
            event_key: event_key.to_string(),
            message: message.to_string(),
            status,
            external_message_id: None,
            error: None,
            created_at,
        }
    }
}
