use serde::{Deserialize, Serialize};

use super::AlertKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Active,
    Superseded,
}

/// One item of the document feed, already matched to a ticker (or not).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: i64,
    // origin tag used in event keys, e.g. "fnet"
    pub source: String,

    pub fund_name: String,
    pub display_name: String,
    pub category: String,
    pub document_type: String,

    pub delivered_at: i64,
    pub status: DocumentStatus,

    pub link: Option<String>,

    // None when the resolver could not infer one
    pub ticker: Option<String>,
}

/// What a document source hands back before ticker resolution.
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub id: i64,
    pub source: String,
    pub fund_name: String,
    pub display_name: String,
    pub category: String,
    pub document_type: String,
    pub delivered_at: i64,
    pub status: DocumentStatus,
    pub link: Option<String>,
}

impl DocumentRecord {
    pub fn from_feed(item: FeedItem, ticker: Option<String>) -> Self {
        Self {
            id: item.id,
            source: item.source,
            fund_name: item.fund_name,
            display_name: item.display_name,
            category: item.category,
            document_type: item.document_type,
            delivered_at: item.delivered_at,
            status: item.status,
            link: item.link,
            ticker,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == DocumentStatus::Active
    }

    pub fn event_key(&self) -> String {
        format!("{}-{}", self.source, self.id)
    }

    /// Income distributions get their own alert category.
    pub fn kind(&self) -> AlertKind {
        let haystack = format!("{} {}", self.category, self.document_type).to_lowercase();
        if ["rendimento", "amortiza", "dividend"]
            .iter()
            .any(|k| haystack.contains(k))
        {
            AlertKind::Dividend
        } else {
            AlertKind::Document
        }
    }
}
