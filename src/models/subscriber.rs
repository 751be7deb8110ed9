use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub name: String,

    // channel address, e.g. "5511999990000"
    pub phone: String,
    #[serde(default)]
    pub phone_verified: bool,

    #[serde(default)]
    pub preferences: Preferences,

    // deactivated subscribers are kept, never deleted
    #[serde(default = "default_true")]
    pub active: bool,

    pub created_at: i64,
}

/// Which event categories a subscriber wants, plus the template flavour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default = "default_true")]
    pub documents: bool,
    #[serde(default = "default_true")]
    pub dividends: bool,
    #[serde(default = "default_true")]
    pub price_alerts: bool,
    #[serde(default)]
    pub extended: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            documents: true,
            dividends: true,
            price_alerts: true,
            extended: false,
        }
    }
}

impl Subscriber {
    pub fn can_receive(&self) -> bool {
        self.active && self.phone_verified && !self.phone.trim().is_empty()
    }

    pub fn wants_documents(&self) -> bool {
        self.preferences.documents || self.preferences.dividends
    }
}

fn default_true() -> bool {
    true
}
