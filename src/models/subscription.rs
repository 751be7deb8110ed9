use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoredAsset {
    // canonical uppercase code, e.g. "HGLG11"
    #[serde(rename = "_id")]
    pub ticker: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlertFrequency {
    Realtime,
    #[default]
    Daily,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub subscriber_id: ObjectId,
    pub ticker: String,

    pub notifications_enabled: bool,
    pub price_alert_enabled: bool,
    pub min_variation_percent: f64,
    #[serde(default)]
    pub alert_frequency: AlertFrequency,

    pub created_at: i64,
}

/// A subscription joined with the asset it follows.
#[derive(Debug, Clone)]
pub struct FollowedAsset {
    pub asset: MonitoredAsset,
    pub subscription: Subscription,
}
