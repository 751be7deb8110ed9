use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Append-only; the newest row per ticker is the reference price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSnapshot {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub ticker: String,
    pub price: f64,
    pub variance_percent: f64,
    pub volume: Option<f64>,

    pub created_at: i64,
}

impl PriceSnapshot {
    pub fn new(ticker: &str, price: f64, variance_percent: f64, volume: Option<f64>, at: i64) -> Self {
        Self {
            id: ObjectId::new(),
            ticker: ticker.to_uppercase(),
            price,
            variance_percent,
            volume,
            created_at: at,
        }
    }
}
