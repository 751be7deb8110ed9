use std::collections::HashMap;

use async_trait::async_trait;
use futures_util::StreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::options::FindOptions;
use mongodb::Database;

use crate::{
    error::PipelineError,
    models::{FollowedAsset, MonitoredAsset, Subscriber, Subscription},
};

/// Read side of the subscriber/subscription data owned by the dashboard.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    async fn active_subscribers(&self) -> Result<Vec<Subscriber>, PipelineError>;

    async fn follow_list(&self, subscriber_id: ObjectId) -> Result<Vec<FollowedAsset>, PipelineError>;
}

/// `active` defaults to true when absent, so only an explicit `false` excludes.
pub fn active_subscriber_filter() -> Document {
    doc! { "active": { "$ne": false } }
}

#[derive(Clone)]
pub struct MongoSubscriberStore {
    db: Database,
}

impl MongoSubscriberStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SubscriberStore for MongoSubscriberStore {
    async fn active_subscribers(&self) -> Result<Vec<Subscriber>, PipelineError> {
        let subscribers = self.db.collection::<Subscriber>("subscribers");

        let find_opts = FindOptions::builder().sort(doc! { "created_at": 1 }).build();
        let mut cursor = subscribers.find(active_subscriber_filter(), find_opts).await?;

        let mut items = Vec::new();
        while let Some(res) = cursor.next().await {
            items.push(res?);
        }

        Ok(items)
    }

    async fn follow_list(&self, subscriber_id: ObjectId) -> Result<Vec<FollowedAsset>, PipelineError> {
        let subscriptions = self.db.collection::<Subscription>("subscriptions");
        let assets = self.db.collection::<MonitoredAsset>("assets");

        let find_opts = FindOptions::builder().sort(doc! { "ticker": 1 }).build();
        let mut cursor = subscriptions
            .find(doc! { "subscriber_id": subscriber_id }, find_opts)
            .await?;

        let mut subs = Vec::new();
        while let Some(res) = cursor.next().await {
            subs.push(res?);
        }

        if subs.is_empty() {
            return Ok(Vec::new());
        }

        let tickers: Vec<&str> = subs.iter().map(|s| s.ticker.as_str()).collect();
        let mut cursor = assets.find(doc! { "_id": { "$in": tickers } }, None).await?;

        let mut by_ticker: HashMap<String, MonitoredAsset> = HashMap::new();
        while let Some(res) = cursor.next().await {
            let a = res?;
            by_ticker.insert(a.ticker.clone(), a);
        }

        // a subscription whose asset row is missing still gets alerts, under its bare ticker
        Ok(subs
            .into_iter()
            .map(|s| {
                let asset = by_ticker.get(&s.ticker).cloned().unwrap_or_else(|| MonitoredAsset {
                    ticker: s.ticker.clone(),
                    display_name: s.ticker.clone(),
                });
                FollowedAsset {
                    asset,
                    subscription: s,
                }
            })
            .collect())
    }
}
