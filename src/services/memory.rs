//! In-process stores with the same contracts as the Mongo ones.
//!
//! Used for `STORAGE=memory` local runs and by the test suite.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;

use crate::{
    error::PipelineError,
    models::{
        AlertFrequency, AlertKind, AlertRecord, DeliveryStatus, FollowedAsset, MonitoredAsset,
        PriceSnapshot, Subscriber, Subscription,
    },
};

use super::{
    ledger::{AlertLedger, LedgerWrite},
    snapshot_store::SnapshotStore,
    subscriber_store::SubscriberStore,
};

fn poisoned<T>(_: std::sync::PoisonError<T>) -> PipelineError {
    PipelineError::Storage("in-memory store lock poisoned".to_string())
}

#[derive(Default)]
pub struct InMemorySubscriberStore {
    subscribers: Mutex<Vec<Subscriber>>,
    subscriptions: Mutex<Vec<Subscription>>,
    assets: Mutex<HashMap<String, MonitoredAsset>>,
}

/// Per-asset settings used when following an asset.
#[derive(Debug, Clone)]
pub struct FollowSettings {
    pub notifications_enabled: bool,
    pub price_alert_enabled: bool,
    pub min_variation_percent: f64,
    pub alert_frequency: AlertFrequency,
}

impl Default for FollowSettings {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            price_alert_enabled: true,
            min_variation_percent: 1.0,
            alert_frequency: AlertFrequency::Daily,
        }
    }
}

impl InMemorySubscriberStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_subscriber(&self, subscriber: Subscriber) -> Result<(), PipelineError> {
        self.subscribers.lock().map_err(poisoned)?.push(subscriber);
        Ok(())
    }

    /// Creates the asset on first reference and one subscription per pair.
    pub fn follow(
        &self,
        subscriber_id: ObjectId,
        ticker: &str,
        display_name: &str,
        settings: FollowSettings,
    ) -> Result<Subscription, PipelineError> {
        let ticker = ticker.to_uppercase();

        self.assets
            .lock()
            .map_err(poisoned)?
            .entry(ticker.clone())
            .and_modify(|a| a.display_name = display_name.to_string())
            .or_insert_with(|| MonitoredAsset {
                ticker: ticker.clone(),
                display_name: display_name.to_string(),
            });

        let mut subs = self.subscriptions.lock().map_err(poisoned)?;
        subs.retain(|s| !(s.subscriber_id == subscriber_id && s.ticker == ticker));

        let sub = Subscription {
            id: ObjectId::new(),
            subscriber_id,
            ticker,
            notifications_enabled: settings.notifications_enabled,
            price_alert_enabled: settings.price_alert_enabled,
            min_variation_percent: settings.min_variation_percent,
            alert_frequency: settings.alert_frequency,
            created_at: Utc::now().timestamp(),
        };
        subs.push(sub.clone());

        Ok(sub)
    }
}

#[async_trait]
impl SubscriberStore for InMemorySubscriberStore {
    async fn active_subscribers(&self) -> Result<Vec<Subscriber>, PipelineError> {
        let subs = self.subscribers.lock().map_err(poisoned)?;
        Ok(subs.iter().filter(|s| s.active).cloned().collect())
    }

    async fn follow_list(&self, subscriber_id: ObjectId) -> Result<Vec<FollowedAsset>, PipelineError> {
        let subs = self.subscriptions.lock().map_err(poisoned)?;
        let assets = self.assets.lock().map_err(poisoned)?;

        let mut items: Vec<FollowedAsset> = subs
            .iter()
            .filter(|s| s.subscriber_id == subscriber_id)
            .map(|s| FollowedAsset {
                asset: assets.get(&s.ticker).cloned().unwrap_or_else(|| MonitoredAsset {
                    ticker: s.ticker.clone(),
                    display_name: s.ticker.clone(),
                }),
                subscription: s.clone(),
            })
            .collect();
        items.sort_by(|a, b| a.asset.ticker.cmp(&b.asset.ticker));

        Ok(items)
    }
}

#[derive(Default)]
pub struct InMemorySnapshotStore {
    rows: Mutex<Vec<PriceSnapshot>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<PriceSnapshot> {
        self.rows.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn append(&self, snapshot: &PriceSnapshot) -> Result<(), PipelineError> {
        self.rows.lock().map_err(poisoned)?.push(snapshot.clone());
        Ok(())
    }

    async fn latest(&self, ticker: &str) -> Result<Option<PriceSnapshot>, PipelineError> {
        let ticker = ticker.to_uppercase();
        let rows = self.rows.lock().map_err(poisoned)?;
        // later appends win ties on created_at
        Ok(rows
            .iter()
            .enumerate()
            .filter(|(_, s)| s.ticker == ticker)
            .max_by_key(|(i, s)| (s.created_at, *i))
            .map(|(_, s)| s.clone()))
    }
}

#[derive(Default)]
pub struct InMemoryAlertLedger {
    records: Mutex<Vec<AlertRecord>>,
}

impl InMemoryAlertLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AlertRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

fn holds_pair(r: &AlertRecord, subscriber_id: ObjectId, event_key: &str) -> bool {
    r.subscriber_id == subscriber_id && r.event_key == event_key && r.status.holds_slot()
}

#[async_trait]
impl AlertLedger for InMemoryAlertLedger {
    async fn has_sent(&self, subscriber_id: ObjectId, event_key: &str) -> Result<bool, PipelineError> {
        let records = self.records.lock().map_err(poisoned)?;
        Ok(records.iter().any(|r| holds_pair(r, subscriber_id, event_key)))
    }

    async fn claim(&self, record: AlertRecord) -> Result<LedgerWrite, PipelineError> {
        // check and insert under one lock
        let mut records = self.records.lock().map_err(poisoned)?;

        if record.status.holds_slot()
            && records
                .iter()
                .any(|r| holds_pair(r, record.subscriber_id, &record.event_key))
        {
            return Ok(LedgerWrite::AlreadySent);
        }

        records.push(record.clone());
        Ok(LedgerWrite::Inserted(record))
    }

    async fn settle(
        &self,
        record_id: ObjectId,
        status: DeliveryStatus,
        external_message_id: Option<String>,
        error: Option<String>,
    ) -> Result<(), PipelineError> {
        let mut records = self.records.lock().map_err(poisoned)?;

        let record = records
            .iter_mut()
            .find(|r| r.id == record_id && r.status == DeliveryStatus::Pending)
            .ok_or_else(|| PipelineError::Storage(format!("no pending claim {record_id}")))?;

        record.status = status;
        record.external_message_id = external_message_id;
        record.error = error;
        Ok(())
    }

    async fn last_alert_at(
        &self,
        subscriber_id: ObjectId,
        ticker: &str,
        kind: AlertKind,
    ) -> Result<Option<i64>, PipelineError> {
        let records = self.records.lock().map_err(poisoned)?;
        Ok(records
            .iter()
            .filter(|r| {
                r.subscriber_id == subscriber_id
                    && r.ticker == ticker
                    && r.kind == kind
                    && r.status == DeliveryStatus::Sent
            })
            .map(|r| r.created_at)
            .max())
    }
}
