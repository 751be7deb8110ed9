#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;

use fundwatch::{
    error::PipelineError,
    models::{DocumentStatus, FeedItem, Preferences, Subscriber},
    services::{
        dispatcher::NotificationDispatcher,
        document_poller::{DocumentPoller, DocumentSource},
        ledger::AlertLedger,
        memory::{InMemoryAlertLedger, InMemorySnapshotStore, InMemorySubscriberStore},
        messaging::MessagingChannel,
        orchestrator::AlertOrchestrator,
        quotes::{PriceSource, Quote},
        variance::VarianceEvaluator,
    },
    templates,
};

pub const HOUR: i64 = 3600;

/// Newest-first feed served from a fixed list, recording every request.
#[derive(Default)]
pub struct ScriptedDocumentSource {
    pub items: Vec<FeedItem>,
    pub requests: Mutex<Vec<(usize, usize)>>,
    // zero-based page index that answers with an upstream error
    pub fail_on_page: Option<usize>,
}

impl ScriptedDocumentSource {
    pub fn new(items: Vec<FeedItem>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl DocumentSource for ScriptedDocumentSource {
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<FeedItem>, PipelineError> {
        let page_index = self.requests.lock().unwrap().len();
        self.requests.lock().unwrap().push((offset, limit));

        if self.fail_on_page == Some(page_index) {
            return Err(PipelineError::Upstream("503 Service Unavailable".to_string()));
        }

        let start = offset.min(self.items.len());
        let end = (offset + limit).min(self.items.len());
        Ok(self.items[start..end].to_vec())
    }
}

#[derive(Default)]
pub struct StaticPriceSource {
    pub quotes: Mutex<Vec<Quote>>,
    pub fail: bool,
    pub calls: Mutex<usize>,
}

impl StaticPriceSource {
    pub fn new(quotes: Vec<Quote>) -> Self {
        Self {
            quotes: Mutex::new(quotes),
            ..Self::default()
        }
    }

    pub fn set(&self, quotes: Vec<Quote>) {
        *self.quotes.lock().unwrap() = quotes;
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    async fn quotes(&self, tickers: &[String]) -> Result<Vec<Quote>, PipelineError> {
        *self.calls.lock().unwrap() += 1;
        if self.fail {
            return Err(PipelineError::Upstream("quote api down".to_string()));
        }
        Ok(self
            .quotes
            .lock()
            .unwrap()
            .iter()
            .filter(|q| tickers.contains(&q.ticker))
            .cloned()
            .collect())
    }
}

/// Channel that keeps every message and rejects listed addresses.
#[derive(Default)]
pub struct RecordingChannel {
    pub sent: Mutex<Vec<(String, String)>>,
    pub reject: HashSet<String>,
    // provider latency, lets overlapping runs interleave
    pub delay: Duration,
}

impl RecordingChannel {
    pub fn rejecting(addresses: &[&str]) -> Self {
        Self {
            reject: addresses.iter().map(|a| a.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn messages_to(&self, address: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| a == address)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

#[async_trait]
impl MessagingChannel for RecordingChannel {
    async fn send_text(&self, address: &str, body: &str) -> Result<String, PipelineError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.reject.contains(address) {
            return Err(PipelineError::Dispatch(format!("400 invalid recipient {address}")));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((address.to_string(), body.to_string()));
        Ok(format!("wamid.{}", sent.len()))
    }
}

pub fn now() -> i64 {
    Utc::now().timestamp()
}

pub fn subscriber(phone: &str, preferences: Preferences) -> Subscriber {
    Subscriber {
        id: ObjectId::new(),
        name: format!("Investor {phone}"),
        phone: phone.to_string(),
        phone_verified: true,
        preferences,
        active: true,
        created_at: now(),
    }
}

pub fn feed_item(id: i64, display_name: &str, fund_name: &str, delivered_at: i64) -> FeedItem {
    FeedItem {
        id,
        source: "fnet".to_string(),
        fund_name: fund_name.to_string(),
        display_name: display_name.to_string(),
        category: "Relatórios".to_string(),
        document_type: "Relatório Gerencial".to_string(),
        delivered_at,
        status: DocumentStatus::Active,
        link: Some(format!("https://docs.example/view?id={id}")),
    }
}

pub fn quote(ticker: &str, price: f64, change_percent: Option<f64>) -> Quote {
    Quote {
        ticker: ticker.to_string(),
        price,
        change_percent,
        volume: Some(12_500.0),
    }
}

pub struct Harness {
    pub orchestrator: AlertOrchestrator,
    pub store: Arc<InMemorySubscriberStore>,
    pub ledger: Arc<InMemoryAlertLedger>,
    pub snapshots: Arc<InMemorySnapshotStore>,
    pub docs: Arc<ScriptedDocumentSource>,
    pub prices: Arc<StaticPriceSource>,
    pub channel: Arc<RecordingChannel>,
}

/// Zero delays everywhere; `channel = None` simulates missing credentials.
pub fn harness(
    docs: ScriptedDocumentSource,
    prices: StaticPriceSource,
    channel: Option<RecordingChannel>,
) -> Harness {
    harness_with_ledger(docs, prices, channel, |ledger| ledger as Arc<dyn AlertLedger>)
}

/// Like `harness`, with the orchestrator's ledger wrapped by `wrap`.
pub fn harness_with_ledger(
    docs: ScriptedDocumentSource,
    prices: StaticPriceSource,
    channel: Option<RecordingChannel>,
    wrap: impl FnOnce(Arc<InMemoryAlertLedger>) -> Arc<dyn AlertLedger>,
) -> Harness {
    let store = Arc::new(InMemorySubscriberStore::new());
    let ledger = Arc::new(InMemoryAlertLedger::new());
    let snapshots = Arc::new(InMemorySnapshotStore::new());
    let docs = Arc::new(docs);
    let prices = Arc::new(prices);
    let has_channel = channel.is_some();
    let channel = Arc::new(channel.unwrap_or_default());

    let dispatch_channel: Option<Arc<dyn MessagingChannel>> = if has_channel {
        Some(channel.clone())
    } else {
        None
    };

    let dispatcher = NotificationDispatcher::new(
        templates::build_handlebars().expect("templates compile"),
        dispatch_channel,
        Duration::ZERO,
    );

    let orchestrator = AlertOrchestrator::new(
        store.clone(),
        DocumentPoller::new(docs.clone(), Duration::ZERO),
        prices.clone(),
        VarianceEvaluator::new(snapshots.clone()),
        wrap(ledger.clone()),
        dispatcher,
        100,
    );

    Harness {
        orchestrator,
        store,
        ledger,
        snapshots,
        docs,
        prices,
        channel,
    }
}
