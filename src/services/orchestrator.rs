use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::{
    error::PipelineError,
    models::{
        AlertFrequency, AlertKind, AlertRecord, DeliveryStatus, DocumentRecord, FollowedAsset,
        MonitoredAsset, Outcome, OutcomeStatus, RunReport, Subscriber,
    },
};

use super::{
    dispatcher::{AlertEvent, NotificationDispatcher},
    document_poller::DocumentPoller,
    ledger::{AlertLedger, LedgerWrite},
    quotes::PriceSource,
    subscriber_store::SubscriberStore,
    variance::{PriceObservation, VarianceEvaluator, Verdict},
};

#[derive(Debug, Clone)]
pub struct RunParams {
    pub hours_ago: i64,
    pub test_mode: bool,
    pub max_pages: usize,
    pub max_funds_to_check: usize,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            hours_ago: 24,
            test_mode: false,
            max_pages: 10,
            max_funds_to_check: 200,
        }
    }
}

/// `{ticker}-{bucket}-price-{up|down}`; the bucket is the UTC day, or the UTC
/// hour for realtime subscriptions.
pub fn price_event_key(
    ticker: &str,
    frequency: AlertFrequency,
    variance_percent: f64,
    at: i64,
) -> String {
    let dt = DateTime::from_timestamp(at, 0).unwrap_or_default();
    let bucket = match frequency {
        AlertFrequency::Daily => dt.format("%Y-%m-%d").to_string(),
        AlertFrequency::Realtime => dt.format("%Y-%m-%dT%H").to_string(),
    };
    let direction = if variance_percent >= 0.0 { "up" } else { "down" };

    format!("{ticker}-{bucket}-price-{direction}")
}

/// Scheduled entry point: subscribers x followed assets, one unit at a time.
pub struct AlertOrchestrator {
    subscribers: Arc<dyn SubscriberStore>,
    poller: DocumentPoller,
    prices: Arc<dyn PriceSource>,
    evaluator: VarianceEvaluator,
    ledger: Arc<dyn AlertLedger>,
    dispatcher: NotificationDispatcher,
    page_size: usize,
}

struct Unit<'a> {
    subscriber: &'a Subscriber,
    asset: &'a MonitoredAsset,
    test_mode: bool,
    now: i64,
}

impl AlertOrchestrator {
    pub fn new(
        subscribers: Arc<dyn SubscriberStore>,
        poller: DocumentPoller,
        prices: Arc<dyn PriceSource>,
        evaluator: VarianceEvaluator,
        ledger: Arc<dyn AlertLedger>,
        dispatcher: NotificationDispatcher,
        page_size: usize,
    ) -> Self {
        Self {
            subscribers,
            poller,
            prices,
            evaluator,
            ledger,
            dispatcher,
            page_size,
        }
    }

    pub async fn run(&self, params: RunParams) -> Result<RunReport, PipelineError> {
        self.run_at(Utc::now().timestamp(), params).await
    }

    /// Only missing channel credentials or an unreadable subscriber list stop
    /// a run; everything else ends up in the report.
    pub async fn run_at(&self, now: i64, params: RunParams) -> Result<RunReport, PipelineError> {
        if !params.test_mode {
            self.dispatcher.ensure_ready()?;
        }

        let started = Instant::now();
        let mut report = RunReport::new(params.test_mode, params.hours_ago);

        tracing::info!(
            hours_ago = params.hours_ago,
            test_mode = params.test_mode,
            max_pages = params.max_pages,
            "alert run started"
        );

        let subscribers: Vec<Subscriber> = self
            .subscribers
            .active_subscribers()
            .await?
            .into_iter()
            .filter(|s| s.can_receive())
            .collect();

        let mut plans: Vec<(Subscriber, Vec<FollowedAsset>)> = Vec::with_capacity(subscribers.len());
        for s in subscribers {
            match self.subscribers.follow_list(s.id).await {
                Ok(follows) => plans.push((s, follows)),
                Err(e) => {
                    tracing::warn!(subscriber = %s.id, error = %e, "could not load follow list");
                    report.subscriber_errors += 1;
                }
            }
        }

        let documents = if Self::wants_documents(&plans) {
            let fetched = self
                .poller
                .fetch_recent_at(now, params.hours_ago, params.max_pages, self.page_size)
                .await;
            report.documents_fetched = fetched.len();
            Self::index_documents(fetched, now - params.hours_ago * 3600, &mut report)
        } else {
            HashMap::new()
        };

        let price_tickers: Vec<String> = plans
            .iter()
            .filter(|(s, _)| s.preferences.price_alerts)
            .flat_map(|(_, follows)| follows.iter())
            .filter(|f| f.subscription.price_alert_enabled)
            .map(|f| f.asset.ticker.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .take(params.max_funds_to_check)
            .collect();
        report.assets_checked = price_tickers.len();

        let observations = self.observe_prices(&price_tickers, &mut report).await;

        for (subscriber, follows) in &plans {
            report.subscribers_processed += 1;

            for followed in follows {
                let unit = Unit {
                    subscriber,
                    asset: &followed.asset,
                    test_mode: params.test_mode,
                    now,
                };

                if followed.subscription.notifications_enabled {
                    if let Some(docs) = documents.get(&followed.asset.ticker) {
                        self.process_documents(&unit, docs, &mut report).await;
                    }
                }

                if subscriber.preferences.price_alerts && followed.subscription.price_alert_enabled {
                    if let Some(obs) = observations.get(&followed.asset.ticker) {
                        self.process_price(&unit, followed, obs, now, &mut report).await;
                    }
                }
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            sent = report.sent,
            failed = report.failed,
            simulated = report.simulated,
            skipped_duplicate = report.skipped_duplicate,
            skipped_cooldown = report.skipped_cooldown,
            duration_ms = report.duration_ms,
            "alert run finished"
        );

        Ok(report)
    }

    fn wants_documents(plans: &[(Subscriber, Vec<FollowedAsset>)]) -> bool {
        plans.iter().any(|(s, follows)| {
            s.wants_documents() && follows.iter().any(|f| f.subscription.notifications_enabled)
        })
    }

    /// Keeps fresh, active, resolved documents grouped by ticker.
    fn index_documents(
        docs: Vec<DocumentRecord>,
        cutoff: i64,
        report: &mut RunReport,
    ) -> HashMap<String, Vec<DocumentRecord>> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut by_ticker: HashMap<String, Vec<DocumentRecord>> = HashMap::new();

        for doc in docs {
            if doc.delivered_at < cutoff || !doc.is_active() {
                continue;
            }
            // offsets shift while new documents arrive, so pages can overlap
            if !seen.insert(doc.event_key()) {
                continue;
            }
            report.documents_found += 1;

            match doc.ticker.clone() {
                Some(t) => by_ticker.entry(t).or_default().push(doc),
                None => {
                    tracing::debug!(id = doc.id, fund = %doc.fund_name, "document skipped, no ticker");
                    report.unresolved_documents += 1;
                }
            }
        }

        by_ticker
    }

    async fn observe_prices(
        &self,
        tickers: &[String],
        report: &mut RunReport,
    ) -> HashMap<String, PriceObservation> {
        let mut out = HashMap::new();
        if tickers.is_empty() {
            return out;
        }

        let quotes = match self.prices.quotes(tickers).await {
            Ok(q) => q,
            Err(e) => {
                tracing::warn!(error = %e, "price source unavailable, skipping price alerts");
                return out;
            }
        };

        let wanted: HashSet<&str> = tickers.iter().map(String::as_str).collect();
        for quote in quotes {
            if !wanted.contains(quote.ticker.as_str()) {
                continue;
            }
            report.quotes_received += 1;

            match self.evaluator.observe(&quote).await {
                Ok(Some(obs)) => {
                    out.insert(quote.ticker.clone(), obs);
                }
                Ok(None) => tracing::debug!(ticker = %quote.ticker, "no variance reference yet"),
                Err(e) => tracing::warn!(ticker = %quote.ticker, error = %e, "could not read reference snapshot"),
            }
        }

        out
    }

    async fn process_documents(&self, unit: &Unit<'_>, docs: &[DocumentRecord], report: &mut RunReport) {
        let prefs = &unit.subscriber.preferences;

        for doc in docs {
            let wanted = match doc.kind() {
                AlertKind::Dividend => prefs.dividends,
                _ => prefs.documents,
            };
            if !wanted {
                continue;
            }

            report.alerts_evaluated += 1;
            let event = AlertEvent::Document {
                asset: unit.asset,
                document: doc,
            };
            self.deliver(unit, event, doc.event_key(), report).await;
        }
    }

    async fn process_price(
        &self,
        unit: &Unit<'_>,
        followed: &FollowedAsset,
        obs: &PriceObservation,
        now: i64,
        report: &mut RunReport,
    ) {
        report.alerts_evaluated += 1;

        let sub = &followed.subscription;
        let event_key = price_event_key(&unit.asset.ticker, sub.alert_frequency, obs.variance_percent, now);

        let last_alert_at = match self
            .ledger
            .last_alert_at(unit.subscriber.id, &unit.asset.ticker, AlertKind::Price)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(ticker = %unit.asset.ticker, error = %e, "cool-down lookup failed");
                report.record(outcome(unit, AlertKind::Price, &event_key, OutcomeStatus::Failed, Some(e.to_string())));
                return;
            }
        };

        match self.evaluator.evaluate_at(now, unit.asset, obs, sub, last_alert_at).await {
            Verdict::BelowThreshold => {}
            Verdict::CoolingDown => {
                report.record(outcome(unit, AlertKind::Price, &event_key, OutcomeStatus::SkippedCooldown, None));
            }
            Verdict::Alert => {
                let event = AlertEvent::Price {
                    asset: unit.asset,
                    observation: obs,
                    threshold: sub.min_variation_percent,
                };
                self.deliver(unit, event, event_key, report).await;
            }
        }
    }

    /// Ledger check, render, claim, send, settle. Test mode stops after render.
    async fn deliver(&self, unit: &Unit<'_>, event: AlertEvent<'_>, event_key: String, report: &mut RunReport) {
        let kind = event.kind();
        let subscriber = unit.subscriber;

        match self.ledger.has_sent(subscriber.id, &event_key).await {
            Ok(true) => {
                report.record(outcome(unit, kind, &event_key, OutcomeStatus::SkippedDuplicate, None));
                return;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(%event_key, error = %e, "ledger lookup failed");
                report.record(outcome(unit, kind, &event_key, OutcomeStatus::Failed, Some(e.to_string())));
                return;
            }
        }

        let message = match self.dispatcher.render(subscriber, &event) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(%event_key, error = %e, "message render failed");
                report.record(outcome(unit, kind, &event_key, OutcomeStatus::Failed, Some(e.to_string())));
                return;
            }
        };

        if unit.test_mode {
            tracing::info!(subscriber = %subscriber.id, %event_key, "test mode, delivery simulated");
            report.record(outcome(unit, kind, &event_key, OutcomeStatus::Simulated, None));
            return;
        }

        let claim = AlertRecord::new(
            subscriber.id,
            &unit.asset.ticker,
            kind,
            &event_key,
            &message,
            DeliveryStatus::Pending,
            unit.now,
        );
        let claim_id = match self.ledger.claim(claim).await {
            Ok(LedgerWrite::Inserted(record)) => record.id,
            Ok(LedgerWrite::AlreadySent) => {
                tracing::info!(%event_key, "event claimed by another run");
                report.record(outcome(unit, kind, &event_key, OutcomeStatus::SkippedDuplicate, None));
                return;
            }
            Err(e) => {
                tracing::warn!(%event_key, error = %e, "ledger claim failed");
                report.record(outcome(unit, kind, &event_key, OutcomeStatus::Failed, Some(e.to_string())));
                return;
            }
        };

        let result = self.dispatcher.send(subscriber, &message).await;
        let (delivery, status) = if result.success {
            (DeliveryStatus::Sent, OutcomeStatus::Sent)
        } else {
            (DeliveryStatus::Failed, OutcomeStatus::Failed)
        };

        if let Err(e) = self
            .ledger
            .settle(claim_id, delivery, result.external_message_id.clone(), result.error.clone())
            .await
        {
            // the claim stays pending, so the pair is never resent
            tracing::error!(%event_key, error = %e, "delivery finished but ledger settle failed");
        }

        report.record(outcome(unit, kind, &event_key, status, result.error));
    }
}

fn outcome(
    unit: &Unit<'_>,
    kind: AlertKind,
    event_key: &str,
    status: OutcomeStatus,
    error: Option<String>,
) -> Outcome {
    Outcome {
        subscriber_id: unit.subscriber.id.to_hex(),
        ticker: unit.asset.ticker.clone(),
        kind,
        event_key: event_key.to_string(),
        status,
        error,
    }
}
