use std::sync::Arc;

use chrono::Utc;

use crate::{
    error::PipelineError,
    models::{MonitoredAsset, PriceSnapshot, Subscription},
};

use super::{quotes::Quote, snapshot_store::SnapshotStore};

/// Minimum gap between two price alerts for one (subscriber, asset) pair.
pub const COOLDOWN_SECS: i64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Alert,
    BelowThreshold,
    CoolingDown,
}

impl Verdict {
    pub fn fires(self) -> bool {
        self == Verdict::Alert
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceObservation {
    pub price: f64,
    pub variance_percent: f64,
    pub volume: Option<f64>,
}

pub fn judge(
    variance_percent: f64,
    min_variation_percent: f64,
    last_alert_at: Option<i64>,
    now: i64,
) -> Verdict {
    if !variance_percent.is_finite() || variance_percent.abs() < min_variation_percent {
        return Verdict::BelowThreshold;
    }

    match last_alert_at {
        Some(t) if now - t < COOLDOWN_SECS => Verdict::CoolingDown,
        _ => Verdict::Alert,
    }
}

/// Percent move from a stored reference price.
pub fn variance_since(previous: &PriceSnapshot, price: f64) -> Option<f64> {
    if previous.price > 0.0 && previous.price.is_finite() && price.is_finite() {
        Some((price - previous.price) / previous.price * 100.0)
    } else {
        None
    }
}

pub struct VarianceEvaluator {
    snapshots: Arc<dyn SnapshotStore>,
}

impl VarianceEvaluator {
    pub fn new(snapshots: Arc<dyn SnapshotStore>) -> Self {
        Self { snapshots }
    }

    /// Turns a quote into an observation: the provider's percent change if it
    /// has one, otherwise the move since the latest stored snapshot.
    pub async fn observe(&self, quote: &Quote) -> Result<Option<PriceObservation>, PipelineError> {
        let variance = match quote.change_percent {
            Some(v) => Some(v),
            None => self
                .snapshots
                .latest(&quote.ticker)
                .await?
                .and_then(|prev| variance_since(&prev, quote.price)),
        };

        Ok(variance.map(|variance_percent| PriceObservation {
            price: quote.price,
            variance_percent,
            volume: quote.volume,
        }))
    }

    pub async fn evaluate(
        &self,
        asset: &MonitoredAsset,
        observation: &PriceObservation,
        subscription: &Subscription,
        last_alert_at: Option<i64>,
    ) -> Verdict {
        self.evaluate_at(Utc::now().timestamp(), asset, observation, subscription, last_alert_at)
            .await
    }

    /// Always appends a snapshot, whatever the verdict.
    pub async fn evaluate_at(
        &self,
        now: i64,
        asset: &MonitoredAsset,
        observation: &PriceObservation,
        subscription: &Subscription,
        last_alert_at: Option<i64>,
    ) -> Verdict {
        let snapshot = PriceSnapshot::new(
            &asset.ticker,
            observation.price,
            observation.variance_percent,
            observation.volume,
            now,
        );
        if let Err(e) = self.snapshots.append(&snapshot).await {
            tracing::warn!(ticker = %asset.ticker, error = %e, "failed to append price snapshot");
        }

        let verdict = judge(
            observation.variance_percent,
            subscription.min_variation_percent,
            last_alert_at,
            now,
        );

        tracing::debug!(
            ticker = %asset.ticker,
            variance = observation.variance_percent,
            threshold = subscription.min_variation_percent,
            ?verdict,
            "price evaluated"
        );

        verdict
    }
}
