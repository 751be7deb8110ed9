use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use serde_json::json;

use crate::{
    error::PipelineError,
    models::{AlertKind, DocumentRecord, MonitoredAsset, Subscriber},
    templates::Hbs,
};

use super::{messaging::MessagingChannel, throttle::Throttle, variance::PriceObservation};

/// Something worth telling a subscriber about.
#[derive(Debug, Clone, Copy)]
pub enum AlertEvent<'a> {
    Document {
        asset: &'a MonitoredAsset,
        document: &'a DocumentRecord,
    },
    Price {
        asset: &'a MonitoredAsset,
        observation: &'a PriceObservation,
        threshold: f64,
    },
}

impl AlertEvent<'_> {
    pub fn kind(&self) -> AlertKind {
        match self {
            AlertEvent::Document { document, .. } => document.kind(),
            AlertEvent::Price { .. } => AlertKind::Price,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    pub success: bool,
    pub external_message_id: Option<String>,
    pub error: Option<String>,
}

impl DeliveryResult {
    fn ok(id: String) -> Self {
        Self {
            success: true,
            external_message_id: Some(id),
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            success: false,
            external_message_id: None,
            error: Some(error),
        }
    }
}

fn fmt2(x: f64) -> String {
    format!("{:.2}", x)
}

fn signed2(x: f64) -> String {
    format!("{:+.2}", x)
}

fn format_brasilia(ts: i64) -> String {
    let offset = FixedOffset::west_opt(3 * 3600);
    match (DateTime::from_timestamp(ts, 0), offset) {
        (Some(dt), Some(off)) => dt.with_timezone(&off).format("%d/%m/%Y %H:%M").to_string(),
        _ => ts.to_string(),
    }
}

/// Template name for an event, honouring the subscriber's "extended" flag.
pub fn template_name(kind: AlertKind, extended: bool) -> String {
    if extended {
        format!("{}_extended", kind.as_str())
    } else {
        kind.as_str().to_string()
    }
}

/// Render context; every key is always present so strict mode never trips.
pub fn message_context(event: &AlertEvent<'_>) -> serde_json::Value {
    match event {
        AlertEvent::Document { asset, document } => json!({
            "ticker": asset.ticker,
            "display_name": asset.display_name,
            "fund_name": document.fund_name,
            "category": document.category,
            "document_type": document.document_type,
            "delivered_at": format_brasilia(document.delivered_at),
            "link": document.link,
        }),
        AlertEvent::Price {
            asset,
            observation,
            threshold,
        } => {
            let v = observation.variance_percent;
            let base = 1.0 + v / 100.0;
            let previous = if base > 0.0 { observation.price / base } else { observation.price };
            json!({
                "ticker": asset.ticker,
                "display_name": asset.display_name,
                "arrow": if v >= 0.0 { "📈" } else { "📉" },
                "variance": signed2(v),
                "price": fmt2(observation.price),
                "previous_price": fmt2(previous),
                "change": signed2(observation.price - previous),
                "volume": observation.volume.map(|vol| format!("{:.0}", vol)),
                "threshold": fmt2(*threshold),
            })
        }
    }
}

pub struct NotificationDispatcher {
    hbs: Hbs,
    channel: Option<Arc<dyn MessagingChannel>>,
    throttle: Throttle,
}

impl NotificationDispatcher {
    /// `channel` is `None` when credentials were missing at startup; only
    /// test-mode runs can proceed then.
    pub fn new(hbs: Hbs, channel: Option<Arc<dyn MessagingChannel>>, send_delay: Duration) -> Self {
        Self {
            hbs,
            channel,
            throttle: Throttle::new(send_delay),
        }
    }

    pub fn ensure_ready(&self) -> Result<(), PipelineError> {
        match self.channel {
            Some(_) => Ok(()),
            None => Err(PipelineError::MissingCredentials(
                "messaging channel is not configured",
            )),
        }
    }

    pub fn render(&self, subscriber: &Subscriber, event: &AlertEvent<'_>) -> Result<String, PipelineError> {
        let name = template_name(event.kind(), subscriber.preferences.extended);
        let body = self.hbs.render(&name, &message_context(event))?;
        Ok(body.trim().to_string())
    }

    /// One channel call, no retries; waits out the inter-send delay first.
    pub async fn send(&self, subscriber: &Subscriber, message: &str) -> DeliveryResult {
        let Some(channel) = self.channel.as_ref() else {
            return DeliveryResult::failed("messaging channel is not configured".to_string());
        };

        self.throttle.wait().await;

        match channel.send_text(&subscriber.phone, message).await {
            Ok(id) => {
                tracing::info!(subscriber = %subscriber.id, message_id = %id, "message sent");
                DeliveryResult::ok(id)
            }
            Err(e) => {
                tracing::warn!(subscriber = %subscriber.id, error = %e, "message send failed");
                DeliveryResult::failed(e.to_string())
            }
        }
    }
}
