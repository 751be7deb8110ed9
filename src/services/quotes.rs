use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub ticker: String,
    pub price: f64,
    // percent change reported by the provider, when it has one
    pub change_percent: Option<f64>,
    pub volume: Option<f64>,
}

/// Batch quote lookup.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn quotes(&self, tickers: &[String]) -> Result<Vec<Quote>, PipelineError>;
}

#[derive(Clone)]
pub struct BrapiClient {
    http: Client,
    base_url: String,
    token: String,
}

impl BrapiClient {
    pub fn new(base_url: String, token: String) -> Self {
        Self {
            http: Client::new(),
            base_url,
            token,
        }
    }

    fn has_token(&self) -> bool {
        !self.token.trim().is_empty()
    }
}

#[async_trait]
impl PriceSource for BrapiClient {
    async fn quotes(&self, tickers: &[String]) -> Result<Vec<Quote>, PipelineError> {
        if tickers.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/quote/{}",
            self.base_url.trim_end_matches('/'),
            tickers.join(",")
        );

        let mut req = self.http.get(&url);
        if self.has_token() {
            req = req.query(&[("token", self.token.as_str())]);
        }

        let res = req.send().await?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(PipelineError::Upstream(format!(
                "quote lookup failed: {status} {body}"
            )));
        }

        let payload = res.json::<QuoteResponse>().await?;

        Ok(payload
            .results
            .into_iter()
            .filter_map(|r| {
                let price = r.regular_market_price?;
                if !price.is_finite() || price <= 0.0 {
                    return None;
                }
                Some(Quote {
                    ticker: r.symbol.to_uppercase(),
                    price,
                    change_percent: r.regular_market_change_percent.filter(|v| v.is_finite()),
                    volume: r.regular_market_volume,
                })
            })
            .collect())
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct QuoteResponse {
    #[serde(default)]
    pub results: Vec<QuoteItem>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteItem {
    pub symbol: String,
    pub regular_market_price: Option<f64>,
    pub regular_market_change_percent: Option<f64>,
    pub regular_market_volume: Option<f64>,
}
