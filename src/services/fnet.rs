use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDateTime};
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::PipelineError,
    models::{DocumentStatus, FeedItem},
};

use super::document_poller::DocumentSource;

pub const SOURCE_TAG: &str = "fnet";

const BRASILIA_OFFSET_SECS: i32 = 3 * 3600;

/// HTTP client for the fund document listing.
#[derive(Clone)]
pub struct FnetClient {
    http: Client,
    feed_url: String,
    viewer_url: String,
}

impl FnetClient {
    pub fn new(feed_url: String, viewer_url: String) -> Self {
        Self {
            http: Client::new(),
            feed_url,
            viewer_url,
        }
    }

    fn link_for(&self, id: i64) -> Option<String> {
        if self.viewer_url.trim().is_empty() {
            None
        } else {
            Some(format!("{}?id={id}", self.viewer_url))
        }
    }
}

#[async_trait]
impl DocumentSource for FnetClient {
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<FeedItem>, PipelineError> {
        let offset = offset.to_string();
        let limit = limit.to_string();

        let res = self
            .http
            .get(&self.feed_url)
            .query(&[
                ("d", "0"),
                ("s", offset.as_str()),
                ("l", limit.as_str()),
                ("o[0][dataEntrega]", "desc"),
                ("tipoFundo", "1"),
            ])
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(PipelineError::Upstream(format!(
                "document feed failed: {status} {body}"
            )));
        }

        let page = res.json::<FeedPage>().await?;

        page.data
            .into_iter()
            .map(|row| {
                Ok(FeedItem {
                    id: row.id,
                    source: SOURCE_TAG.to_string(),
                    delivered_at: parse_delivery_time(&row.data_entrega)?,
                    status: if row.status.eq_ignore_ascii_case("AC") {
                        DocumentStatus::Active
                    } else {
                        DocumentStatus::Superseded
                    },
                    link: self.link_for(row.id),
                    fund_name: row.descricao_fundo,
                    display_name: row.nome_pregao,
                    category: row.categoria_documento,
                    document_type: row.tipo_documento,
                })
            })
            .collect()
    }
}

/// "dd/mm/yyyy HH:MM" in Brasília time => unix seconds.
pub fn parse_delivery_time(raw: &str) -> Result<i64, PipelineError> {
    let naive = NaiveDateTime::parse_from_str(raw.trim(), "%d/%m/%Y %H:%M")
        .map_err(|e| PipelineError::Parse(format!("bad delivery time {raw:?}: {e}")))?;

    let offset = FixedOffset::west_opt(BRASILIA_OFFSET_SECS)
        .ok_or_else(|| PipelineError::Parse("invalid fixed offset".to_string()))?;

    naive
        .and_local_timezone(offset)
        .single()
        .map(|dt| dt.timestamp())
        .ok_or_else(|| PipelineError::Parse(format!("ambiguous delivery time {raw:?}")))
}

#[derive(Debug, Deserialize)]
struct FeedPage {
    #[serde(default)]
    data: Vec<FeedRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedRow {
    id: i64,
    #[serde(default)]
    descricao_fundo: String,
    #[serde(default)]
    nome_pregao: String,
    #[serde(default)]
    categoria_documento: String,
    #[serde(default)]
    tipo_documento: String,
    data_entrega: String,
    #[serde(default)]
    status: String,
}
