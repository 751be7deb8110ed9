use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    error::PipelineError,
    models::{DocumentRecord, FeedItem},
};

use super::{throttle::Throttle, ticker_resolver};

pub const MAX_PAGE_SIZE: usize = 100;

/// A paginated feed sorted newest-first.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<FeedItem>, PipelineError>;
}

pub struct DocumentPoller {
    source: Arc<dyn DocumentSource>,
    throttle: Throttle,
}

impl DocumentPoller {
    pub fn new(source: Arc<dyn DocumentSource>, page_delay: Duration) -> Self {
        Self {
            source,
            throttle: Throttle::new(page_delay),
        }
    }

    pub async fn fetch_recent(
        &self,
        lookback_hours: i64,
        max_pages: usize,
        page_size: usize,
    ) -> Vec<DocumentRecord> {
        self.fetch_recent_at(Utc::now().timestamp(), lookback_hours, max_pages, page_size)
            .await
    }

    /// Walks pages from offset 0 until a page ends before the lookback
    /// cutoff, a page comes back empty, or `max_pages` pages were read.
    ///
    /// A failing page ends the walk; whatever was fetched so far is returned.
    /// Old items on the last page are kept, filtering happens downstream.
    pub async fn fetch_recent_at(
        &self,
        now: i64,
        lookback_hours: i64,
        max_pages: usize,
        page_size: usize,
    ) -> Vec<DocumentRecord> {
        let cutoff = now - lookback_hours.max(0) * 3600;
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);

        let mut out: Vec<DocumentRecord> = Vec::new();
        let mut pages = 0usize;

        while pages < max_pages {
            self.throttle.wait().await;

            let offset = pages * page_size;
            let items = match self.source.fetch_page(offset, page_size).await {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!(offset, error = %e, "document page failed, keeping partial results");
                    break;
                }
            };
            pages += 1;

            let Some(last_ts) = items.last().map(|i| i.delivered_at) else {
                break;
            };

            out.extend(items.into_iter().map(|item| {
                let ticker = ticker_resolver::resolve(&item.display_name, &item.fund_name);
                DocumentRecord::from_feed(item, ticker)
            }));

            if last_ts < cutoff {
                break;
            }
        }

        tracing::info!(pages, documents = out.len(), lookback_hours, "document poll finished");
        out
    }
}
