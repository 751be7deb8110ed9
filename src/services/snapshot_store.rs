use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::options::FindOneOptions;
use mongodb::Database;

use crate::{error::PipelineError, models::PriceSnapshot};

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn append(&self, snapshot: &PriceSnapshot) -> Result<(), PipelineError>;

    async fn latest(&self, ticker: &str) -> Result<Option<PriceSnapshot>, PipelineError>;
}

#[derive(Clone)]
pub struct MongoSnapshotStore {
    db: Database,
}

impl MongoSnapshotStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SnapshotStore for MongoSnapshotStore {
    async fn append(&self, snapshot: &PriceSnapshot) -> Result<(), PipelineError> {
        self.db
            .collection::<PriceSnapshot>("price_snapshots")
            .insert_one(snapshot, None)
            .await?;
        Ok(())
    }

    async fn latest(&self, ticker: &str) -> Result<Option<PriceSnapshot>, PipelineError> {
        let opts = FindOneOptions::builder()
            .sort(doc! { "created_at": -1, "_id": -1 })
            .build();

        let snap = self
            .db
            .collection::<PriceSnapshot>("price_snapshots")
            .find_one(doc! { "ticker": ticker.to_uppercase() }, opts)
            .await?;

        Ok(snap)
    }
}
