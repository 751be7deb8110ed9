use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::FindOneOptions;
use mongodb::Database;

use crate::{
    error::PipelineError,
    models::{AlertKind, AlertRecord, DeliveryStatus},
};

const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, Clone)]
pub enum LedgerWrite {
    Inserted(AlertRecord),
    /// A pending or sent record for the same (subscriber, event key) already existed.
    AlreadySent,
}

/// Persistent record of what each subscriber has been told.
///
/// A delivery first claims its (subscriber, event key) with a `pending`
/// record, sends, then settles the claim to `sent` or `failed`. At most one
/// pending-or-sent record may exist per pair, so concurrent runs cannot both
/// deliver. Failed attempts release the pair and never block a later retry.
#[async_trait]
pub trait AlertLedger: Send + Sync {
    /// True when the pair is sent or claimed by another run.
    async fn has_sent(&self, subscriber_id: ObjectId, event_key: &str) -> Result<bool, PipelineError>;

    /// Inserts `record` (status `pending`) unless the pair is already held.
    async fn claim(&self, record: AlertRecord) -> Result<LedgerWrite, PipelineError>;

    /// Moves a pending claim to its final status.
    async fn settle(
        &self,
        record_id: ObjectId,
        status: DeliveryStatus,
        external_message_id: Option<String>,
        error: Option<String>,
    ) -> Result<(), PipelineError>;

    /// Unix seconds of the newest `sent` alert of `kind` for the pair.
    async fn last_alert_at(
        &self,
        subscriber_id: ObjectId,
        ticker: &str,
        kind: AlertKind,
    ) -> Result<Option<i64>, PipelineError>;
}

#[derive(Clone)]
pub struct MongoAlertLedger {
    db: Database,
}

impl MongoAlertLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn records(&self) -> mongodb::Collection<AlertRecord> {
        self.db.collection::<AlertRecord>("alert_records")
    }
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    matches!(
        *e.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref we)) if we.code == DUPLICATE_KEY
    )
}

#[async_trait]
impl AlertLedger for MongoAlertLedger {
    async fn has_sent(&self, subscriber_id: ObjectId, event_key: &str) -> Result<bool, PipelineError> {
        let found = self
            .records()
            .find_one(
                doc! {
                    "subscriber_id": subscriber_id,
                    "event_key": event_key,
                    "status": { "$in": ["pending", "sent"] },
                },
                None,
            )
            .await?;
        Ok(found.is_some())
    }

    async fn claim(&self, record: AlertRecord) -> Result<LedgerWrite, PipelineError> {
        match self.records().insert_one(&record, None).await {
            Ok(_) => Ok(LedgerWrite::Inserted(record)),
            // the partial unique index covers pending and sent records
            Err(e) if record.status.holds_slot() && is_duplicate_key(&e) => {
                tracing::debug!(event_key = %record.event_key, "event already claimed");
                Ok(LedgerWrite::AlreadySent)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn settle(
        &self,
        record_id: ObjectId,
        status: DeliveryStatus,
        external_message_id: Option<String>,
        error: Option<String>,
    ) -> Result<(), PipelineError> {
        let res = self
            .records()
            .update_one(
                doc! { "_id": record_id, "status": "pending" },
                doc! { "$set": {
                    "status": status.as_str(),
                    "external_message_id": external_message_id,
                    "error": error,
                } },
                None,
            )
            .await?;

        if res.matched_count == 0 {
            return Err(PipelineError::Storage(format!("no pending claim {record_id}")));
        }
        Ok(())
    }

    async fn last_alert_at(
        &self,
        subscriber_id: ObjectId,
        ticker: &str,
        kind: AlertKind,
    ) -> Result<Option<i64>, PipelineError> {
        let opts = FindOneOptions::builder().sort(doc! { "created_at": -1 }).build();

        let last = self
            .records()
            .find_one(
                doc! {
                    "subscriber_id": subscriber_id,
                    "ticker": ticker,
                    "kind": kind.as_str(),
                    "status": "sent",
                },
                opts,
            )
            .await?;

        Ok(last.map(|r| r.created_at))
    }
}
