use mongodb::{
    bson::doc,
    options::IndexOptions,
    Database, IndexModel,
};

use crate::error::PipelineError;

pub async fn ensure_indexes(db: &Database) -> Result<(), PipelineError> {
    // alert_records: at most one pending-or-sent record per (subscriber, event key).
    // $in inside a partial filter needs MongoDB 6.0+.
    {
        let col = db.collection::<mongodb::bson::Document>("alert_records");
        let model = IndexModel::builder()
            .keys(doc! { "subscriber_id": 1, "event_key": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .partial_filter_expression(doc! { "status": { "$in": ["pending", "sent"] } })
                    .name("uniq_claimed_event".to_string())
                    .build(),
            )
            .build();

        col.create_index(model, None).await?;
    }

    // alert_records: cool-down lookup, newest first
    {
        let col = db.collection::<mongodb::bson::Document>("alert_records");
        let model = IndexModel::builder()
            .keys(doc! { "subscriber_id": 1, "ticker": 1, "kind": 1, "created_at": -1 })
            .build();

        col.create_index(model, None).await?;
    }

    // price_snapshots: latest row per ticker
    {
        let col = db.collection::<mongodb::bson::Document>("price_snapshots");
        let model = IndexModel::builder()
            .keys(doc! { "ticker": 1, "created_at": -1 })
            .build();

        col.create_index(model, None).await?;
    }

    // subscriptions: unique per (subscriber_id, ticker)
    {
        let col = db.collection::<mongodb::bson::Document>("subscriptions");
        let model = IndexModel::builder()
            .keys(doc! { "subscriber_id": 1, "ticker": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        // owned by the dashboard; an existing conflicting index is not our problem
        if let Err(e) = col.create_index(model, None).await {
            tracing::warn!(error = %e, "could not ensure subscriptions index");
        }
    }

    Ok(())
}
