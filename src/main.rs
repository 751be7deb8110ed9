use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mongodb::Client;

use fundwatch::{
    config,
    error::PipelineError,
    routes,
    services::{
        db_init,
        dispatcher::NotificationDispatcher,
        document_poller::DocumentPoller,
        fnet::FnetClient,
        ledger::{AlertLedger, MongoAlertLedger},
        memory::{InMemoryAlertLedger, InMemorySnapshotStore, InMemorySubscriberStore},
        messaging::{MessagingChannel, WhatsAppClient},
        orchestrator::AlertOrchestrator,
        quotes::BrapiClient,
        snapshot_store::{MongoSnapshotStore, SnapshotStore},
        subscriber_store::{MongoSubscriberStore, SubscriberStore},
        variance::VarianceEvaluator,
    },
    templates, AppState,
};

type Stores = (
    Option<mongodb::Database>,
    Arc<dyn SubscriberStore>,
    Arc<dyn SnapshotStore>,
    Arc<dyn AlertLedger>,
);

async fn open_stores(settings: &config::Settings) -> Result<Stores, PipelineError> {
    if settings.storage == "memory" {
        tracing::warn!("STORAGE=memory: ledger and snapshots are lost on restart");
        return Ok((
            None,
            Arc::new(InMemorySubscriberStore::new()),
            Arc::new(InMemorySnapshotStore::new()),
            Arc::new(InMemoryAlertLedger::new()),
        ));
    }

    let client = Client::with_uri_str(&settings.mongodb_uri).await?;
    let db = client.database(&settings.mongodb_db);
    db_init::ensure_indexes(&db).await?;

    Ok((
        Some(db.clone()),
        Arc::new(MongoSubscriberStore::new(db.clone())),
        Arc::new(MongoSnapshotStore::new(db.clone())),
        Arc::new(MongoAlertLedger::new(db)),
    ))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let settings = config::load();
    let (db, subscribers, snapshots, ledger) = open_stores(&settings).await?;

    // without credentials the service still answers testMode runs
    let channel: Option<Arc<dyn MessagingChannel>> = match WhatsAppClient::new(
        settings.messaging_api_url.clone(),
        settings.messaging_token.clone(),
    ) {
        Ok(c) => Some(Arc::new(c)),
        Err(e) => {
            tracing::error!(error = %e, "messaging channel disabled, live runs will be refused");
            None
        }
    };

    let poller = DocumentPoller::new(
        Arc::new(FnetClient::new(
            settings.document_feed_url.clone(),
            settings.document_viewer_url.clone(),
        )),
        Duration::from_millis(settings.page_delay_ms),
    );
    let prices = Arc::new(BrapiClient::new(
        settings.price_api_url.clone(),
        settings.price_api_token.clone(),
    ));
    let dispatcher = NotificationDispatcher::new(
        templates::build_handlebars()?,
        channel,
        Duration::from_millis(settings.send_delay_ms),
    );

    let orchestrator = AlertOrchestrator::new(
        subscribers,
        poller,
        prices,
        VarianceEvaluator::new(snapshots),
        ledger,
        dispatcher,
        settings.page_size,
    );

    let state = AppState {
        settings: settings.clone(),
        db,
        orchestrator: Arc::new(orchestrator),
    };

    let app = routes::app(state);

    let addr = SocketAddr::from((settings.host.parse::<std::net::IpAddr>()?, settings.port));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
