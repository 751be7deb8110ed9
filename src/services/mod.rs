pub mod db_init;
pub mod throttle;

pub mod ticker_resolver;
pub mod document_poller;
pub mod fnet;
pub mod quotes;
pub mod snapshot_store;
pub mod variance;
pub mod ledger;
pub mod messaging;
pub mod dispatcher;
pub mod subscriber_store;
pub mod memory;
pub mod orchestrator;
