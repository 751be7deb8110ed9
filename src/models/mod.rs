pub mod subscriber;
pub mod subscription;
pub mod price_snapshot;
pub mod alert_record;
pub mod document;
pub mod run_report;

pub use subscriber::{Preferences, Subscriber};
pub use subscription::{AlertFrequency, FollowedAsset, MonitoredAsset, Subscription};
pub use price_snapshot::PriceSnapshot;
pub use alert_record::{AlertKind, AlertRecord, DeliveryStatus};
pub use document::{DocumentRecord, DocumentStatus, FeedItem};
pub use run_report::{Outcome, OutcomeStatus, RunReport, MAX_OUTCOME_SAMPLES};
