use std::time::Duration;

use tokio::{sync::Mutex, time::Instant};

/// Minimum spacing between consecutive calls to one upstream.
///
/// The last-call instant lives in the instance, so two pollers (or two test
/// runs) never slow each other down.
#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Sleeps until `min_interval` has passed since the previous call, then
    /// marks this call. The first call never waits.
    pub async fn wait(&self) {
        let mut last = self.last.lock().await;

        if let Some(prev) = *last {
            let ready_at = prev + self.min_interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }

        *last = Some(Instant::now());
    }
}
