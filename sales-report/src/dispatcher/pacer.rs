//! Outbound delivery pacing
//!
//! Enforces a minimum gap between consecutive deliveries so a batch never
//! bursts against the delivery channel's rate limits. The gap is measured
//! from the previous grant, so time spent building a report counts toward
//! it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct DeliveryPacer {
    interval: Duration,
    last_grant: Arc<Mutex<Option<Instant>>>,
}

impl DeliveryPacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_grant: Arc::new(Mutex::new(None)),
        }
    }

    /// Pacer that never waits
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the next delivery slot is free, then claim it
    pub async fn acquire(&self) {
        let mut last = self.last_grant.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}
