use log::debug;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Keeps successive page loads at least `delay` apart
pub struct RequestPacer {
    delay: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RequestPacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_slot: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait (without blocking the runtime) until the next load may be dispatched
    pub async fn wait(&self) {
        if self.delay.is_zero() {
            return;
        }

        // held across the sleep so concurrent callers queue up one delay apart
        let mut next_slot = self.next_slot.lock().await;
        if let Some(slot) = *next_slot {
            if slot > Instant::now() {
                debug!("Pacing next request by {:?}", slot - Instant::now());
                sleep_until(slot).await;
            }
        }
        *next_slot = Some(Instant::now() + self.delay);
    }
}
