use std::time::Duration;

use tokio::time::Instant;

/// Minimum spacing between two remote verifications.
#[derive(Debug)]
pub struct Cooldown {
    min_interval: Duration,
    last: Option<Instant>,
}

impl Cooldown {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    /// Fails with the remaining wait while the previous call is too recent.
    pub fn check(&self) -> Result<(), Duration> {
        match self.last.map(|last| last.elapsed()) {
            Some(elapsed) if elapsed < self.min_interval => Err(self.min_interval - elapsed),
            _ => Ok(()),
        }
    }

    pub fn record(&mut self) {
        self.last = Some(Instant::now());
    }
}
