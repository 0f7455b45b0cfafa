//! Readiness loop — block until the database answers a health check.
//!
//! The loop has two states, WAITING and READY. Transient probe failures keep
//! it in WAITING with a fixed sleep between attempts; there is no backoff, no
//! jitter and no attempt cap, so a database that never comes up keeps the
//! caller waiting forever. Fatal failures end the loop immediately.

use std::future::Future;
use std::time::Duration;

use dbwait_common::error::{ProbeResult, WaitError};

/// A probe that confirms every alias in `targets` accepts connections.
pub trait HealthCheck {
    fn check(&self, targets: &[String]) -> impl Future<Output = ProbeResult> + Send;
}

/// Counters for one run of the loop. Never persisted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WaitReport {
    /// Health checks performed, including the successful one.
    pub attempts: u64,
    /// Sleeps taken between failed attempts.
    pub sleeps: u64,
}

#[derive(Debug, Clone)]
pub struct ReadinessWaiter {
    interval: Duration,
}

impl Default for ReadinessWaiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl ReadinessWaiter {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll `check` until it succeeds or fails with a non-transient error.
    pub async fn wait<C: HealthCheck>(
        &self,
        check: &C,
        targets: &[String],
    ) -> Result<WaitReport, WaitError> {
        if targets.is_empty() {
            return Err(WaitError::NoTargets);
        }

        tracing::info!("Waiting for database...");
        let mut report = WaitReport::default();

        loop {
            report.attempts += 1;
            match check.check(targets).await {
                Ok(()) => break,
                Err(e) if e.is_transient() => {
                    tracing::debug!(
                        attempt = report.attempts,
                        database = e.target(),
                        kind = e.kind(),
                        error = %e,
                        "Health check failed"
                    );
                    tracing::info!(
                        "Database unavailable, waiting {}...",
                        describe(self.interval)
                    );
                    tokio::time::sleep(self.interval).await;
                    report.sleeps += 1;
                }
                Err(e) => {
                    tracing::error!(database = e.target(), kind = e.kind(), "Giving up: {e}");
                    return Err(e.into());
                }
            }
        }

        tracing::info!("Database available!");
        Ok(report)
    }
}

/// "1 second", "5 seconds", "250ms".
fn describe(interval: Duration) -> String {
    match interval.as_secs() {
        1 if interval.subsec_nanos() == 0 => "1 second".to_string(),
        n if interval.subsec_nanos() == 0 => format!("{n} seconds"),
        _ => format!("{}ms", interval.as_millis()),
    }
}
