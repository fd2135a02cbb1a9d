//! Keep-alive after user inactivity
//!
//! [`ActivityClock`] records the last user interaction; [`LivenessMonitor`] wakes
//! periodically and pings the platform once the bot has been idle long enough.

use crate::bot::transport::ChatTransport;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Process-wide timestamp of the last user interaction
///
/// Timestamps are milliseconds since the clock was created, read from the
/// runtime's monotonic clock. Updates keep the maximum seen so far, so the
/// clock never moves backwards when handlers race.
#[derive(Debug)]
pub struct ActivityClock {
    origin: Instant,
    last_seen_ms: AtomicU64,
}

impl Default for ActivityClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityClock {
    /// A clock whose origin and last activity are both now
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last_seen_ms: AtomicU64::new(0),
        }
    }

    /// Milliseconds elapsed since the clock was created.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Record activity now.
    pub fn touch(&self) {
        self.record(self.now_ms());
    }

    /// Record activity at `ms`. Older timestamps are ignored.
    pub fn record(&self, ms: u64) {
        self.last_seen_ms.fetch_max(ms, Ordering::AcqRel);
    }

    /// Timestamp of the last recorded activity.
    #[must_use]
    pub fn last_seen_ms(&self) -> u64 {
        self.last_seen_ms.load(Ordering::Acquire)
    }

    /// How long the bot has been idle as of `now_ms`.
    #[must_use]
    pub fn idle_for(&self, now_ms: u64) -> Duration {
        Duration::from_millis(now_ms.saturating_sub(self.last_seen_ms()))
    }
}

/// Background task that keeps the platform connection warm
pub struct LivenessMonitor {
    clock: Arc<ActivityClock>,
    transport: Arc<dyn ChatTransport>,
    wake_interval: Duration,
    keep_alive_after: Duration,
}

impl LivenessMonitor {
    /// Creates a monitor that wakes every `wake_interval` and pings once the
    /// clock has been idle longer than `keep_alive_after`.
    #[must_use]
    pub fn new(
        clock: Arc<ActivityClock>,
        transport: Arc<dyn ChatTransport>,
        wake_interval: Duration,
        keep_alive_after: Duration,
    ) -> Self {
        Self {
            clock,
            transport,
            wake_interval,
            keep_alive_after,
        }
    }

    /// One wake-up. Returns `true` if a ping was attempted.
    ///
    /// A failed ping is logged and not retried until the next wake-up.
    pub async fn check_once(&self, now_ms: u64) -> bool {
        let idle = self.clock.idle_for(now_ms);
        if idle <= self.keep_alive_after {
            debug!(idle_secs = idle.as_secs(), "Recent activity, keep-alive skipped");
            return false;
        }

        info!(idle_secs = idle.as_secs(), "Sending keep-alive request");
        match self.transport.ping().await {
            Ok(()) => info!("Keep-alive request succeeded"),
            Err(e) => warn!(error = %e, "Keep-alive request failed"),
        }
        true
    }

    /// Run until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.wake_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("Liveness monitor stopped");
                    break;
                }
                _ = ticker.tick() => {
                    self.check_once(self.clock.now_ms()).await;
                }
            }
        }
    }

    /// Spawn [`LivenessMonitor::run`] on the runtime.
    #[must_use]
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        info!(
            wake_secs = self.wake_interval.as_secs(),
            keep_alive_secs = self.keep_alive_after.as_secs(),
            "Starting liveness monitor"
        );
        tokio::spawn(self.run(cancel))
    }
}
