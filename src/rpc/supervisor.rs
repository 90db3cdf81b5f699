//! Idle timeout supervision.
//!
//! Sessions [`touch`](ActivityClock::touch) the shared clock on every decoded
//! request; the supervisor stops the server once nobody has touched it for
//! the configured idle timeout.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use super::shutdown::{Shutdown, ShutdownReason};

/// Timestamp of the most recent request across all sessions.
#[derive(Clone)]
pub struct ActivityClock {
    last: Arc<Mutex<Instant>>,
}

impl Default for ActivityClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityClock {
    pub fn new() -> Self {
        Self {
            last: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Record activity now.
    pub fn touch(&self) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        *last = Instant::now();
    }

    /// Time since the last recorded activity.
    pub fn elapsed(&self) -> Duration {
        let last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        last.elapsed()
    }
}

/// Watches the activity clock and triggers shutdown when the server idles.
pub struct IdleSupervisor {
    clock: ActivityClock,
    shutdown: Shutdown,
    timeout: Duration,
    poll_ceiling: Duration,
}

impl IdleSupervisor {
    pub fn new(
        clock: ActivityClock,
        shutdown: Shutdown,
        timeout: Duration,
        poll_ceiling: Duration,
    ) -> Self {
        Self {
            clock,
            shutdown,
            timeout,
            poll_ceiling,
        }
    }

    /// How long to wait before the next check, or `None` if the deadline passed.
    fn next_check(&self, elapsed: Duration) -> Option<Duration> {
        if elapsed >= self.timeout {
            return None;
        }
        Some(self.poll_ceiling.min(self.timeout - elapsed))
    }

    /// Run until the idle deadline passes or the server shuts down for
    /// another reason.
    pub async fn run(self) {
        debug!(timeout_secs = self.timeout.as_secs_f64(), "Idle supervisor started");

        loop {
            let elapsed = self.clock.elapsed();
            let Some(wait) = self.next_check(elapsed) else {
                info!(
                    timeout_secs = self.timeout.as_secs_f64(),
                    "No client activity, stopping server"
                );
                self.shutdown.trigger(ShutdownReason::IdleTimeout);
                return;
            };

            tokio::select! {
                _ = sleep(wait) => {}
                _ = self.shutdown.wait() => {
                    debug!("Idle supervisor released");
                    return;
                }
            }
        }
    }
}
