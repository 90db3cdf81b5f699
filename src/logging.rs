//! Logging and tracing initialization.
//!
//! Structured logging with the `tracing` ecosystem, as pretty console output
//! or as JSON for machine parsing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Configuration for the logging system.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Output logs as JSON (for machine parsing)
    pub json: bool,
    /// Enable verbose logging (sets default level to DEBUG)
    pub verbose: bool,
    /// Default level when not verbose; INFO if unset
    pub quiet_level: Option<Level>,
    /// Write to stderr instead of stdout
    pub stderr: bool,
}

impl LogConfig {
    /// Settings for the interactive console: warnings only, on stderr, so
    /// logs never interleave with prompts.
    pub fn console(verbose: bool) -> Self {
        Self {
            json: false,
            verbose,
            quiet_level: Some(Level::WARN),
            stderr: true,
        }
    }
}

/// Initialize the tracing subscriber with the given configuration.
///
/// The log level can be overridden at runtime via the `RUST_LOG` environment variable.
///
/// ```ignore
/// rpcd::logging::init(LogConfig { verbose: true, ..Default::default() });
/// ```
pub fn init(config: LogConfig) {
    let default_level = if config.verbose {
        Level::DEBUG
    } else {
        config.quiet_level.unwrap_or(Level::INFO)
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("rpcd={}", default_level.as_str().to_lowercase()))
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    match (config.json, config.stderr) {
        (true, _) => registry
            .with(
                fmt::layer()
                    .json()
                    .with_span_events(FmtSpan::CLOSE)
                    .with_current_span(true)
                    .with_target(true),
            )
            .init(),
        (false, true) => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_ids(false),
            )
            .init(),
        (false, false) => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .init(),
    }
}

/// A rate limiter for throttling log messages.
///
/// Used for errors that can repeat in a tight loop, such as failed accepts.
pub struct LogThrottle {
    interval_ms: u64,
    /// Stores the last log time in ms, or u64::MAX to indicate "never logged"
    last_log_ms: AtomicU64,
    start: Instant,
}

/// Sentinel value indicating the throttle has never logged
const NEVER_LOGGED: u64 = u64::MAX;

impl LogThrottle {
    /// Create a new throttle with the given minimum interval between logs.
    pub fn new(interval: std::time::Duration) -> Self {
        Self {
            interval_ms: interval.as_millis() as u64,
            last_log_ms: AtomicU64::new(NEVER_LOGGED),
            start: Instant::now(),
        }
    }

    /// Returns true if enough time has passed since the last log.
    pub fn should_log(&self) -> bool {
        let now_ms = self.start.elapsed().as_millis() as u64;
        let last = self.last_log_ms.load(Ordering::Relaxed);

        let should = last == NEVER_LOGGED || now_ms.saturating_sub(last) >= self.interval_ms;

        if should {
            // Lost the race: another thread logged
            self.last_log_ms
                .compare_exchange(last, now_ms, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
        } else {
            false
        }
    }
}
