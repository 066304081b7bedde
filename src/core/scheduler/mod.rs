//! # Scheduler Module
//!
//! Drives the optimizer and the janitor on their own periods.
//!
//! ## Loop
//! 1. Optimize once at startup
//! 2. Sleep for the optimize interval (plus the error backoff after a failed cycle)
//! 3. Optimize, then sweep the cache if the cleanup interval has elapsed
//! 4. Repeat until the shutdown flag is set
//!
//! The first sweep comes one cleanup interval after startup. A failing or
//! panicking cycle is logged and the loop carries on. A source root that does
//! not exist yet counts as an empty cycle, not a failure.

use crate::core::janitor::{CacheJanitor, SweepReport};
use crate::core::pipeline::Optimizer;
use crate::error::{OptimizerError, ScanError};
use crate::events::{null_sender, CycleSummary};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant, SystemTime};
use tracing::{error, info, warn};

/// Granularity of the interruptible sleep
const WAKE_INTERVAL: Duration = Duration::from_millis(250);

/// What one scheduled step did
#[derive(Debug, Clone, Default)]
pub struct TickOutcome {
    /// Summary of the optimize cycle; `None` if it failed
    pub cycle: Option<CycleSummary>,
    /// Sweep report if cleanup was due
    pub sweep: Option<SweepReport>,
}

impl TickOutcome {
    pub fn failed(&self) -> bool {
        self.cycle.is_none()
    }
}

pub struct Scheduler {
    optimizer: Optimizer,
    janitor: CacheJanitor,
    optimize_interval: Duration,
    cleanup_interval: Duration,
    error_backoff: Duration,
    /// Start time until the first sweep
    last_cleanup: SystemTime,
}

impl Scheduler {
    /// Takes intervals from the optimizer's configuration
    pub fn new(optimizer: Optimizer) -> Self {
        let config = optimizer.config();
        let janitor = CacheJanitor::new(optimizer.layout().clone(), config.retention);
        Self {
            optimize_interval: config.optimize_interval,
            cleanup_interval: config.cleanup_interval,
            error_backoff: config.error_backoff,
            optimizer,
            janitor,
            last_cleanup: SystemTime::now(),
        }
    }

    pub fn last_cleanup(&self) -> SystemTime {
        self.last_cleanup
    }

    /// Run until `shutdown` is set. Returns after the step in progress completes.
    pub fn run(&mut self, shutdown: &AtomicBool) {
        info!(
            "Starting VR optimizer: optimize every {}s, cleanup every {}s",
            self.optimize_interval.as_secs(),
            self.cleanup_interval.as_secs()
        );

        self.last_cleanup = SystemTime::now();
        let mut last_failed = self.optimize().is_none();

        loop {
            let wait = if last_failed {
                self.optimize_interval + self.error_backoff
            } else {
                self.optimize_interval
            };
            if sleep_unless_shutdown(wait, shutdown) {
                break;
            }
            last_failed = self.tick(SystemTime::now()).failed();
        }

        info!("VR optimizer stopped");
    }

    /// One scheduled step: optimize, then clean up if due at `now`
    pub fn tick(&mut self, now: SystemTime) -> TickOutcome {
        let cycle = self.optimize();

        let sweep = if self.cleanup_due(now) {
            let report = self.cleanup(now);
            self.last_cleanup = now;
            report
        } else {
            None
        };

        TickOutcome { cycle, sweep }
    }

    fn cleanup_due(&self, now: SystemTime) -> bool {
        now.duration_since(self.last_cleanup)
            .map(|elapsed| elapsed > self.cleanup_interval)
            .unwrap_or(false)
    }

    fn optimize(&self) -> Option<CycleSummary> {
        match catch_unwind(AssertUnwindSafe(|| self.optimizer.run_cycle())) {
            Ok(Ok(report)) => Some(report.summary),
            Ok(Err(OptimizerError::Scan(ScanError::DirectoryNotFound { path }))) => {
                warn!("No VR content found: {} does not exist", path.display());
                Some(CycleSummary::default())
            }
            Ok(Err(e)) => {
                error!("Error in optimization cycle: {}", e);
                None
            }
            Err(panic) => {
                error!("Optimization cycle panicked: {}", panic_message(panic.as_ref()));
                None
            }
        }
    }

    fn cleanup(&self, now: SystemTime) -> Option<SweepReport> {
        info!(
            "Cleaning up cache files older than {} days",
            self.janitor.retention().as_secs() / 86400
        );
        match catch_unwind(AssertUnwindSafe(|| self.janitor.sweep_at(now, &null_sender()))) {
            Ok(report) => Some(report),
            Err(panic) => {
                error!("Cache cleanup panicked: {}", panic_message(panic.as_ref()));
                None
            }
        }
    }
}

/// Sleep for `duration` in short slices. Returns true if shutdown was requested.
fn sleep_unless_shutdown(duration: Duration, shutdown: &AtomicBool) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if shutdown.load(Ordering::SeqCst) {
            return true;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return false;
        }
        thread::sleep(remaining.min(WAKE_INTERVAL));
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
