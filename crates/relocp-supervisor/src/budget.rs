//! Bounded restart accounting

use std::time::Duration;
use tracing::{debug, info};

/// In-memory restart budget.
///
/// At most `max_restarts` restarts are granted over the supervisor's
/// lifetime, but a run that stayed up longer than the stability window
/// resets the counter, so occasional long-spaced failures never exhaust
/// the budget.
#[derive(Debug, Clone)]
pub struct RestartBudget {
    restart_count: u32,
    max_restarts: u32,
    restart_delay: Duration,
    stable_window: Duration,
}

impl RestartBudget {
    /// Create a budget of `max_restarts` with `restart_delay` between
    /// attempts and `stable_window` as the counter-reset threshold
    pub fn new(max_restarts: u32, restart_delay: Duration, stable_window: Duration) -> Self {
        Self {
            restart_count: 0,
            max_restarts,
            restart_delay,
            stable_window,
        }
    }

    /// Account for a finished run; a stable one resets the counter
    pub fn note_run(&mut self, run_duration: Duration) {
        if run_duration >= self.stable_window && self.restart_count > 0 {
            info!(
                stable_secs = run_duration.as_secs(),
                "run was stable, resetting restart counter"
            );
            self.restart_count = 0;
        }
    }

    /// Try to consume one restart; `false` means the budget is exhausted
    pub fn try_restart(&mut self) -> bool {
        if self.restart_count >= self.max_restarts {
            return false;
        }
        self.restart_count += 1;
        debug!(
            restart = self.restart_count,
            max = self.max_restarts,
            "restart granted"
        );
        true
    }

    /// Restarts consumed so far
    pub fn restarts(&self) -> u32 {
        self.restart_count
    }

    /// Delay to wait before the next restart
    pub fn delay(&self) -> Duration {
        self.restart_delay
    }
}
