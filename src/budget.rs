//! IOPS budget gate
//!
//! Grants a fixed number of permits per one-second window. Every filesystem
//! metadata operation (one stat, one directory listing) must acquire exactly
//! one permit first.
//!
//! Permits are front-loaded: a fresh window hands out its whole allowance as
//! fast as callers ask for it, then callers wait for the next window
//! boundary. Nothing is replenished mid-window.
//!
//! ```text
//!   permits_per_second = 3
//!
//!   |-- window 0 --|-- window 1 --|-- window 2 --|
//!   ###            ###            #
//!   ^ burst        ^ burst        ^ remainder
//! ```

use crate::error::ConfigError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Length of one budget window
pub const WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct BudgetWindow {
    window_start: Instant,
    remaining: u32,
}

/// Process-wide operations-per-second gate
///
/// Shared as `Arc<IopsBudget>` between the coordinator and every aggregator.
///
/// The limit holds per budget window, not per sliding second: a burst at the
/// end of one window followed by the next window's burst can put up to
/// `2 * permits_per_second` grants inside one second of wall time.
#[derive(Debug)]
pub struct IopsBudget {
    permits_per_second: u32,
    window: Mutex<BudgetWindow>,
    granted: AtomicU64,
}

impl IopsBudget {
    /// Create a gate granting `permits_per_second` permits per window
    pub fn new(permits_per_second: u32) -> Result<Self, ConfigError> {
        if permits_per_second == 0 {
            return Err(ConfigError::InvalidIopsBudget {
                budget: permits_per_second,
            });
        }

        Ok(Self {
            permits_per_second,
            window: Mutex::new(BudgetWindow {
                window_start: Instant::now(),
                remaining: permits_per_second,
            }),
            granted: AtomicU64::new(0),
        })
    }

    /// Wait until a permit is available and consume it
    pub async fn acquire(&self) {
        loop {
            let next_window = {
                let mut window = self.window.lock();
                let now = Instant::now();

                if now >= window.window_start + WINDOW {
                    window.window_start = now;
                    window.remaining = self.permits_per_second;
                }

                if window.remaining > 0 {
                    window.remaining -= 1;
                    self.granted.fetch_add(1, Ordering::Relaxed);
                    return;
                }

                window.window_start + WINDOW
            };

            trace!(
                wait_ms = next_window.saturating_duration_since(Instant::now()).as_millis() as u64,
                "IOPS budget exhausted, waiting for next window"
            );
            tokio::time::sleep_until(next_window).await;
        }
    }

    /// Permits granted per window
    pub fn permits_per_second(&self) -> u32 {
        self.permits_per_second
    }

    /// Total permits granted since creation
    pub fn granted(&self) -> u64 {
        self.granted.load(Ordering::Relaxed)
    }
}
