// ─────────────────────────────────────────────────────────────────────
// Solenoid Force Core — Compute Budget
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Cooperative deadline and cancellation checks for long integrations.

use crate::error::{CoilError, CoilResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Time and cancellation budget of one unit of work.
#[derive(Debug, Clone)]
pub struct Budget {
    started: Instant,
    deadline: Option<Instant>,
    cancel: Option<CancelToken>,
}

impl Default for Budget {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl Budget {
    /// Budget that never expires and cannot be cancelled.
    pub fn unlimited() -> Self {
        Budget {
            started: Instant::now(),
            deadline: None,
            cancel: None,
        }
    }

    /// Budget starting now, optionally bounded by `timeout`.
    pub fn new(timeout: Option<Duration>, cancel: Option<CancelToken>) -> Self {
        let started = Instant::now();
        Budget {
            started,
            deadline: timeout.map(|t| started + t),
            cancel,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Fails with `Cancelled` or `Timeout` once the budget is spent.
    /// Cancellation takes precedence over the deadline.
    pub fn check(&self) -> CoilResult<()> {
        if let Some(token) = &self.cancel {
            if token.is_cancelled() {
                return Err(CoilError::Cancelled);
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(CoilError::Timeout {
                    elapsed_ms: self.elapsed().as_millis() as u64,
                });
            }
        }
        Ok(())
    }
}
