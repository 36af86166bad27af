//! Solenoid field model, force integration, current search and sweep.
//!
//! Data flow: sweep → search (per geometry) → force (per trial current)
//! → field (per integration sample) → elliptic cache.

pub mod field;
pub mod force;
pub mod search;
pub mod sweep;

use coil_types::config::SweepConfig;
use coil_types::error::CoilResult;
use sweep::{ParameterSweep, SweepReport};

/// Validate `config`, run its sweep, and attach shared-cache statistics.
pub fn run_sweep(config: &SweepConfig) -> CoilResult<SweepReport> {
    let sweep = ParameterSweep::from_config(config)?;
    let mut report = sweep.run()?;
    report.cache = sweep.solver().shared_cache_stats();
    Ok(report)
}
