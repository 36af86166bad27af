// ─────────────────────────────────────────────────────────────────────
// Solenoid Force Core — Error
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoilError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Integration error: {0}")]
    IntegrationError(String),

    #[error(
        "Quadrature did not converge after {subdivisions} subdivisions: \
         estimate={estimate:e}, error={error:e}"
    )]
    NonConvergence {
        subdivisions: usize,
        estimate: f64,
        error: f64,
    },

    #[error("Computation timed out after {elapsed_ms} ms")]
    Timeout { elapsed_ms: u64 },

    #[error(
        "Current search exhausted at I={last_current} A: |F|={last_force} N < target {target} N"
    )]
    SearchExhausted {
        last_current: f64,
        last_force: f64,
        target: f64,
    },

    #[error("Worker failure: {0}")]
    WorkerFailure(String),

    #[error("Computation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CoilResult<T> = Result<T, CoilError>;

/// Serialisable classification of a per-point failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Configuration,
    Integration,
    Timeout,
    Exhausted,
    Worker,
    Cancelled,
}

impl CoilError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            CoilError::ConfigError(_) | CoilError::Io(_) | CoilError::Json(_) => {
                FailureKind::Configuration
            }
            CoilError::IntegrationError(_) | CoilError::NonConvergence { .. } => {
                FailureKind::Integration
            }
            CoilError::Timeout { .. } => FailureKind::Timeout,
            CoilError::SearchExhausted { .. } => FailureKind::Exhausted,
            CoilError::WorkerFailure(_) => FailureKind::Worker,
            CoilError::Cancelled => FailureKind::Cancelled,
        }
    }

    /// Whether the failure stays local to one sweep point.
    pub fn is_recoverable(&self) -> bool {
        self.failure_kind() != FailureKind::Configuration
    }
}
