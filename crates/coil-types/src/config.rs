// ─────────────────────────────────────────────────────────────────────
// Solenoid Force Core — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::constants::{
    ADAPTIVE_MAX_SUBDIVISIONS, ADAPTIVE_TOLERANCE, CURRENT_INCREMENT_A, FIXED_GRID_AXIAL,
    FIXED_GRID_RADIAL, MAX_AXIS_POINTS, MAX_SEARCH_ITERATIONS,
};
use crate::error::{CoilError, CoilResult};
use crate::geometry::{CoilConstants, MagnetGeometry, Material};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level sweep configuration. Lengths in metres, currents in amperes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_run_name")]
    pub run_name: String,
    pub magnet: MagnetGeometry,
    #[serde(default)]
    pub coil: CoilConstants,
    #[serde(default)]
    pub material: Material,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub integration: IntegrationConfig,
    pub sweep: SweepAxes,
}

fn default_run_name() -> String {
    "solenoid-sweep".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_current_increment")]
    pub current_increment: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Optional hard cap on the trial current [A].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_current: Option<f64>,
}

fn default_current_increment() -> f64 {
    CURRENT_INCREMENT_A
}
fn default_max_iterations() -> usize {
    MAX_SEARCH_ITERATIONS
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            current_increment: default_current_increment(),
            max_iterations: default_max_iterations(),
            max_current: None,
        }
    }
}

/// Quadrature used for the force double integral.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrationStrategy {
    /// Globally adaptive Gauss–Kronrod; the accuracy reference.
    Adaptive {
        #[serde(default = "default_tolerance")]
        tolerance: f64,
        #[serde(default = "default_max_subdivisions")]
        max_subdivisions: usize,
    },
    /// Trapezoid rule on a fixed `radial × axial` sample grid.
    ///
    /// At the default 30 × 20 grid the force differs from the adaptive
    /// rule by about 3.5e-5 relative on the reference geometry (46 layers
    /// of 0.64 mm wire, 1 cm ring magnet). The error falls as the square
    /// of the sample spacing.
    FixedGrid {
        #[serde(default = "default_radial")]
        radial: usize,
        #[serde(default = "default_axial")]
        axial: usize,
    },
}

fn default_tolerance() -> f64 {
    ADAPTIVE_TOLERANCE
}
fn default_max_subdivisions() -> usize {
    ADAPTIVE_MAX_SUBDIVISIONS
}
fn default_radial() -> usize {
    FIXED_GRID_RADIAL
}
fn default_axial() -> usize {
    FIXED_GRID_AXIAL
}

impl Default for IntegrationStrategy {
    fn default() -> Self {
        IntegrationStrategy::Adaptive {
            tolerance: default_tolerance(),
            max_subdivisions: default_max_subdivisions(),
        }
    }
}

impl IntegrationStrategy {
    pub fn fixed_grid() -> Self {
        IntegrationStrategy::FixedGrid {
            radial: default_radial(),
            axial: default_axial(),
        }
    }

    pub fn validate(&self) -> CoilResult<()> {
        match *self {
            IntegrationStrategy::Adaptive {
                tolerance,
                max_subdivisions,
            } => {
                if !tolerance.is_finite() || tolerance <= 0.0 {
                    return Err(CoilError::ConfigError(format!(
                        "adaptive tolerance must be finite and > 0, got {tolerance}"
                    )));
                }
                if max_subdivisions == 0 {
                    return Err(CoilError::ConfigError(
                        "adaptive max_subdivisions must be >= 1".to_string(),
                    ));
                }
            }
            IntegrationStrategy::FixedGrid { radial, axial } => {
                if radial < 2 || axial < 2 {
                    return Err(CoilError::ConfigError(format!(
                        "fixed grid needs >= 2 samples per axis, got {radial}x{axial}"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegrationConfig {
    #[serde(default)]
    pub strategy: IntegrationStrategy,
    /// Finite-difference step for dB/dz [m]. Derived from the magnet
    /// thickness when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fd_step: Option<f64>,
}

/// One swept parameter: explicit values or a half-open arange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterAxis {
    Values(Vec<f64>),
    Range { start: f64, stop: f64, step: f64 },
}

impl ParameterAxis {
    /// Expanded axis values. A range behaves like `arange(start, stop, step)`.
    pub fn values(&self) -> CoilResult<Vec<f64>> {
        let values = match self {
            ParameterAxis::Values(v) => v.clone(),
            &ParameterAxis::Range { start, stop, step } => {
                if !start.is_finite() || !stop.is_finite() || !step.is_finite() || step <= 0.0 {
                    return Err(CoilError::ConfigError(format!(
                        "invalid axis range start={start}, stop={stop}, step={step}"
                    )));
                }
                let n = ((stop - start) / step).ceil();
                if n > MAX_AXIS_POINTS as f64 {
                    return Err(CoilError::ConfigError(format!(
                        "axis range start={start}, stop={stop}, step={step} expands to {n:e} \
                         values, more than {MAX_AXIS_POINTS}"
                    )));
                }
                if n < 1.0 {
                    Vec::new()
                } else {
                    (0..n as usize).map(|i| start + step * i as f64).collect()
                }
            }
        };
        if values.is_empty() {
            return Err(CoilError::ConfigError("sweep axis is empty".to_string()));
        }
        if values.len() > MAX_AXIS_POINTS {
            return Err(CoilError::ConfigError(format!(
                "sweep axis has {} values, more than {MAX_AXIS_POINTS}",
                values.len()
            )));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(CoilError::ConfigError(format!(
                "sweep axis contains non-finite value {bad}"
            )));
        }
        Ok(values)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepAxes {
    pub core_radii: ParameterAxis,
    pub coil_lengths: ParameterAxis,
    /// Worker pool size; rayon's default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point_timeout_secs: Option<f64>,
    /// Share one elliptic-integral cache across all sweep points.
    #[serde(default)]
    pub shared_cache: bool,
}

impl SweepConfig {
    /// Load from JSON file.
    pub fn from_file(path: &str) -> CoilResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Full validation. Every error here is fatal to the run.
    pub fn validate(&self) -> CoilResult<()> {
        self.magnet.validate()?;
        self.coil.validate()?;
        self.material.validate()?;
        self.material.target_force(&self.magnet)?;

        let inc = self.search.current_increment;
        if !inc.is_finite() || inc <= 0.0 {
            return Err(CoilError::ConfigError(format!(
                "current increment must be finite and > 0, got {inc}"
            )));
        }
        if self.search.max_iterations == 0 {
            return Err(CoilError::ConfigError(
                "search max_iterations must be >= 1".to_string(),
            ));
        }
        if let Some(cap) = self.search.max_current {
            if !cap.is_finite() || cap < inc {
                return Err(CoilError::ConfigError(format!(
                    "max current must be finite and >= one increment ({inc}), got {cap}"
                )));
            }
        }

        self.integration.strategy.validate()?;
        if let Some(h) = self.integration.fd_step {
            let limit = 1e-3 * self.magnet.thickness;
            if !h.is_finite() || h <= 0.0 || h > limit {
                return Err(CoilError::ConfigError(format!(
                    "fd_step must lie in (0, {limit:e}], got {h}"
                )));
            }
        }

        for r in self.sweep.core_radii.values()? {
            if r <= 0.0 || r > self.coil.max_winding_radius {
                return Err(CoilError::ConfigError(format!(
                    "core radius {r} outside (0, {}]",
                    self.coil.max_winding_radius
                )));
            }
        }
        for l in self.sweep.coil_lengths.values()? {
            if l <= 0.0 {
                return Err(CoilError::ConfigError(format!(
                    "coil length must be > 0, got {l}"
                )));
            }
        }
        if self.sweep.workers == Some(0) {
            return Err(CoilError::ConfigError("workers must be >= 1".to_string()));
        }
        if let Some(t) = self.sweep.point_timeout_secs {
            if !t.is_finite() || t <= 0.0 || Duration::try_from_secs_f64(t).is_err() {
                return Err(CoilError::ConfigError(format!(
                    "point timeout must be finite, > 0 and representable, got {t}"
                )));
            }
        }
        Ok(())
    }
}
