// ─────────────────────────────────────────────────────────────────────
// Solenoid Force Core — Force Integrator
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Axial force on a ring magnet from a layered solenoid.
//!
//! Per layer: F = M_r · 2π · ∫∫ (∂B_z/∂z)(r, z) · r dr dz over the
//! magnet cross-section, M_r = B_r / μ₀. Layer forces are summed with
//! their sign; an attracting coil gives a negative force.

use crate::field::{balanced_fd_step, FieldModel, SolenoidLayer};
use coil_math::cache::EllipticCache;
use coil_math::quadrature::{
    integrate_adaptive, integrate_adaptive_2d, trapezoid, trapezoid_2d, AdaptiveOptions,
};
use coil_types::budget::Budget;
use coil_types::config::IntegrationStrategy;
use coil_types::error::{CoilError, CoilResult};
use coil_types::geometry::{Geometry, Material, WindingLayout};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Result of one force evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceSample {
    pub current: f64,
    /// Signed net axial force [N].
    pub force: f64,
    /// Contribution of each layer, innermost first.
    pub layer_forces: Vec<f64>,
}

/// Sample points of the fixed-grid rule.
#[derive(Debug, Clone)]
struct SampleGrid {
    r: Array1<f64>,
    z: Array1<f64>,
}

/// Force and mid-plane field of one geometry, for any drive current.
#[derive(Debug)]
pub struct ForceIntegrator<C> {
    field: FieldModel<C>,
    layout: WindingLayout,
    layers: Vec<SolenoidLayer>,
    strategy: IntegrationStrategy,
    magnetization: f64,
    r_range: (f64, f64),
    z_range: (f64, f64),
    z_center: f64,
    radial_moment: f64,
    grid: Option<SampleGrid>,
    budget: Budget,
}

impl<C: EllipticCache> ForceIntegrator<C> {
    /// Build an integrator for `geometry`.
    ///
    /// `fd_step` overrides the derivative step; by default it is the
    /// balanced step for the magnet thickness.
    pub fn new(
        geometry: &Geometry,
        material: &Material,
        strategy: IntegrationStrategy,
        cache: C,
        fd_step: Option<f64>,
    ) -> CoilResult<Self> {
        geometry.validate()?;
        material.validate()?;
        strategy.validate()?;

        let magnet = geometry.magnet;
        let step = fd_step.unwrap_or_else(|| balanced_fd_step(magnet.thickness));
        let field = FieldModel::new(cache, step)?;

        let layout = geometry.layout();
        let layers = layout
            .layer_radii
            .iter()
            .map(|&radius| SolenoidLayer {
                radius,
                turns: layout.turns_per_layer,
                length: geometry.coil_length,
            })
            .collect();

        let r_range = (magnet.inner_radius, magnet.outer_radius);
        let z_range = geometry.magnet_z_range();
        let grid = match strategy {
            IntegrationStrategy::FixedGrid { radial, axial } => Some(SampleGrid {
                r: Array1::linspace(r_range.0, r_range.1, radial),
                z: Array1::linspace(z_range.0, z_range.1, axial),
            }),
            IntegrationStrategy::Adaptive { .. } => None,
        };

        Ok(ForceIntegrator {
            field,
            layout,
            layers,
            strategy,
            magnetization: material.magnetization(),
            r_range,
            z_range,
            z_center: geometry.magnet_center_z(),
            radial_moment: magnet.radial_moment(),
            grid,
            budget: Budget::unlimited(),
        })
    }

    /// Attach a deadline/cancellation budget checked during integration.
    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    pub fn budget(&self) -> &Budget {
        &self.budget
    }

    pub fn layout(&self) -> &WindingLayout {
        &self.layout
    }

    pub fn strategy(&self) -> IntegrationStrategy {
        self.strategy
    }

    pub fn field(&self) -> &FieldModel<C> {
        &self.field
    }

    /// Signed force [N] of one layer.
    pub fn layer_force(&self, layer: &SolenoidLayer, current: f64) -> CoilResult<f64> {
        let integral = match self.strategy {
            IntegrationStrategy::Adaptive {
                tolerance,
                max_subdivisions,
            } => {
                let opts = AdaptiveOptions {
                    tolerance,
                    max_subdivisions,
                };
                integrate_adaptive_2d(
                    |r, z| Ok(self.field.axial_field_gradient(r, z, layer, current) * r),
                    self.r_range,
                    self.z_range,
                    &opts,
                    &self.budget,
                )?
                .value
            }
            IntegrationStrategy::FixedGrid { .. } => self.grid_integral(layer, current)?,
        };
        let force = self.magnetization * 2.0 * PI * integral;
        if !force.is_finite() {
            return Err(CoilError::IntegrationError(format!(
                "non-finite force {force} for layer radius {} at I={current}",
                layer.radius
            )));
        }
        Ok(force)
    }

    fn grid_integral(&self, layer: &SolenoidLayer, current: f64) -> CoilResult<f64> {
        let grid = self.grid.as_ref().ok_or_else(|| {
            CoilError::IntegrationError("fixed grid was not prepared".to_string())
        })?;
        let mut values = Array2::<f64>::zeros((grid.z.len(), grid.r.len()));
        for (iz, &z) in grid.z.iter().enumerate() {
            self.budget.check()?;
            for (ir, &r) in grid.r.iter().enumerate() {
                let v = self.field.axial_field_gradient(r, z, layer, current) * r;
                if !v.is_finite() {
                    return Err(CoilError::IntegrationError(format!(
                        "non-finite dB/dz at r={r:e}, z={z:e}"
                    )));
                }
                values[[iz, ir]] = v;
            }
        }
        Ok(trapezoid_2d(&values, grid.r.view(), grid.z.view()))
    }

    /// Total signed force at `current`, summed over all layers.
    pub fn evaluate(&self, current: f64) -> CoilResult<ForceSample> {
        self.budget.check()?;
        let layer_forces = self
            .layers
            .iter()
            .map(|layer| self.layer_force(layer, current))
            .collect::<CoilResult<Vec<f64>>>()?;
        Ok(ForceSample {
            current,
            force: layer_forces.iter().sum(),
            layer_forces,
        })
    }

    pub fn total_force(&self, current: f64) -> CoilResult<f64> {
        Ok(self.evaluate(current)?.force)
    }

    /// Radially weighted mean of B_z over the magnet mid-plane, summed
    /// over layers: Σ ∫ B_z r dr / ∫ r dr.
    pub fn average_field(&self, current: f64) -> CoilResult<f64> {
        self.budget.check()?;
        let z = self.z_center;
        let mut total = 0.0;
        for layer in &self.layers {
            let weighted = match (&self.strategy, &self.grid) {
                (IntegrationStrategy::FixedGrid { .. }, Some(grid)) => {
                    let samples = grid
                        .r
                        .mapv(|r| self.field.axial_field(r, z, layer, current) * r);
                    trapezoid(samples.view(), grid.r.view())
                }
                (
                    &IntegrationStrategy::Adaptive {
                        tolerance,
                        max_subdivisions,
                    },
                    _,
                ) => {
                    let opts = AdaptiveOptions {
                        tolerance,
                        max_subdivisions,
                    };
                    integrate_adaptive(
                        |r| Ok(self.field.axial_field(r, z, layer, current) * r),
                        self.r_range.0,
                        self.r_range.1,
                        &opts,
                        &self.budget,
                    )?
                    .value
                }
                (IntegrationStrategy::FixedGrid { .. }, None) => {
                    return Err(CoilError::IntegrationError(
                        "fixed grid was not prepared".to_string(),
                    ))
                }
            };
            total += weighted / self.radial_moment;
        }
        if !total.is_finite() {
            return Err(CoilError::IntegrationError(format!(
                "non-finite mid-plane field {total} at I={current}"
            )));
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coil_math::cache::LocalEllipticCache;
    use coil_types::budget::CancelToken;
    use coil_types::geometry::{CoilConstants, MagnetGeometry};

    fn magnet() -> MagnetGeometry {
        MagnetGeometry {
            inner_radius: 0.015,
            outer_radius: 0.03,
            thickness: 0.01,
        }
    }

    /// 6 cm coil on a 1 cm core with 5 mm wire: 12 turns × 6 layers.
    fn coarse_geometry() -> Geometry {
        let coil = CoilConstants {
            wire_thickness: 0.005,
            ..CoilConstants::default()
        };
        Geometry::new(0.01, 0.06, coil, magnet()).unwrap()
    }

    fn integrator(
        geometry: &Geometry,
        strategy: IntegrationStrategy,
    ) -> ForceIntegrator<LocalEllipticCache> {
        ForceIntegrator::new(
            geometry,
            &Material::default(),
            strategy,
            LocalEllipticCache::new(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_layout_is_exposed() {
        let fi = integrator(&coarse_geometry(), IntegrationStrategy::fixed_grid());
        assert_eq!(fi.layout().turns_per_layer, 12);
        assert_eq!(fi.layout().layer_count, 6);
    }

    #[test]
    fn test_fixed_grid_force_magnitude() {
        let fi = integrator(&coarse_geometry(), IntegrationStrategy::fixed_grid());
        let sample = fi.evaluate(1.0).unwrap();
        assert_eq!(sample.layer_forces.len(), 6);
        // Attractive, ≈ −0.0389 N per ampere for this coil.
        assert!(
            (sample.force + 0.03894).abs() < 4e-4,
            "force = {}",
            sample.force
        );
        let sum: f64 = sample.layer_forces.iter().sum();
        assert_eq!(sum, sample.force);
    }

    #[test]
    fn test_adaptive_agrees_with_fixed_grid() {
        let g = coarse_geometry();
        let fixed = integrator(&g, IntegrationStrategy::fixed_grid())
            .total_force(1.0)
            .unwrap();
        let adaptive = integrator(&g, IntegrationStrategy::default())
            .total_force(1.0)
            .unwrap();
        let rel = ((fixed - adaptive) / adaptive).abs();
        assert!(rel < 2e-4, "fixed {fixed} vs adaptive {adaptive} (rel {rel:e})");
    }

    #[test]
    fn test_force_magnitude_increases_with_current() {
        let fi = integrator(&coarse_geometry(), IntegrationStrategy::fixed_grid());
        let f: Vec<f64> = [1.0, 2.0, 3.0]
            .iter()
            .map(|&i| fi.total_force(i).unwrap().abs())
            .collect();
        assert!(f[0] < f[1] && f[1] < f[2], "{f:?}");
        assert!((f[1] / f[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_layers_gives_zero_force() {
        let g = Geometry::new(0.04, 0.06, CoilConstants::default(), magnet()).unwrap();
        let fi = integrator(&g, IntegrationStrategy::default());
        assert_eq!(fi.layout().layer_count, 0);
        let sample = fi.evaluate(100.0).unwrap();
        assert_eq!(sample.force, 0.0);
        assert!(sample.layer_forces.is_empty());
        assert_eq!(fi.average_field(100.0).unwrap(), 0.0);
    }

    #[test]
    fn test_average_field_strategies_agree() {
        let g = coarse_geometry();
        let fixed = integrator(&g, IntegrationStrategy::fixed_grid())
            .average_field(1.0)
            .unwrap();
        let adaptive = integrator(&g, IntegrationStrategy::default())
            .average_field(1.0)
            .unwrap();
        assert!(fixed.is_finite() && fixed != 0.0);
        assert!(((fixed - adaptive) / adaptive).abs() < 1e-3);
        let neg = integrator(&g, IntegrationStrategy::fixed_grid())
            .average_field(-1.0)
            .unwrap();
        assert_eq!(neg, -fixed);
    }

    #[test]
    fn test_cancelled_budget_stops_evaluation() {
        let token = CancelToken::new();
        token.cancel();
        let fi = integrator(&coarse_geometry(), IntegrationStrategy::fixed_grid())
            .with_budget(Budget::new(None, Some(token)));
        assert!(matches!(fi.evaluate(1.0), Err(CoilError::Cancelled)));
    }

    #[test]
    fn test_repeat_trials_reuse_cache() {
        let fi = integrator(&coarse_geometry(), IntegrationStrategy::fixed_grid());
        fi.evaluate(0.2).unwrap();
        let after_first = fi.field().cache().stats();
        fi.evaluate(0.4).unwrap();
        let after_second = fi.field().cache().stats();
        assert_eq!(after_first.misses, after_second.misses);
        assert!(after_second.hits > after_first.hits);
    }

    #[test]
    fn test_rejects_invalid_strategy() {
        let res = ForceIntegrator::new(
            &coarse_geometry(),
            &Material::default(),
            IntegrationStrategy::FixedGrid { radial: 1, axial: 10 },
            LocalEllipticCache::new(),
            None,
        );
        assert!(matches!(res, Err(CoilError::ConfigError(_))));
    }
}
