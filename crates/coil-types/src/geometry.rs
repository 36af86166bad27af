// ─────────────────────────────────────────────────────────────────────
// Solenoid Force Core — Geometry
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Actuator geometry, derived winding layout and the force budget.
//!
//! Axial coordinate z is measured from the coil centre along the shared
//! coil/magnet axis. All lengths are metres.

use crate::constants::{
    ACCELERATION_FACTOR, COIL_STANDOFF_M, COLUMN_LENGTH_M, G_STANDARD, MAX_WINDING_RADIUS_M,
    MU0_SI, NDFEB_DENSITY, NDFEB_REMANENCE_T, WIRE_THICKNESS_M,
};
use crate::error::{CoilError, CoilResult};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Guard added before flooring winding quotients, so that a quotient
/// landing one ulp below an integer still counts the full turn/layer.
const COUNT_EPS: f64 = 1e-9;

fn require_positive(name: &str, value: f64) -> CoilResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(CoilError::ConfigError(format!(
            "{name} must be finite and > 0, got {value}"
        )));
    }
    Ok(())
}

/// floor(length / pitch), clamped at zero.
fn whole_count(length: f64, pitch: f64) -> usize {
    let q = length / pitch;
    if !q.is_finite() || q <= 0.0 {
        return 0;
    }
    (q + COUNT_EPS).floor() as usize
}

/// Axisymmetric ring (or disc, when `inner_radius == 0`) magnet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MagnetGeometry {
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub thickness: f64,
}

impl MagnetGeometry {
    pub fn validate(&self) -> CoilResult<()> {
        if !self.inner_radius.is_finite() || self.inner_radius < 0.0 {
            return Err(CoilError::ConfigError(format!(
                "magnet inner radius must be finite and >= 0, got {}",
                self.inner_radius
            )));
        }
        require_positive("magnet outer radius", self.outer_radius)?;
        require_positive("magnet thickness", self.thickness)?;
        if self.outer_radius <= self.inner_radius {
            return Err(CoilError::ConfigError(format!(
                "magnet outer radius {} must exceed inner radius {}",
                self.outer_radius, self.inner_radius
            )));
        }
        Ok(())
    }

    /// Magnet volume [m³]: π·t·(r_o² − r_i²).
    pub fn volume(&self) -> f64 {
        PI * self.thickness * (self.outer_radius.powi(2) - self.inner_radius.powi(2))
    }

    /// ∫ r dr over the radial extent, the normaliser of the weighted field.
    pub fn radial_moment(&self) -> f64 {
        0.5 * (self.outer_radius.powi(2) - self.inner_radius.powi(2))
    }
}

/// Winding and mounting constants shared by every sweep point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoilConstants {
    #[serde(default = "default_max_winding_radius")]
    pub max_winding_radius: f64,
    #[serde(default = "default_wire_thickness")]
    pub wire_thickness: f64,
    #[serde(default = "default_column_length")]
    pub column_length: f64,
    /// Axial gap between the coil end face and the column.
    #[serde(default = "default_standoff")]
    pub standoff: f64,
}

fn default_max_winding_radius() -> f64 {
    MAX_WINDING_RADIUS_M
}
fn default_wire_thickness() -> f64 {
    WIRE_THICKNESS_M
}
fn default_column_length() -> f64 {
    COLUMN_LENGTH_M
}
fn default_standoff() -> f64 {
    COIL_STANDOFF_M
}

impl Default for CoilConstants {
    fn default() -> Self {
        CoilConstants {
            max_winding_radius: default_max_winding_radius(),
            wire_thickness: default_wire_thickness(),
            column_length: default_column_length(),
            standoff: default_standoff(),
        }
    }
}

impl CoilConstants {
    pub fn validate(&self) -> CoilResult<()> {
        require_positive("max winding radius", self.max_winding_radius)?;
        require_positive("wire thickness", self.wire_thickness)?;
        require_positive("column length", self.column_length)?;
        if !self.standoff.is_finite() || self.standoff < 0.0 {
            return Err(CoilError::ConfigError(format!(
                "coil standoff must be finite and >= 0, got {}",
                self.standoff
            )));
        }
        Ok(())
    }
}

/// Magnet material and the acceleration budget it is sized against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Remanent flux density B_r [T].
    #[serde(default = "default_remanence")]
    pub remanence: f64,
    /// Mass density [kg/m³].
    #[serde(default = "default_density")]
    pub density: f64,
    /// Gravitational acceleration [m/s²].
    #[serde(default = "default_gravity")]
    pub gravity: f64,
    /// Peak acceleration in multiples of `gravity`.
    #[serde(default = "default_acceleration_factor")]
    pub acceleration_factor: f64,
}

fn default_remanence() -> f64 {
    NDFEB_REMANENCE_T
}
fn default_density() -> f64 {
    NDFEB_DENSITY
}
fn default_gravity() -> f64 {
    G_STANDARD
}
fn default_acceleration_factor() -> f64 {
    ACCELERATION_FACTOR
}

impl Default for Material {
    fn default() -> Self {
        Material {
            remanence: default_remanence(),
            density: default_density(),
            gravity: default_gravity(),
            acceleration_factor: default_acceleration_factor(),
        }
    }
}

impl Material {
    pub fn validate(&self) -> CoilResult<()> {
        require_positive("remanence", self.remanence)?;
        require_positive("density", self.density)?;
        require_positive("gravity", self.gravity)?;
        if !self.acceleration_factor.is_finite() || self.acceleration_factor < 0.0 {
            return Err(CoilError::ConfigError(format!(
                "acceleration factor must be finite and >= 0, got {}",
                self.acceleration_factor
            )));
        }
        Ok(())
    }

    /// Magnetisation M_r = B_r / μ₀ [A/m].
    pub fn magnetization(&self) -> f64 {
        self.remanence / MU0_SI
    }

    /// Magnet mass [kg].
    pub fn mass(&self, magnet: &MagnetGeometry) -> f64 {
        self.density * magnet.volume()
    }

    /// Holding force the coil must reach [N]: m·(a·g + g)/2.
    ///
    /// Fails when the result is not a finite positive number.
    pub fn target_force(&self, magnet: &MagnetGeometry) -> CoilResult<f64> {
        let g = self.gravity;
        let force = self.mass(magnet) * (self.acceleration_factor * g + g) / 2.0;
        if !force.is_finite() || force <= 0.0 {
            return Err(CoilError::ConfigError(format!(
                "target force is undefined (got {force}); check magnet geometry and material"
            )));
        }
        Ok(force)
    }
}

/// Derived winding layout of one coil.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindingLayout {
    pub turns_per_layer: usize,
    pub layer_count: usize,
    /// Mean radius of each layer, innermost first.
    pub layer_radii: Vec<f64>,
}

impl WindingLayout {
    pub fn new(core_radius: f64, coil_length: f64, coil: &CoilConstants) -> Self {
        let t = coil.wire_thickness;
        let turns_per_layer = whole_count(coil_length, t);
        let layer_count = whole_count(coil.max_winding_radius - core_radius, t);
        let layer_radii = (0..layer_count)
            .map(|i| core_radius + t * i as f64 + t / 2.0)
            .collect();
        WindingLayout {
            turns_per_layer,
            layer_count,
            layer_radii,
        }
    }

    pub fn total_turns(&self) -> usize {
        self.turns_per_layer * self.layer_count
    }
}

/// Complete geometry of one sweep point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub core_radius: f64,
    pub coil_length: f64,
    pub coil: CoilConstants,
    pub magnet: MagnetGeometry,
}

impl Geometry {
    /// Validated geometry.
    pub fn new(
        core_radius: f64,
        coil_length: f64,
        coil: CoilConstants,
        magnet: MagnetGeometry,
    ) -> CoilResult<Self> {
        let geometry = Geometry {
            core_radius,
            coil_length,
            coil,
            magnet,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    pub fn validate(&self) -> CoilResult<()> {
        self.coil.validate()?;
        self.magnet.validate()?;
        require_positive("core radius", self.core_radius)?;
        require_positive("coil length", self.coil_length)?;
        if self.core_radius > self.coil.max_winding_radius {
            return Err(CoilError::ConfigError(format!(
                "core radius {} exceeds max winding radius {}",
                self.core_radius, self.coil.max_winding_radius
            )));
        }
        Ok(())
    }

    pub fn layout(&self) -> WindingLayout {
        WindingLayout::new(self.core_radius, self.coil_length, &self.coil)
    }

    /// Axial position of the magnet mid-plane relative to the coil centre.
    pub fn magnet_center_z(&self) -> f64 {
        self.coil_length / 2.0 + self.coil.standoff + self.coil.column_length / 2.0
    }

    /// Axial extent `(z_min, z_max)` of the magnet.
    pub fn magnet_z_range(&self) -> (f64, f64) {
        let zc = self.magnet_center_z();
        let half = self.magnet.thickness / 2.0;
        (zc - half, zc + half)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_magnet() -> MagnetGeometry {
        MagnetGeometry {
            inner_radius: 0.015,
            outer_radius: 0.03,
            thickness: 0.01,
        }
    }

    #[test]
    fn test_reference_layout() {
        // 6 cm coil on a 1 cm core, 0.64 mm wire, 4 cm max radius.
        let layout = WindingLayout::new(0.01, 0.06, &CoilConstants::default());
        assert_eq!(layout.turns_per_layer, 93);
        assert_eq!(layout.layer_count, 46);
        assert_eq!(layout.layer_radii.len(), 46);
        assert!((layout.layer_radii[0] - 0.01032).abs() < 1e-12);
        let last = layout.layer_radii[45];
        assert!((last - (0.01 + 0.00064 * 45.0 + 0.00032)).abs() < 1e-12);
    }

    #[test]
    fn test_exact_quotient_not_lost_to_rounding() {
        let coil = CoilConstants {
            wire_thickness: 0.1,
            ..CoilConstants::default()
        };
        // 0.3 / 0.1 = 2.9999999999999996 in binary floating point.
        let layout = WindingLayout::new(0.01, 0.3, &coil);
        assert_eq!(layout.turns_per_layer, 3);
    }

    #[test]
    fn test_core_at_max_radius_has_no_layers() {
        let coil = CoilConstants::default();
        let layout = WindingLayout::new(coil.max_winding_radius, 0.06, &coil);
        assert_eq!(layout.layer_count, 0);
        assert!(layout.layer_radii.is_empty());
        assert_eq!(layout.total_turns(), 0);
    }

    #[test]
    fn test_target_force_reference() {
        let magnet = reference_magnet();
        let material = Material::default();
        let mass = 7400.0 * PI * 0.01 * (0.03f64.powi(2) - 0.015f64.powi(2));
        let expected = mass * (20.0 * 9.8 + 9.8) / 2.0;
        let got = material.target_force(&magnet).unwrap();
        assert!((got - expected).abs() < 1e-12);
        // ≈ 16.15 N for the reference magnet
        assert!((got - 16.147).abs() < 1e-3, "F_target = {got}");
    }

    #[test]
    fn test_target_force_undefined() {
        let material = Material {
            density: 0.0,
            ..Material::default()
        };
        assert!(material.target_force(&reference_magnet()).is_err());
    }

    #[test]
    fn test_inverted_magnet_rejected() {
        let magnet = MagnetGeometry {
            inner_radius: 0.03,
            outer_radius: 0.015,
            thickness: 0.01,
        };
        assert!(matches!(magnet.validate(), Err(CoilError::ConfigError(_))));
    }

    #[test]
    fn test_geometry_validation() {
        let magnet = reference_magnet();
        let coil = CoilConstants::default();
        assert!(Geometry::new(0.01, 0.06, coil, magnet).is_ok());
        assert!(Geometry::new(0.05, 0.06, coil, magnet).is_err());
        assert!(Geometry::new(0.01, 0.0, coil, magnet).is_err());
        let bad_wire = CoilConstants {
            wire_thickness: -1e-3,
            ..coil
        };
        assert!(Geometry::new(0.01, 0.06, bad_wire, magnet).is_err());
    }

    #[test]
    fn test_magnet_position() {
        let geometry =
            Geometry::new(0.01, 0.06, CoilConstants::default(), reference_magnet()).unwrap();
        assert!((geometry.magnet_center_z() - 0.075).abs() < 1e-12);
        let (z0, z1) = geometry.magnet_z_range();
        assert!((z0 - 0.07).abs() < 1e-12);
        assert!((z1 - 0.08).abs() < 1e-12);
    }
}
