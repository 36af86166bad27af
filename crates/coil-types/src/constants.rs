// ─────────────────────────────────────────────────────────────────────
// Solenoid Force Core — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use std::f64::consts::PI;

/// Vacuum permeability (H/m), classical definition 4π·10⁻⁷.
pub const MU0_SI: f64 = 4.0 * PI * 1e-7;

/// Standard gravity used for the force budget (m/s²).
pub const G_STANDARD: f64 = 9.8;

/// Sintered NdFeB remanent flux density (T).
pub const NDFEB_REMANENCE_T: f64 = 1.2;

/// Sintered NdFeB mass density (kg/m³).
pub const NDFEB_DENSITY: f64 = 7400.0;

/// Peak acceleration the magnet must hold against, in multiples of g.
pub const ACCELERATION_FACTOR: f64 = 20.0;

/// Enamelled wire thickness (m), 0.64 mm.
pub const WIRE_THICKNESS_M: f64 = 0.64e-3;

/// Maximum outer winding radius (m).
pub const MAX_WINDING_RADIUS_M: f64 = 0.04;

/// Column length between coil and magnet carrier (m).
pub const COLUMN_LENGTH_M: f64 = 0.08;

/// Axial gap between the coil end face and the column (m).
pub const COIL_STANDOFF_M: f64 = 0.005;

/// Current step of the search (A).
pub const CURRENT_INCREMENT_A: f64 = 0.2;

/// Trial ceiling of the current search.
pub const MAX_SEARCH_ITERATIONS: usize = 10_000;

/// Absolute/relative tolerance of the adaptive quadrature.
pub const ADAPTIVE_TOLERANCE: f64 = 1e-10;

/// Subdivision limit of one adaptive 1D integral.
pub const ADAPTIVE_MAX_SUBDIVISIONS: usize = 200;

/// Fixed-grid radial sample count.
pub const FIXED_GRID_RADIAL: usize = 30;

/// Fixed-grid axial sample count.
pub const FIXED_GRID_AXIAL: usize = 20;

/// Largest number of values one sweep axis may expand to.
pub const MAX_AXIS_POINTS: usize = 10_000;
