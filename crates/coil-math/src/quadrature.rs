// ─────────────────────────────────────────────────────────────────────
// Solenoid Force Core — Quadrature
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! One- and two-dimensional quadrature.
//!
//! - Globally adaptive Gauss–Kronrod (7/15): the interval with the largest
//!   error estimate is bisected until the summed estimate drops below
//!   `max(tol, tol·|I|)`, the acceptance rule of QUADPACK/`dblquad`.
//! - Trapezoid rule on sampled data, matching `numpy.trapz`.
//!
//! Integrands are fallible: an evaluation error or a non-finite sample
//! aborts the integral instead of being folded into the sum.

use coil_types::budget::Budget;
use coil_types::error::{CoilError, CoilResult};
use ndarray::{Array2, ArrayView1, Axis};
use std::cell::Cell;

/// Kronrod abscissae on [0, 1]; odd indices are the Gauss-7 nodes.
const XGK: [f64; 8] = [
    0.991_455_371_120_812_6,
    0.949_107_912_342_758_5,
    0.864_864_423_359_769_1,
    0.741_531_185_599_394_4,
    0.586_087_235_467_691_1,
    0.405_845_151_377_397_2,
    0.207_784_955_007_898_5,
    0.0,
];

/// Kronrod-15 weights.
const WGK: [f64; 8] = [
    0.022_935_322_010_529_22,
    0.063_092_092_629_978_55,
    0.104_790_010_322_250_18,
    0.140_653_259_715_525_92,
    0.169_004_726_639_267_9,
    0.190_350_578_064_785_4,
    0.204_432_940_075_298_9,
    0.209_482_141_084_727_83,
];

/// Gauss-7 weights for XGK[1], XGK[3], XGK[5], XGK[7].
const WG: [f64; 4] = [
    0.129_484_966_168_869_7,
    0.279_705_391_489_276_7,
    0.381_830_050_505_118_9,
    0.417_959_183_673_469_4,
];

/// Adaptive quadrature settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveOptions {
    /// Used both as absolute and relative tolerance.
    pub tolerance: f64,
    /// Maximum number of intervals in one 1D integral.
    pub max_subdivisions: usize,
}

impl Default for AdaptiveOptions {
    fn default() -> Self {
        AdaptiveOptions {
            tolerance: 1e-10,
            max_subdivisions: 200,
        }
    }
}

/// Integral estimate with its error bound and the number of integrand calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadEstimate {
    pub value: f64,
    pub error: f64,
    pub evaluations: usize,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    a: f64,
    b: f64,
    value: f64,
    error: f64,
}

fn sample<F>(f: &F, x: f64) -> CoilResult<f64>
where
    F: Fn(f64) -> CoilResult<f64>,
{
    let y = f(x)?;
    if !y.is_finite() {
        return Err(CoilError::IntegrationError(format!(
            "integrand is non-finite ({y}) at x={x:e}"
        )));
    }
    Ok(y)
}

/// One Gauss–Kronrod 7/15 panel on [a, b].
fn gk15<F>(f: &F, a: f64, b: f64) -> CoilResult<Segment>
where
    F: Fn(f64) -> CoilResult<f64>,
{
    let center = 0.5 * (a + b);
    let half = 0.5 * (b - a);

    let fc = sample(f, center)?;
    let mut res_g = fc * WG[3];
    let mut res_k = fc * WGK[7];

    for j in 0..7 {
        let dx = half * XGK[j];
        let pair = sample(f, center - dx)? + sample(f, center + dx)?;
        res_k += WGK[j] * pair;
        if j % 2 == 1 {
            res_g += WG[j / 2] * pair;
        }
    }

    Ok(Segment {
        a,
        b,
        value: res_k * half,
        error: ((res_k - res_g) * half).abs(),
    })
}

/// Adaptive Gauss–Kronrod integral of `f` over [a, b].
///
/// Fails with `NonConvergence` when `max_subdivisions` intervals are not
/// enough, and with the budget's error when it runs out between
/// subdivisions.
pub fn integrate_adaptive<F>(
    f: F,
    a: f64,
    b: f64,
    opts: &AdaptiveOptions,
    budget: &Budget,
) -> CoilResult<QuadEstimate>
where
    F: Fn(f64) -> CoilResult<f64>,
{
    if !a.is_finite() || !b.is_finite() {
        return Err(CoilError::IntegrationError(format!(
            "integration limits must be finite, got [{a}, {b}]"
        )));
    }
    if a == b {
        return Ok(QuadEstimate {
            value: 0.0,
            error: 0.0,
            evaluations: 0,
        });
    }
    budget.check()?;

    let mut segments = vec![gk15(&f, a, b)?];
    let mut evaluations = 15;

    loop {
        let value: f64 = segments.iter().map(|s| s.value).sum();
        let error: f64 = segments.iter().map(|s| s.error).sum();
        if error <= opts.tolerance.max(opts.tolerance * value.abs()) {
            return Ok(QuadEstimate {
                value,
                error,
                evaluations,
            });
        }
        if segments.len() >= opts.max_subdivisions {
            return Err(CoilError::NonConvergence {
                subdivisions: segments.len(),
                estimate: value,
                error,
            });
        }
        budget.check()?;

        let (worst, _) = segments
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(wi, we), (i, s)| {
                if s.error > we {
                    (i, s.error)
                } else {
                    (wi, we)
                }
            });
        let seg = segments.swap_remove(worst);
        let mid = 0.5 * (seg.a + seg.b);
        if mid <= seg.a.min(seg.b) || mid >= seg.a.max(seg.b) {
            // Interval can no longer be split in floating point.
            return Err(CoilError::NonConvergence {
                subdivisions: segments.len() + 1,
                estimate: value,
                error,
            });
        }
        segments.push(gk15(&f, seg.a, mid)?);
        segments.push(gk15(&f, mid, seg.b)?);
        evaluations += 30;
    }
}

/// Adaptive double integral ∫_{x0}^{x1} ∫_{y0}^{y1} f(x, y) dy dx.
///
/// Outer adaptive integral over x of inner adaptive integrals over y, the
/// structure of `scipy.integrate.dblquad`. Both levels share `opts`.
pub fn integrate_adaptive_2d<F>(
    f: F,
    (x0, x1): (f64, f64),
    (y0, y1): (f64, f64),
    opts: &AdaptiveOptions,
    budget: &Budget,
) -> CoilResult<QuadEstimate>
where
    F: Fn(f64, f64) -> CoilResult<f64>,
{
    let inner_evaluations = Cell::new(0usize);
    let outer = integrate_adaptive(
        |x| {
            let inner = integrate_adaptive(|y| f(x, y), y0, y1, opts, budget)?;
            inner_evaluations.set(inner_evaluations.get() + inner.evaluations);
            Ok(inner.value)
        },
        x0,
        x1,
        opts,
        budget,
    )?;
    Ok(QuadEstimate {
        value: outer.value,
        error: outer.error,
        evaluations: inner_evaluations.get(),
    })
}

/// Trapezoid rule over samples `y(x)`; `x` need not be uniform.
pub fn trapezoid(y: ArrayView1<f64>, x: ArrayView1<f64>) -> f64 {
    debug_assert_eq!(y.len(), x.len(), "trapezoid needs matching lengths");
    let n = y.len().min(x.len());
    (1..n)
        .map(|i| 0.5 * (x[i] - x[i - 1]) * (y[i] + y[i - 1]))
        .sum()
}

/// Trapezoid double integral of `values[[iy, ix]]` sampled on `x` (columns)
/// and `y` (rows): first along x for every row, then along y.
pub fn trapezoid_2d(values: &Array2<f64>, x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
    debug_assert_eq!(values.shape(), &[y.len(), x.len()]);
    let rows: Vec<f64> = values
        .axis_iter(Axis(0))
        .map(|row| trapezoid(row, x))
        .collect();
    trapezoid(ArrayView1::from(&rows[..]), y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;
    use std::f64::consts::PI;

    fn opts() -> AdaptiveOptions {
        AdaptiveOptions::default()
    }

    #[test]
    fn test_gk15_exact_for_polynomials() {
        // G7/K15 integrates degree <= 13 exactly in one panel.
        let est = integrate_adaptive(
            |x| Ok(x.powi(12) - 3.0 * x.powi(5) + 1.0),
            -1.0,
            2.0,
            &opts(),
            &Budget::unlimited(),
        )
        .unwrap();
        let exact = (2f64.powi(13) + 1.0) / 13.0 - 0.5 * (64.0 - 1.0) + 3.0;
        assert!((est.value - exact).abs() < 1e-10 * exact.abs());
        assert_eq!(est.evaluations, 15);
    }

    #[test]
    fn test_adaptive_peaked_integrand() {
        // ∫_{-1}^{1} 1/(1e-4 + x²) dx = 2·atan(100)/1e-2
        let est = integrate_adaptive(
            |x| Ok(1.0 / (1e-4 + x * x)),
            -1.0,
            1.0,
            &opts(),
            &Budget::unlimited(),
        )
        .unwrap();
        let exact = 2.0 * (100.0f64).atan() / 1e-2;
        assert!((est.value - exact).abs() < 1e-8 * exact, "got {}", est.value);
        assert!(est.evaluations > 15);
    }

    #[test]
    fn test_reversed_limits_negate() {
        let fwd = integrate_adaptive(|x| Ok(x.sin()), 0.0, PI, &opts(), &Budget::unlimited())
            .unwrap();
        let rev = integrate_adaptive(|x| Ok(x.sin()), PI, 0.0, &opts(), &Budget::unlimited())
            .unwrap();
        assert!((fwd.value - 2.0).abs() < 1e-12);
        assert!((fwd.value + rev.value).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_sample_is_error() {
        let res = integrate_adaptive(
            |x| Ok(if x > 0.5 { f64::NAN } else { x }),
            0.0,
            1.0,
            &opts(),
            &Budget::unlimited(),
        );
        assert!(matches!(res, Err(CoilError::IntegrationError(_))));
    }

    #[test]
    fn test_integrand_error_propagates() {
        let res = integrate_adaptive(
            |_| Err(CoilError::IntegrationError("boom".into())),
            0.0,
            1.0,
            &opts(),
            &Budget::unlimited(),
        );
        assert!(matches!(res, Err(CoilError::IntegrationError(m)) if m == "boom"));
    }

    #[test]
    fn test_subdivision_limit_reports_non_convergence() {
        let tight = AdaptiveOptions {
            tolerance: 1e-14,
            max_subdivisions: 3,
        };
        let res = integrate_adaptive(
            |x| Ok(x.abs().sqrt()),
            -1.0,
            1.0,
            &tight,
            &Budget::unlimited(),
        );
        assert!(matches!(res, Err(CoilError::NonConvergence { .. })));
    }

    #[test]
    fn test_expired_budget_interrupts() {
        let budget = Budget::new(Some(std::time::Duration::ZERO), None);
        let res = integrate_adaptive(|x| Ok(x), 0.0, 1.0, &opts(), &budget);
        assert!(matches!(res, Err(CoilError::Timeout { .. })));
    }

    #[test]
    fn test_adaptive_2d_separable() {
        // ∫_0^1 ∫_0^2 x·y² dy dx = 1/2 · 8/3
        let est = integrate_adaptive_2d(
            |x, y| Ok(x * y * y),
            (0.0, 1.0),
            (0.0, 2.0),
            &opts(),
            &Budget::unlimited(),
        )
        .unwrap();
        assert!((est.value - 4.0 / 3.0).abs() < 1e-12);
        assert_eq!(est.evaluations, 15 * 15);
    }

    #[test]
    fn test_trapezoid_linear_exact() {
        let x = Array1::linspace(0.0, 3.0, 7);
        let y = x.mapv(|v| 2.0 * v + 1.0);
        assert!((trapezoid(y.view(), x.view()) - 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_trapezoid_nonuniform() {
        let x = Array1::from(vec![0.0, 0.1, 0.5, 1.0]);
        let y = x.mapv(|v| v);
        assert!((trapezoid(y.view(), x.view()) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_trapezoid_2d_bilinear_exact() {
        let x = Array1::linspace(0.0, 1.0, 5);
        let y = Array1::linspace(0.0, 2.0, 4);
        let values = Array2::from_shape_fn((4, 5), |(iy, ix)| x[ix] * y[iy]);
        let got = trapezoid_2d(&values, x.view(), y.view());
        assert!((got - 1.0).abs() < 1e-12, "got {got}");
    }
}
