// ─────────────────────────────────────────────────────────────────────
// Solenoid Force Core — Elliptic
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Complete elliptic integrals K(m) and Π(n, m).
//!
//! Evaluated through Carlson's symmetric forms R_F, R_C and R_J using the
//! duplication theorem (B. C. Carlson, "Numerical computation of real or
//! complex elliptic integrals", Numer. Algorithms 10, 1995). Parameter
//! convention matches mpmath/scipy: m = k², n is the characteristic.
//!
//! The polynomial fits of A&S 17.3.34 stop at ~2e-8, which is not enough
//! once a finite-difference derivative is taken downstream. The
//! duplication loops below stop when every normalised deviation is below
//! `DUPLICATION_TOL`; the truncated series then carries a relative error of
//! order `DUPLICATION_TOL^6`, i.e. the result is limited by round-off
//! (≈1e-15 relative).

const DUPLICATION_TOL: f64 = 1e-3;

/// Upper bound on duplication steps. Each step shrinks the deviations by
/// about 4x, so valid arguments converge in well under 30.
const MAX_DUPLICATIONS: usize = 64;

/// Carlson's degenerate integral R_C(x, y) for x >= 0, y > 0.
pub fn carlson_rc(x: f64, y: f64) -> f64 {
    debug_assert!(x >= 0.0 && y > 0.0, "R_C requires x >= 0, y > 0");

    const C1: f64 = 0.3;
    const C2: f64 = 1.0 / 7.0;
    const C3: f64 = 0.375;
    const C4: f64 = 9.0 / 22.0;

    let mut xt = x;
    let mut yt = y;
    let mut ave = (xt + yt + yt) / 3.0;
    let mut s = (yt - ave) / ave;
    for _ in 0..MAX_DUPLICATIONS {
        if s.abs() <= DUPLICATION_TOL {
            break;
        }
        let lambda = 2.0 * xt.sqrt() * yt.sqrt() + yt;
        xt = 0.25 * (xt + lambda);
        yt = 0.25 * (yt + lambda);
        ave = (xt + yt + yt) / 3.0;
        s = (yt - ave) / ave;
    }
    (1.0 + s * s * (C1 + s * (C2 + s * (C3 + s * C4)))) / ave.sqrt()
}

/// Carlson's integral of the first kind R_F(x, y, z).
///
/// Arguments must be non-negative with at most one of them zero.
pub fn carlson_rf(x: f64, y: f64, z: f64) -> f64 {
    debug_assert!(
        x >= 0.0 && y >= 0.0 && z >= 0.0,
        "R_F requires non-negative arguments, got ({x}, {y}, {z})"
    );

    const C1: f64 = 1.0 / 24.0;
    const C2: f64 = 0.1;
    const C3: f64 = 3.0 / 44.0;
    const C4: f64 = 1.0 / 14.0;

    let (mut xt, mut yt, mut zt) = (x, y, z);
    let (mut dx, mut dy, mut dz);
    let mut ave;
    let mut steps = 0;
    loop {
        let (sx, sy, sz) = (xt.sqrt(), yt.sqrt(), zt.sqrt());
        let lambda = sx * (sy + sz) + sy * sz;
        xt = 0.25 * (xt + lambda);
        yt = 0.25 * (yt + lambda);
        zt = 0.25 * (zt + lambda);
        ave = (xt + yt + zt) / 3.0;
        dx = (ave - xt) / ave;
        dy = (ave - yt) / ave;
        dz = (ave - zt) / ave;
        steps += 1;
        if dx.abs().max(dy.abs()).max(dz.abs()) <= DUPLICATION_TOL || steps >= MAX_DUPLICATIONS {
            break;
        }
    }
    let e2 = dx * dy - dz * dz;
    let e3 = dx * dy * dz;
    (1.0 + (C1 * e2 - C2 - C3 * e3) * e2 + C4 * e3) / ave.sqrt()
}

/// Carlson's integral of the third kind R_J(x, y, z, p) for p > 0.
///
/// x, y, z must be non-negative with at most one of them zero.
pub fn carlson_rj(x: f64, y: f64, z: f64, p: f64) -> f64 {
    debug_assert!(
        x >= 0.0 && y >= 0.0 && z >= 0.0 && p > 0.0,
        "R_J requires x,y,z >= 0 and p > 0, got ({x}, {y}, {z}, {p})"
    );

    const C1: f64 = 3.0 / 14.0;
    const C2: f64 = 1.0 / 3.0;
    const C3: f64 = 3.0 / 22.0;
    const C4: f64 = 3.0 / 26.0;
    const C5: f64 = 0.75 * C3;
    const C6: f64 = 1.5 * C4;
    const C7: f64 = 0.5 * C2;
    const C8: f64 = C3 + C3;

    let (mut xt, mut yt, mut zt, mut pt) = (x, y, z, p);
    let mut sum = 0.0;
    let mut fac = 1.0;
    let (mut dx, mut dy, mut dz, mut dp);
    let mut ave;
    let mut steps = 0;
    loop {
        let (sx, sy, sz) = (xt.sqrt(), yt.sqrt(), zt.sqrt());
        let lambda = sx * (sy + sz) + sy * sz;
        let alpha = (pt * (sx + sy + sz) + sx * sy * sz).powi(2);
        let beta = pt * (pt + lambda).powi(2);
        sum += fac * carlson_rc(alpha, beta);
        fac *= 0.25;
        xt = 0.25 * (xt + lambda);
        yt = 0.25 * (yt + lambda);
        zt = 0.25 * (zt + lambda);
        pt = 0.25 * (pt + lambda);
        ave = 0.2 * (xt + yt + zt + pt + pt);
        dx = (ave - xt) / ave;
        dy = (ave - yt) / ave;
        dz = (ave - zt) / ave;
        dp = (ave - pt) / ave;
        steps += 1;
        let dev = dx.abs().max(dy.abs()).max(dz.abs()).max(dp.abs());
        if dev <= DUPLICATION_TOL || steps >= MAX_DUPLICATIONS {
            break;
        }
    }
    let ea = dx * (dy + dz) + dy * dz;
    let eb = dx * dy * dz;
    let ec = dp * dp;
    let ed = ea - 3.0 * ec;
    let ee = eb + 2.0 * dp * (ea - ec);
    3.0 * sum
        + fac
            * (1.0
                + ed * (-C1 + C5 * ed - C6 * ee)
                + eb * (C7 + dp * (-C8 + dp * C4))
                + dp * ea * (C2 - dp * C3)
                - C2 * dp * ec)
            / (ave * ave.sqrt())
}

/// Complete elliptic integral of the first kind K(m) = R_F(0, 1−m, 1).
///
/// Matches `mpmath.ellipk(m)` / `scipy.special.ellipk(m)`. Returns +∞ at
/// m = 1 and NaN for m > 1 or non-finite input.
pub fn ellipk(m: f64) -> f64 {
    if !m.is_finite() || m > 1.0 {
        return f64::NAN;
    }
    if m == 1.0 {
        return f64::INFINITY;
    }
    carlson_rf(0.0, 1.0 - m, 1.0)
}

/// Complete elliptic integral of the third kind Π(n, m), n < 1.
///
/// Matches `mpmath.ellippi(n, m)`:
/// Π(n, m) = R_F(0, 1−m, 1) + (n/3)·R_J(0, 1−m, 1, 1−n).
pub fn ellippi(n: f64, m: f64) -> f64 {
    ellipk_and_pi(m, n).1
}

/// `(K(m), Π(n, m))` sharing the R_F evaluation.
///
/// Returns +∞ for Π when n = 1 (and for both when m = 1), NaN outside the
/// real domain m <= 1, n <= 1.
pub fn ellipk_and_pi(m: f64, n: f64) -> (f64, f64) {
    let k = ellipk(m);
    if !k.is_finite() || !n.is_finite() || n > 1.0 {
        let pi = if n.is_finite() && n <= 1.0 { k } else { f64::NAN };
        return (k, pi);
    }
    if n == 1.0 {
        return (k, f64::INFINITY);
    }
    if n == 0.0 {
        return (k, k);
    }
    let pi = k + n / 3.0 * carlson_rj(0.0, 1.0 - m, 1.0, 1.0 - n);
    (k, pi)
}
