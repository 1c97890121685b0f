//! Degree-5 asymmetric log-normal interpolation (`spec.md` §4.1 step 2,
//! §9 "Asymmetric interpolation").
//!
//! `alpha(theta)` selects between the two halves of an asymmetric
//! log-normal response, smoothly interpolating in the `+-1 sigma` band.
//! The underlying polynomial is built in `t = 2 * theta`, so it saturates
//! (and its derivative vanishes) once `|theta| >= 0.5`, i.e. `|t| >= 1`.
//! It is exactly `+-1` for `|theta| >= 0.5`, continuous in its first
//! derivative at `theta = +-0.5`, and monotone on `[-0.5, 0.5]`.
//! Coefficients must match bit-for-bit across implementations
//! (`spec.md` §6).

use ndarray::{Array1, ArrayView1};

/// `alpha(theta) = clip((1/8) * t * (t^2 * (3 * t^2 - 10) + 15), -1, 1)`
/// with `t = 2 * theta`.
#[inline]
pub fn alpha(theta: f64) -> f64 {
    let t = 2.0 * theta;
    let t2 = t * t;
    let poly = 0.125 * t * (t2 * (3.0 * t2 - 10.0) + 15.0);
    poly.clamp(-1.0, 1.0)
}

/// `d(alpha)/d(theta)`, zero outside `[-0.5, 0.5]` where `alpha` is
/// clipped (the polynomial saturates at `|t| = |2 * theta| = 1`).
#[inline]
pub fn dalpha(theta: f64) -> f64 {
    if theta.abs() >= 0.5 {
        return 0.0;
    }
    let t = 2.0 * theta;
    let t2 = t * t;
    // d(poly)/dt = (1/8) * (15 * t^4 - 30 * t^2 + 15), d(t)/d(theta) = 2.
    let dpoly_dt = 0.125 * (15.0 * t2 * t2 - 30.0 * t2 + 15.0);
    dpoly_dt * 2.0
}

/// `d^2(alpha)/d(theta)^2`, zero outside `[-0.5, 0.5]`.
#[inline]
pub fn d2alpha(theta: f64) -> f64 {
    if theta.abs() >= 0.5 {
        return 0.0;
    }
    let t = 2.0 * theta;
    // d^2(poly)/dt^2 = (1/8) * (60 * t^3 - 60 * t).
    let d2poly_dt2 = 0.125 * (60.0 * t.powi(3) - 60.0 * t);
    d2poly_dt2 * 4.0
}

/// `w1(theta) = alpha(theta) + theta * alpha'(theta)`: the factor
/// multiplying the `up`-half response in `d(log_s)/d(theta)` (product
/// rule on `theta * alpha(theta)`).
pub fn w1(theta: ArrayView1<f64>) -> Array1<f64> {
    theta.mapv(|t| alpha(t) + t * dalpha(t))
}

/// `w2(theta) = 2 * alpha'(theta) + theta * alpha''(theta)`: the factor
/// multiplying the `up`-half response in `d^2(log_s)/d(theta)^2`.
pub fn w2(theta: ArrayView1<f64>) -> Array1<f64> {
    theta.mapv(|t| 2.0 * dalpha(t) + t * d2alpha(t))
}

/// Stacks `[theta, theta * alpha(theta)]` to length `2 * nsyst`, matching
/// the asymmetric `eta` vector of `spec.md` §4.1 step 2.
pub fn stack_eta(theta: ArrayView1<f64>) -> Array1<f64> {
    let up = theta.mapv(|t| t * alpha(t));
    ndarray::concatenate(ndarray::Axis(0), &[theta, up.view()]).expect("equal lengths")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn boundary_is_sign() {
        for &t in &[1.0, 1.5, 2.0, 10.0] {
            assert_relative_eq!(alpha(t), 1.0, max_relative = 1e-12);
            assert_relative_eq!(alpha(-t), -1.0, max_relative = 1e-12);
        }
    }

    #[test]
    fn zero_at_origin() {
        assert_relative_eq!(alpha(0.0), 0.0, max_relative = 1e-12);
    }

    #[test]
    fn continuous_derivative_at_boundary() {
        // The quintic is built with zero first and second derivative at its
        // own endpoints (t = +-1, i.e. theta = +-0.5), so alpha'(0.5^-) must
        // match the clipped derivative just outside the band, which is 0.
        let eps = 1e-6;
        let inside = (alpha(0.5) - alpha(0.5 - eps)) / eps;
        assert_relative_eq!(inside, 0.0, epsilon = 1e-3);
        assert_relative_eq!(dalpha(0.5 - 1e-9), 0.0, epsilon = 1e-5);
        assert_relative_eq!(dalpha(0.75), 0.0, epsilon = 1e-12);
        assert_relative_eq!(dalpha(1.0 - 1e-9), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn monotone_on_unit_interval() {
        let mut prev = alpha(-1.0);
        for i in 1..=200 {
            let t = -1.0 + 2.0 * i as f64 / 200.0;
            let cur = alpha(t);
            assert!(cur >= prev - 1e-12);
            prev = cur;
        }
    }
}
