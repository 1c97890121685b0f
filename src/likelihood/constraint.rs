//! Gaussian constraint term on the nuisance parameters (`spec.md` §4.2:
//! `NLL_c = ½ Σ_i w_i (θ_i - θ0_i)²`, with `w_i = 0` for unconstrained
//! nuisances contributing neither a penalty nor curvature).

use ndarray::{Array1, ArrayView1};

/// `½ Σ_i w_i (θ_i - θ0_i)²`.
pub fn value(theta: ArrayView1<f64>, theta0: ArrayView1<f64>, weight: ArrayView1<f64>) -> f64 {
    theta
        .iter()
        .zip(theta0.iter())
        .zip(weight.iter())
        .map(|((&t, &t0), &w)| 0.5 * w * (t - t0) * (t - t0))
        .sum()
}

/// `d(NLL_c)/d(theta_i) = w_i * (theta_i - theta0_i)`.
pub fn gradient(theta: ArrayView1<f64>, theta0: ArrayView1<f64>, weight: ArrayView1<f64>) -> Array1<f64> {
    theta
        .iter()
        .zip(theta0.iter())
        .zip(weight.iter())
        .map(|((&t, &t0), &w)| w * (t - t0))
        .collect()
}

/// `d^2(NLL_c)/d(theta_i)^2 = w_i`; off-diagonal entries are exactly zero.
pub fn hessian_diag(weight: ArrayView1<f64>) -> Array1<f64> {
    weight.to_owned()
}
