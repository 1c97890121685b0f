//! Barlow-Beeston per-bin statistical nuisance (`spec.md` §4.1 step 5,
//! §6 "canonical" closed form, §9 "Cyclic dependency between beta and
//! n_exp").

use ndarray::{Array1, ArrayView1};

/// Result of the BBB stage: the multiplier `beta` applied to the central
/// expectation, plus the first/second derivative of `beta * u` with
/// respect to the central expectation `u`, needed to compose the
/// expectation Jacobian/Hessian through this stage.
pub struct BbbStage {
    /// Per-bin multiplier.
    pub beta: Array1<f64>,
    /// `m1[b] = d(beta_b * u_b) / d(u_b)`.
    pub m1: Array1<f64>,
    /// `m2[b] = d^2(beta_b * u_b) / d(u_b)^2`.
    pub m2: Array1<f64>,
    /// `d(beta_b) / d(u_b)`, needed by the likelihood engine to chain the
    /// BBB penalty term's derivative through to `x`.
    pub dbeta_du: Array1<f64>,
    /// `d^2(beta_b) / d(u_b)^2`.
    pub d2beta_du2: Array1<f64>,
}

/// Profiles `beta` analytically: `beta = (n_obs + kstat) / (u + kstat)`,
/// the closed-form minimum of the BBB sub-problem for a Poisson
/// likelihood with a gamma prior. When `stop_gradient` is set, `beta` is
/// still evaluated at its profiled value but treated as a constant for
/// differentiation purposes (`m1 = beta`, `m2 = 0`), matching the
/// gradient-stopping switch `spec.md` §9 requires for the no-BBB Hessian
/// used by impact decomposition.
pub fn profile(
    n_obs: ArrayView1<f64>,
    kstat: ArrayView1<f64>,
    u: ArrayView1<f64>,
    stop_gradient: bool,
) -> BbbStage {
    let nbins = u.len();
    let mut beta = Array1::zeros(nbins);
    let mut m1 = Array1::zeros(nbins);
    let mut m2 = Array1::zeros(nbins);
    let mut dbeta_du = Array1::zeros(nbins);
    let mut d2beta_du2 = Array1::zeros(nbins);
    for b in 0..nbins {
        let denom = u[b] + kstat[b];
        let num = n_obs[b] + kstat[b];
        let beta_b = num / denom;
        beta[b] = beta_b;
        if stop_gradient {
            m1[b] = beta_b;
            m2[b] = 0.0;
        } else {
            let f1 = -num / (denom * denom);
            let f2 = 2.0 * num / (denom * denom * denom);
            m1[b] = f1 * u[b] + beta_b;
            m2[b] = f2 * u[b] + 2.0 * f1;
            dbeta_du[b] = f1;
            d2beta_du2[b] = f2;
        }
    }
    BbbStage { beta, m1, m2, dbeta_du, d2beta_du2 }
}

/// Non-profile mode: `beta` is frozen at `beta0`, independent of `x`.
pub fn frozen(beta0: ArrayView1<f64>) -> BbbStage {
    let nbins = beta0.len();
    BbbStage {
        beta: beta0.to_owned(),
        m1: beta0.to_owned(),
        m2: Array1::zeros(nbins),
        dbeta_du: Array1::zeros(nbins),
        d2beta_du2: Array1::zeros(nbins),
    }
}
