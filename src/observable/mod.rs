//! Observable propagation (OP): value, variance, covariance and
//! variations of an arbitrary derived observable `f(x, θ₀, n_obs, β₀)`
//! (e.g. expected yields, a projected sub-histogram, a residual),
//! (`spec.md` §4.6).
//!
//! Callers supply `f`'s own Jacobians with respect to the four sources
//! (explicit partials, zero where `f` has no direct dependence); this
//! module composes them with the fit's post-fit covariance and
//! sensitivity matrices the way
//! `original_source/combinetf2/fitter.py`'s `_expvar`/`_expvar_profiled`
//! do.

use ndarray::{Array1, Array2, Array3, ArrayView1, Axis};

use crate::covariance::Sensitivities;
use crate::error::Result;

/// Explicit partial derivatives of an observable `f`, before accounting
/// for the implicit dependence of `x` on `θ₀`/`n_obs`/`β₀` at the
/// profiled minimum. `df_dtheta0`/`df_dnobs`/`df_dbeta0` are typically
/// all-zero unless `f` reads those inputs directly (e.g. a residual
/// `f = n_exp - n_obs` has `df_dnobs = -I`).
pub struct ObservableJacobians {
    /// `∂f/∂x`, `[nout, nparm]`.
    pub df_dx: Array2<f64>,
    /// `∂f/∂θ₀`, `[nout, nsyst]`.
    pub df_dtheta0: Array2<f64>,
    /// `∂f/∂n_obs`, `[nout, nbins]`.
    pub df_dnobs: Array2<f64>,
    /// `∂f/∂β₀`, `[nout, nbins]`; all-zero when BBB is disabled.
    pub df_dbeta0: Array2<f64>,
}

/// Non-profile covariance: treats `θ₀`, `n_obs`, `β₀` as independent
/// sources of variance that propagate only through `x` (not through any
/// explicit dependence of `f` on them), via the full post-fit covariance
/// `Σ`.
///
/// `Var(f) = J_x Σ J_xᵀ + J_{n_obs} diag(n_obs) J_{n_obs}ᵀ + J_{β₀} diag(1/kstat) J_{β₀}ᵀ`.
pub fn non_profile_covariance(
    jac: &ObservableJacobians,
    sigma: &Array2<f64>,
    n_obs: ArrayView1<f64>,
    kstat: Option<ArrayView1<f64>>,
) -> Array2<f64> {
    let mut cov = jac.df_dx.dot(&sigma.dot(&jac.df_dx.t()));

    let weighted_nobs = &jac.df_dnobs * &n_obs.insert_axis(Axis(0));
    cov += &jac.df_dnobs.dot(&weighted_nobs.t());

    if let Some(kstat) = kstat {
        let inv_kstat = kstat.mapv(|k| 1.0 / k);
        let weighted_beta0 = &jac.df_dbeta0 * &inv_kstat.insert_axis(Axis(0));
        cov += &jac.df_dbeta0.dot(&weighted_beta0.t());
    }
    cov
}

/// Total derivatives of `f` with respect to `θ₀`, `n_obs`, `β₀`,
/// accounting for the implicit dependence of the profiled `x` on each
/// source: `df/dsource = ∂f/∂source + (∂f/∂x)·(dx/dsource)`.
pub struct ProfiledJacobians {
    /// `[nout, nsyst]`.
    pub df_dtheta0: Array2<f64>,
    /// `[nout, nbins]`.
    pub df_dnobs: Array2<f64>,
    /// `[nout, nbins]`.
    pub df_dbeta0: Array2<f64>,
}

/// Composes `jac` with the sensitivity matrices to get the total,
/// profile-aware derivatives.
pub fn profile_jacobians(jac: &ObservableJacobians, sensitivities: &Sensitivities) -> ProfiledJacobians {
    ProfiledJacobians {
        df_dtheta0: &jac.df_dtheta0 + &jac.df_dx.dot(&sensitivities.dx_dtheta0),
        df_dnobs: &jac.df_dnobs + &jac.df_dx.dot(&sensitivities.dx_dnobs),
        df_dbeta0: &jac.df_dbeta0 + &jac.df_dx.dot(&sensitivities.dx_dbeta0),
    }
}

/// Diagonal profile variance: `Var(f)_i = Σ_source var(source_j) · (df/dsource)_ij²`,
/// summed over every nuisance `j` (using its prior variance `1/w_j`, zero
/// for unconstrained nuisances), every bin's `n_obs` (data-stat source),
/// and — when BBB is active — every bin's `1/kstat` (BBB-stat source).
pub fn profile_variance_diag(
    profiled: &ProfiledJacobians,
    theta0_weight: ArrayView1<f64>,
    n_obs: ArrayView1<f64>,
    kstat: Option<ArrayView1<f64>>,
) -> Array1<f64> {
    let nout = profiled.df_dtheta0.nrows();
    let mut var = Array1::zeros(nout);

    for (j, &w) in theta0_weight.iter().enumerate() {
        if w == 0.0 {
            continue;
        }
        let var_j = 1.0 / w;
        for i in 0..nout {
            var[i] += var_j * profiled.df_dtheta0[[i, j]].powi(2);
        }
    }
    for (b, &n) in n_obs.iter().enumerate() {
        for i in 0..nout {
            var[i] += n * profiled.df_dnobs[[i, b]].powi(2);
        }
    }
    if let Some(kstat) = kstat {
        for (b, &k) in kstat.iter().enumerate() {
            for i in 0..nout {
                var[i] += profiled.df_dbeta0[[i, b]].powi(2) / k;
            }
        }
    }
    var
}

/// Per-parameter up/down variations of `f`, `[nout, nparm, 2]` indexed
/// `{down=0, up=1}` along the last axis.
///
/// `δ_j` is either the `j`-th column of `Σ·diag(Σ)^{-1/2}` (`correlated =
/// true`, accounting for the parameter's correlation with the rest of the
/// fit) or `√Σ_jj · e_j` (`correlated = false`).
pub fn variations(
    expected: ArrayView1<f64>,
    jac: &ObservableJacobians,
    sigma: &Array2<f64>,
    correlated: bool,
) -> Array3<f64> {
    let nout = jac.df_dx.nrows();
    let nparm = jac.df_dx.ncols();
    let sigma_diag_sqrt = sigma.diag().mapv(f64::sqrt);

    let delta = if correlated {
        // Column j of Σ scaled by 1/sqrt(Σ_jj).
        sigma / &sigma_diag_sqrt.clone().insert_axis(Axis(0))
    } else {
        Array2::from_diag(&sigma_diag_sqrt)
    };
    let d_expected = jac.df_dx.dot(&delta);

    let mut out = Array3::zeros((nout, nparm, 2));
    for i in 0..nout {
        for j in 0..nparm {
            out[[i, j, 0]] = expected[i] - d_expected[[i, j]];
            out[[i, j, 1]] = expected[i] + d_expected[[i, j]];
        }
    }
    out
}

/// `χ² = rᵀ C_r⁻¹ r` for a derived observable's residual `r = f − n_obs`,
/// via a direct linear solve rather than an explicit inverse.
pub fn chi_square(residual: ArrayView1<f64>, cov_r: &Array2<f64>) -> Result<f64> {
    use ndarray_linalg::Solve;

    let y = cov_r
        .solve(&residual.to_owned())
        .map_err(|_| crate::error::FitError::NotPositiveDefinite("residual covariance is singular".into()))?;
    Ok(residual.dot(&y))
}

/// `ndf = |f| − (1 if normalize else 0)`.
pub fn ndf(n_out: usize, normalize: bool) -> i64 {
    n_out as i64 - i64::from(normalize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn uncorrelated_variation_matches_sqrt_diag() {
        let jac = ObservableJacobians {
            df_dx: array![[1.0, 0.0], [0.0, 2.0]],
            df_dtheta0: Array2::zeros((2, 0)),
            df_dnobs: Array2::zeros((2, 0)),
            df_dbeta0: Array2::zeros((2, 0)),
        };
        let sigma = array![[4.0, 0.0], [0.0, 9.0]];
        let expected = array![10.0, 20.0];
        let v = variations(expected.view(), &jac, &sigma, false);
        assert_relative_eq!(v[[0, 0, 1]], 12.0, max_relative = 1e-12);
        assert_relative_eq!(v[[1, 1, 1]], 26.0, max_relative = 1e-12);
    }
}
