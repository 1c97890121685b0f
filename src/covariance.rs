//! Covariance & sensitivities (CS): post-fit covariance and the implicit-
//! function-theorem sensitivity matrices `dx/dθ₀`, `dx/dn_obs`, `dx/dβ₀`
//! (`spec.md` §4.4). Computed once after convergence and reused by
//! [`crate::impacts`] and [`crate::observable`].

use ndarray::{Array1, Array2, ArrayView1};
use ndarray_linalg::{Cholesky, Inverse, UPLO};

use crate::error::{FitError, Result};
use crate::expectation::Expectation;
use crate::workspace::Workspace;

/// Diagonal prefit covariance: `0` for the POI block, `1/w_i` for
/// constrained nuisances, `unconstrained_placeholder` otherwise
/// (`spec.md` §4.4).
pub fn prefit_diag(workspace: &Workspace, unconstrained_placeholder: f64) -> Array1<f64> {
    let npoi = workspace.npoi();
    let nsyst = workspace.nsyst();
    let mut diag = Array1::zeros(npoi + nsyst);
    for (n, nuisance) in workspace.nuisances().iter().enumerate() {
        diag[npoi + n] = if nuisance.is_unconstrained() {
            unconstrained_placeholder
        } else {
            1.0 / nuisance.constraint_weight
        };
    }
    diag
}

/// Inverts the Hessian into the post-fit covariance `Σ = H⁻¹`, first
/// certifying positive-definiteness via a Cholesky factorization
/// (`spec.md` §4.3/§7).
pub fn invert(hessian: &Array2<f64>) -> Result<Array2<f64>> {
    hessian.cholesky(UPLO::Lower).map_err(|_| {
        FitError::NotPositiveDefinite("Hessian is not positive definite".into())
    })?;
    hessian
        .inv()
        .map_err(|_| FitError::NotPositiveDefinite("Hessian inversion failed".into()))
}

/// Sensitivity matrices `dx/dsource`, each `[nparm, n_source]`.
pub struct Sensitivities {
    /// `dx/dθ₀`, `[nparm, nsyst]`.
    pub dx_dtheta0: Array2<f64>,
    /// `dx/dn_obs`, `[nparm, nbins]`.
    pub dx_dnobs: Array2<f64>,
    /// `dx/dβ₀`, `[nparm, nbins]`, zero when BBB is disabled.
    pub dx_dbeta0: Array2<f64>,
}

/// Second mixed partial derivatives of the total NLL that the sensitivity
/// identities need, assembled from closed-form per-term derivatives
/// (`spec.md` §4.4).
struct MixedPartials {
    /// `∂²L/∂x∂θ₀`, `[nparm, nsyst]`: nonzero only on the constraint
    /// term's theta-theta diagonal.
    d2l_dx_dtheta0: Array2<f64>,
    /// `∂²L/∂x∂n_obs`, `[nparm, nbins]`.
    d2l_dx_dnobs: Array2<f64>,
    /// `∂²L/∂x∂β₀`, `[nparm, nbins]`.
    d2l_dx_dbeta0: Array2<f64>,
}

fn mixed_partials(
    workspace: &Workspace,
    expectation: &Expectation,
    beta0: ArrayView1<f64>,
) -> MixedPartials {
    let options = workspace.options();
    let npoi = workspace.npoi();
    let nsyst = workspace.nsyst();
    let nbins = workspace.nbins();
    let nparm = npoi + nsyst;
    let mask = workspace.likelihood_mask();
    let n_obs = workspace.data_obs().view();
    let n_exp = expectation.n_exp.view();

    let mut d2l_dx_dtheta0 = Array2::zeros((nparm, nsyst));
    for (n, nuisance) in workspace.nuisances().iter().enumerate() {
        d2l_dx_dtheta0[[npoi + n, n]] = -nuisance.constraint_weight;
    }

    let mut d2l_dx_dnobs = Array2::zeros((nparm, nbins));
    if options.chisq_fit {
        if options.external_covariance {
            let cinv = workspace.data_cov_inv().expect("validated at construction");
            // d(gradient)/d(n_obs) = -J^T * C^-1 (bin-bin coupled).
            let jt_cinv = expectation.jacobian.t().dot(cinv);
            d2l_dx_dnobs -= &jt_cinv;
        } else {
            for b in 0..nbins {
                if !mask[b] {
                    continue;
                }
                let weight = -n_exp[b] / (n_obs[b] * n_obs[b]);
                for i in 0..nparm {
                    d2l_dx_dnobs[[i, b]] += expectation.jacobian[[b, i]] * weight;
                }
            }
        }
    } else {
        for b in 0..nbins {
            if !mask[b] {
                continue;
            }
            let weight = -1.0 / n_exp[b];
            for i in 0..nparm {
                d2l_dx_dnobs[[i, b]] += expectation.jacobian[[b, i]] * weight;
            }
        }
    }

    let mut d2l_dx_dbeta0 = Array2::zeros((nparm, nbins));
    if options.bin_by_bin_stat {
        let kstat = workspace.kstat().expect("validated at construction");
        for b in 0..nbins {
            if !mask[b] {
                continue;
            }
            // Profile beta is independent of beta0; the only beta0
            // dependence in dL/dx runs through the BBB gradient weight
            // g_beta = kstat * (1/beta0 - 1/beta), whose beta0-derivative
            // is -kstat/beta0^2.
            let weight = -kstat[b] / (beta0[b] * beta0[b]);
            for i in 0..nparm {
                d2l_dx_dbeta0[[i, b]] += expectation.beta_jacobian[[b, i]] * weight;
            }
        }
    }

    MixedPartials {
        d2l_dx_dtheta0,
        d2l_dx_dnobs,
        d2l_dx_dbeta0,
    }
}

/// `dx/dsource = -Σ · ∂²L/∂x∂source` for each source.
pub fn sensitivities(
    workspace: &Workspace,
    expectation: &Expectation,
    sigma: &Array2<f64>,
    beta0: ArrayView1<f64>,
) -> Sensitivities {
    let mixed = mixed_partials(workspace, expectation, beta0);
    Sensitivities {
        dx_dtheta0: -sigma.dot(&mixed.d2l_dx_dtheta0),
        dx_dnobs: -sigma.dot(&mixed.d2l_dx_dnobs),
        dx_dbeta0: -sigma.dot(&mixed.d2l_dx_dbeta0),
    }
}

/// Sub-covariance restricted to the leading `n` parameters (POIs and
/// unconstrained nuisances, for the data-stat impact of `spec.md` §4.5),
/// by inverting the corresponding leading Hessian block directly rather
/// than slicing the full inverse (the two differ whenever off-block
/// couplings exist).
pub fn leading_block_inverse(hessian: &Array2<f64>, n: usize) -> Result<Array2<f64>> {
    let block = hessian.slice(ndarray::s![..n, ..n]).to_owned();
    invert(&block)
}

/// Diagonal of a matrix, as an owned vector.
pub fn diag(m: &Array2<f64>) -> Array1<f64> {
    m.diag().to_owned()
}

/// `√diag(m)`, clamping negatives to zero (`spec.md` §4.5 "`max(0, ·)`
/// absorbs numerical negatives").
pub fn sqrt_diag_nonneg(m: &Array2<f64>) -> Array1<f64> {
    diag(m).mapv(|v| v.max(0.0).sqrt())
}

/// Number of rows/parameters a vector/matrix is indexed over before the
/// nuisance block starts, i.e. `npoi`. Exposed since several downstream
/// formulas slice parameter space at this boundary.
pub fn poi_block_len(workspace: &Workspace) -> usize {
    workspace.npoi()
}
