//! Chi-square negative log-likelihood for the data term, with either a
//! data-derived diagonal covariance or an externally supplied inverse
//! covariance matrix (`spec.md` §4.2).

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::expectation::Curvature;

/// Source of the inverse data covariance.
pub enum Covariance<'a> {
    /// `C = diag(n_obs)`, i.e. `C^-1 = diag(1 / n_obs)`.
    DataDerived,
    /// Externally supplied dense `C^-1`, BBB is forbidden in this mode
    /// (`spec.md` §3 invariant, enforced at [`crate::workspace::Workspace`]
    /// construction).
    External(ArrayView2<'a, f64>),
}

fn residual(n_obs: ArrayView1<f64>, n_exp: ArrayView1<f64>, mask: &[bool]) -> Array1<f64> {
    let nbins = n_exp.len();
    Array1::from_shape_fn(nbins, |b| if mask[b] { n_obs[b] - n_exp[b] } else { 0.0 })
}

/// `½ r^T C^-1 r`, restricted to non-masked bins (masked rows/columns of
/// `r` are zeroed by [`residual`], so they do not contribute regardless of
/// off-diagonal entries in an external covariance).
pub fn value(n_obs: ArrayView1<f64>, n_exp: ArrayView1<f64>, cov: &Covariance, mask: &[bool]) -> f64 {
    let r = residual(n_obs, n_exp, mask);
    match cov {
        Covariance::DataDerived => 0.5
            * r.iter()
                .zip(n_obs.iter())
                .zip(mask.iter())
                .filter(|(_, &m)| m)
                .map(|((&ri, &o), _)| ri * ri / o)
                .sum::<f64>(),
        Covariance::External(cinv) => 0.5 * r.dot(&cinv.dot(&r)),
    }
}

/// `d(NLL)/d(n_exp) = -C^-1 r`.
pub fn gradient(
    n_obs: ArrayView1<f64>,
    n_exp: ArrayView1<f64>,
    cov: &Covariance,
    mask: &[bool],
) -> Array1<f64> {
    let r = residual(n_obs, n_exp, mask);
    match cov {
        Covariance::DataDerived => {
            let nbins = n_exp.len();
            Array1::from_shape_fn(nbins, |b| if mask[b] { -r[b] / n_obs[b] } else { 0.0 })
        }
        Covariance::External(cinv) => -cinv.dot(&r),
    }
}

/// Second-derivative weight with respect to `n_exp`, in the form
/// [`crate::expectation::Expectation::hessian_contribution`] expects:
/// diagonal for the data-derived case, dense for an external covariance.
pub fn curvature(n_obs: ArrayView1<f64>, cov: &Covariance, mask: &[bool]) -> CurvatureOwned {
    match cov {
        Covariance::DataDerived => {
            let nbins = n_obs.len();
            CurvatureOwned::Diagonal(Array1::from_shape_fn(nbins, |b| {
                if mask[b] {
                    1.0 / n_obs[b]
                } else {
                    0.0
                }
            }))
        }
        Covariance::External(cinv) => CurvatureOwned::Dense(cinv.to_owned()),
    }
}

/// Owned curvature weight, convertible to a [`Curvature`] view for
/// [`crate::expectation::Expectation::hessian_contribution`].
pub enum CurvatureOwned {
    /// Diagonal weight.
    Diagonal(Array1<f64>),
    /// Dense weight (a materialized copy of the external inverse covariance).
    Dense(Array2<f64>),
}

impl CurvatureOwned {
    /// Borrows this owned weight as a [`Curvature`] view.
    pub fn view(&self) -> Curvature<'_> {
        match self {
            CurvatureOwned::Diagonal(d) => Curvature::Diagonal(d.view()),
            CurvatureOwned::Dense(d) => Curvature::Dense(d.view()),
        }
    }
}
