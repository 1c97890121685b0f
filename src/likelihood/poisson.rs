//! Poisson negative log-likelihood for the data term (`spec.md` §4.2).

use ndarray::{Array1, ArrayView1};

/// Per-bin `-n_obs_b * log(n_exp_b) + n_exp_b`, with the safe-log
/// convention: a bin with `n_obs_b == 0` contributes `n_exp_b` even if
/// `n_exp_b` underflows to zero or below.
fn term(n_obs: f64, n_exp: f64) -> f64 {
    if n_exp <= 0.0 {
        if n_obs == 0.0 {
            0.0
        } else {
            f64::INFINITY
        }
    } else {
        -n_obs * n_exp.ln() + n_exp
    }
}

/// `sum_b [-n_obs_b * log(n_exp_b) + n_exp_b]` over bins where `mask[b]`.
pub fn value(n_obs: ArrayView1<f64>, n_exp: ArrayView1<f64>, mask: &[bool]) -> f64 {
    n_obs
        .iter()
        .zip(n_exp.iter())
        .zip(mask.iter())
        .filter(|(_, &m)| m)
        .map(|((&o, &e), _)| term(o, e))
        .sum()
}

/// Numerically stabilized value: subtracts the same functional form
/// evaluated at `n_exp_nom` (the expectation at the last
/// re-linearization point). Affects only the returned scalar, not the
/// gradient or Hessian (`spec.md` §4.2).
pub fn value_stabilized(
    n_obs: ArrayView1<f64>,
    n_exp: ArrayView1<f64>,
    n_exp_nom: ArrayView1<f64>,
    mask: &[bool],
) -> f64 {
    value(n_obs, n_exp, mask) - value(n_obs, n_exp_nom, mask)
}

/// `d(NLL)/d(n_exp_b) = 1 - n_obs_b / n_exp_b`, zeroed at masked bins.
pub fn gradient(n_obs: ArrayView1<f64>, n_exp: ArrayView1<f64>, mask: &[bool]) -> Array1<f64> {
    let nbins = n_exp.len();
    Array1::from_shape_fn(nbins, |b| {
        if mask[b] {
            1.0 - n_obs[b] / n_exp[b]
        } else {
            0.0
        }
    })
}

/// `d^2(NLL)/d(n_exp_b)^2 = n_obs_b / n_exp_b^2`, zeroed at masked bins.
pub fn curvature(n_obs: ArrayView1<f64>, n_exp: ArrayView1<f64>, mask: &[bool]) -> Array1<f64> {
    let nbins = n_exp.len();
    Array1::from_shape_fn(nbins, |b| {
        if mask[b] {
            n_obs[b] / (n_exp[b] * n_exp[b])
        } else {
            0.0
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn masked_bin_is_excluded() {
        let n_obs = Array1::from(vec![10.0, 10.0]);
        let n_exp = Array1::from(vec![10.0, 1.0]);
        let mask = [true, false];
        let v = value(n_obs.view(), n_exp.view(), &mask);
        assert_relative_eq!(v, term(10.0, 10.0), max_relative = 1e-12);
        assert_relative_eq!(gradient(n_obs.view(), n_exp.view(), &mask)[1], 0.0);
    }

    #[test]
    fn gradient_vanishes_at_n_obs_equals_n_exp() {
        let n_obs = Array1::from(vec![5.0]);
        let n_exp = Array1::from(vec![5.0]);
        let g = gradient(n_obs.view(), n_exp.view(), &[true]);
        assert_relative_eq!(g[0], 0.0, max_relative = 1e-12);
    }
}
