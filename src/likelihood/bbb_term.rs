//! Barlow-Beeston penalty term: a gamma-like prior on the per-bin
//! multiplier `beta`, parameterized by the effective MC count `kstat` and
//! centered at the reference value `beta0` (`spec.md` §4.2, §6 GLOSSARY
//! "BBB"). `beta0` defaults to all-ones; nonzero only when propagating its
//! own uncertainty (`spec.md` §4.4 "dx/dbeta0").

use ndarray::{Array1, ArrayView1};

/// `-kstat * log(beta / beta0) + kstat * beta / beta0 - kstat`, zero at
/// `beta == beta0` by construction.
fn term(kstat: f64, beta: f64, beta0: f64) -> f64 {
    -kstat * (beta / beta0).ln() + kstat * beta / beta0 - kstat
}

/// `sum_b term(kstat_b, beta_b, beta0_b)` over non-masked bins.
pub fn value(
    kstat: ArrayView1<f64>,
    beta: ArrayView1<f64>,
    beta0: ArrayView1<f64>,
    mask: &[bool],
) -> f64 {
    kstat
        .iter()
        .zip(beta.iter())
        .zip(beta0.iter())
        .zip(mask.iter())
        .filter(|(_, &m)| m)
        .map(|(((&k, &b), &b0), _)| term(k, b, b0))
        .sum()
}

/// `d(term)/d(beta_b) = kstat_b * (1/beta0_b - 1/beta_b)`, zeroed at
/// masked bins.
pub fn gradient(
    kstat: ArrayView1<f64>,
    beta: ArrayView1<f64>,
    beta0: ArrayView1<f64>,
    mask: &[bool],
) -> Array1<f64> {
    let nbins = beta.len();
    Array1::from_shape_fn(nbins, |b| {
        if mask[b] {
            kstat[b] * (1.0 / beta0[b] - 1.0 / beta[b])
        } else {
            0.0
        }
    })
}

/// `d^2(term)/d(beta_b)^2 = kstat_b / beta_b^2`, zeroed at masked bins.
pub fn curvature(kstat: ArrayView1<f64>, beta: ArrayView1<f64>, mask: &[bool]) -> Array1<f64> {
    let nbins = beta.len();
    Array1::from_shape_fn(nbins, |b| {
        if mask[b] {
            kstat[b] / (beta[b] * beta[b])
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
    fn zero_at_beta_equals_beta0() {
        let kstat = Array1::from(vec![12.0, 30.0]);
        let beta = Array1::from(vec![1.0, 1.0]);
        let beta0 = Array1::from(vec![1.0, 1.0]);
        let mask = [true, true];
        assert_relative_eq!(
            value(kstat.view(), beta.view(), beta0.view(), &mask),
            0.0,
            max_relative = 1e-12
        );
        let g = gradient(kstat.view(), beta.view(), beta0.view(), &mask);
        for &gi in g.iter() {
            assert_relative_eq!(gi, 0.0, max_relative = 1e-12);
        }
    }
}
