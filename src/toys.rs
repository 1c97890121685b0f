//! Toy generator (TG): Bayesian / frequentist / bootstrap randomization
//! of the fitter's mutable state ahead of a re-fit (`spec.md` §4.7).
//!
//! Grounded on `original_source/combinetf2/fitter.py`'s
//! `bayesassign`/`frequentistassign`/`toyassign`: random draws use
//! `rand_distr`'s `Normal`, `Gamma` and `Poisson`, taking the RNG
//! generically the way `src/sampler/forward.rs`'s sampler does, so
//! callers can plug in any `rand::Rng` (including a seeded
//! `rand_xoshiro` generator for reproducible toys).

use ndarray::{Array1, ArrayView1};
use rand::Rng;
use rand_distr::{Distribution, Gamma, Normal, Poisson};

use crate::error::{FitError, Result};

/// Draws `x` (the full parameter vector) from a standard normal, for
/// Bayesian-mode toys. Only valid with no explicit POIs (`spec.md` §4.7
/// "valid only when no explicit POIs exist").
pub fn bayesian_x<R: Rng>(rng: &mut R, npoi: usize, nparm: usize) -> Result<Array1<f64>> {
    if npoi > 0 {
        return Err(FitError::Unsupported(
            "Bayesian toys are not supported in the presence of explicit POIs".into(),
        ));
    }
    let normal = Normal::new(0.0, 1.0).expect("fixed valid parameters");
    Ok(Array1::from_shape_fn(nparm, |_| normal.sample(rng)))
}

/// Draws a new Gaussian-constraint center `θ₀` from a standard normal,
/// for frequentist-mode toys.
pub fn frequentist_theta0<R: Rng>(rng: &mut R, nsyst: usize) -> Array1<f64> {
    let normal = Normal::new(0.0, 1.0).expect("fixed valid parameters");
    Array1::from_shape_fn(nsyst, |_| normal.sample(rng))
}

/// Draws a new BBB reference `β₀` per bin from `Gamma(shape = kstat + 1,
/// rate = kstat)`, so `E[β₀] = (kstat+1)/kstat ≈ 1` and `Var(β₀) ≈
/// 1/kstat`.
pub fn bbb_beta0<R: Rng>(rng: &mut R, kstat: ArrayView1<f64>) -> Array1<f64> {
    kstat.mapv(|k| {
        // `rand_distr::Gamma` is parameterized by (shape, scale); rate =
        // 1/scale.
        let gamma = Gamma::new(k + 1.0, 1.0 / k).expect("kstat validated strictly positive");
        gamma.sample(rng)
    })
}

/// Replaces `n_obs` with Poisson draws from `source` (either the original
/// observed data, for a bootstrap toy, or the current expected yields,
/// for a standard toy).
pub fn poisson_data<R: Rng>(rng: &mut R, source: ArrayView1<f64>) -> Result<Array1<f64>> {
    let mut out = Array1::zeros(source.len());
    for (b, &lam) in source.iter().enumerate() {
        let poisson = Poisson::new(lam.max(0.0)).map_err(|_| {
            FitError::InvalidData(format!("invalid Poisson mean {lam} at bin {b}"))
        })?;
        out[b] = poisson.sample(rng);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn bayesian_x_rejects_explicit_poi() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        assert!(bayesian_x(&mut rng, 1, 5).is_err());
    }

    #[test]
    fn bbb_beta0_is_finite_and_positive() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let kstat = Array1::from(vec![10.0, 100.0, 1000.0]);
        let beta0 = bbb_beta0(&mut rng, kstat.view());
        for &b in beta0.iter() {
            assert!(b.is_finite());
            assert!(b > 0.0);
        }
    }
}
