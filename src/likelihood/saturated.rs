//! Saturated NLL: the likelihood of the model that perfectly reproduces
//! `n_obs`, used as the reference point for a goodness-of-fit chi-square
//! (`spec.md` §4.2, §6 GLOSSARY).

use ndarray::ArrayView1;

use crate::workspace::Workspace;

/// `L_sat = Σ_b [-n_obs_b * log(n_obs_b) + n_obs_b]`, safe-log at zero,
/// over non-masked bins.
pub fn value(n_obs: ArrayView1<f64>, mask: &[bool]) -> f64 {
    n_obs
        .iter()
        .zip(mask.iter())
        .filter(|(_, &m)| m)
        .map(|(&o, _)| if o <= 0.0 { 0.0 } else { -o * o.ln() + o })
        .sum()
}

/// `ndof_sat = n_likelihood_bins - npoi - n_unconstrained - (1 if normalize)`
/// (`spec.md` §4.2).
pub fn ndof(workspace: &Workspace) -> i64 {
    let nbins = workspace.n_likelihood_bins() as i64;
    let npoi = workspace.npoi() as i64;
    let n_unconstrained = workspace.n_unconstrained() as i64;
    let normalize_penalty = i64::from(workspace.options().normalize);
    nbins - npoi - n_unconstrained - normalize_penalty
}
