//! Global (first-order linear-response) impacts: propagates the
//! sensitivity matrices directly, without reference to the post-fit
//! covariance's own off-diagonal structure (`spec.md` §4.5).

use ndarray::{Array1, Array2};

use crate::covariance::Sensitivities;
use crate::workspace::{Groups, Nuisance};

/// `I_ij^global = (dx/dθ₀)_ij · √Var(θ₀_j)`; zero for unconstrained
/// nuisances, which carry no prior variance. `i` ranges over
/// `report_rows` (POIs and NOIs, see
/// [`crate::impacts::report_row_indices`]).
pub fn per_nuisance(
    sensitivities: &Sensitivities,
    nuisances: &[Nuisance],
    report_rows: &[usize],
) -> Array2<f64> {
    let nsyst = nuisances.len();
    let mut impacts = Array2::zeros((report_rows.len(), nsyst));
    for (j, nuisance) in nuisances.iter().enumerate() {
        if nuisance.is_unconstrained() {
            continue;
        }
        let prior_sd = (1.0 / nuisance.constraint_weight).sqrt();
        for (i, &row) in report_rows.iter().enumerate() {
            impacts[[i, j]] = sensitivities.dx_dtheta0[[row, j]] * prior_sd;
        }
    }
    impacts
}

/// `I_iG^global = √Σ_{j∈G} (I_ij^global)²`.
pub fn grouped(per_nuisance_global: &Array2<f64>, groups: &Groups) -> Array2<f64> {
    let n_report = per_nuisance_global.nrows();
    let mut impacts = Array2::zeros((n_report, groups.len()));
    for (g, (_, members)) in groups.iter().enumerate() {
        for i in 0..n_report {
            let sum_sq: f64 = members
                .iter()
                .map(|&j| per_nuisance_global[[i, j]].powi(2))
                .sum();
            impacts[[i, g]] = sum_sq.sqrt();
        }
    }
    impacts
}

/// Data-stat global impact. Poisson mode: `√Σ_b (dx/dn_obs_ib)² · n_obs_b`.
/// External-covariance chi-square mode: diagonal of
/// `(dx/dn_obs) · C · (dx/dn_obs)ᵀ`, where `C = (C⁻¹)⁻¹` is the data
/// covariance (not its inverse — the fit's weight matrix must itself be
/// inverted back before this propagation). `i` ranges over `report_rows`.
pub fn data_stat(
    sensitivities: &Sensitivities,
    report_rows: &[usize],
    n_obs: &Array1<f64>,
    external_cov: Option<&Array2<f64>>,
) -> Array1<f64> {
    match external_cov {
        None => Array1::from_iter(report_rows.iter().map(|&i| {
            let row = sensitivities.dx_dnobs.row(i);
            row.iter()
                .zip(n_obs.iter())
                .map(|(&d, &n)| d * d * n)
                .sum::<f64>()
                .sqrt()
        })),
        Some(cov) => {
            let tmp = sensitivities.dx_dnobs.dot(cov);
            Array1::from_iter(report_rows.iter().map(|&i| {
                let row_d = sensitivities.dx_dnobs.row(i);
                let row_t = tmp.row(i);
                row_d.dot(&row_t).max(0.0).sqrt()
            }))
        }
    }
}

/// BBB global impact. `√Σ_b (dx/dβ₀_ib)² / kstat_b`. `i` ranges over
/// `report_rows`.
pub fn bbb_stat(
    sensitivities: &Sensitivities,
    report_rows: &[usize],
    kstat: &Array1<f64>,
) -> Array1<f64> {
    Array1::from_iter(report_rows.iter().map(|&i| {
        sensitivities
            .dx_dbeta0
            .row(i)
            .iter()
            .zip(kstat.iter())
            .map(|(&d, &k)| d * d / k)
            .sum::<f64>()
            .sqrt()
    }))
}
