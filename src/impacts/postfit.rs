//! Post-fit-covariance impacts: how much of each POI/NOI's variance is
//! attributable to a nuisance, a nuisance group, data statistics, or (when
//! BBB is active) the per-bin MC statistical uncertainty (`spec.md` §4.5).

use ndarray::{Array1, Array2, Axis};

use crate::covariance;
use crate::error::Result;
use crate::workspace::Groups;

/// `I_ij = Σ_ij / √Σ_jj`, for `i` ranging over `report_rows` (POIs and
/// NOIs, see [`crate::impacts::report_row_indices`]) and `j` over every
/// nuisance.
pub fn per_nuisance(sigma: &Array2<f64>, report_rows: &[usize], npoi: usize) -> Array2<f64> {
    let nparm = sigma.nrows();
    let nsyst = nparm - npoi;
    let mut impacts = Array2::zeros((report_rows.len(), nsyst));
    for j in 0..nsyst {
        let sigma_jj = sigma[[npoi + j, npoi + j]];
        let denom = sigma_jj.sqrt();
        if denom == 0.0 {
            continue;
        }
        for (i, &row) in report_rows.iter().enumerate() {
            impacts[[i, j]] = sigma[[row, npoi + j]] / denom;
        }
    }
    impacts
}

/// `I_iG = √(v_Gᵀ · Σ_GG⁻¹ · v_G)` for every group and every reported
/// parameter row in `report_rows`, where `v_G` is that row of `Σ`
/// restricted to the group's nuisance columns.
pub fn grouped(
    sigma: &Array2<f64>,
    groups: &Groups,
    report_rows: &[usize],
    npoi: usize,
) -> Result<Array2<f64>> {
    let mut impacts = Array2::zeros((report_rows.len(), groups.len()));
    for (g, (_, members)) in groups.iter().enumerate() {
        if members.is_empty() {
            continue;
        }
        let idx: Vec<usize> = members.iter().map(|&m| npoi + m).collect();
        let sigma_gg = sigma.select(Axis(0), &idx).select(Axis(1), &idx);
        let sigma_gg_inv = covariance::invert(&sigma_gg)?;
        for (i, &row) in report_rows.iter().enumerate() {
            let v_g = Array1::from_iter(idx.iter().map(|&j| sigma[[row, j]]));
            let quad = v_g.dot(&sigma_gg_inv.dot(&v_g));
            impacts[[i, g]] = quad.max(0.0).sqrt();
        }
    }
    Ok(impacts)
}

/// Data-stat and (optionally) BBB-stat impacts, computed from the leading
/// `n_stat = npoi + n_unconstrained` block of the full Hessian and, for
/// the BBB-stat split, from the same block of a Hessian recomputed with
/// the BBB gradient stopped.
pub struct StatImpacts {
    /// `√diag(Σ_stat)` when BBB is disabled (the combined statistical
    /// impact); `√diag(H̃⁻¹_stat)` when BBB is active (the data-only
    /// split, with the BBB contribution carried separately in
    /// `bbb_stat`).
    pub data_stat: Array1<f64>,
    /// `√max(0, diag(Σ_stat) − diag(H̃⁻¹_stat))`, `None` when BBB is
    /// disabled.
    pub bbb_stat: Option<Array1<f64>>,
}

/// `n_stat = npoi + n_unconstrained` leading rows/columns of `hessian`.
/// `hessian_bbb_frozen` is the same Hessian recomputed with the BBB
/// gradient stopped (`H̃`); pass `None` when BBB is disabled.
pub fn stat_impacts(
    hessian: &Array2<f64>,
    hessian_bbb_frozen: Option<&Array2<f64>>,
    n_stat: usize,
) -> Result<StatImpacts> {
    let sigma_stat = covariance::leading_block_inverse(hessian, n_stat)?;
    let sigma_stat_diag = covariance::diag(&sigma_stat);

    let Some(h_tilde) = hessian_bbb_frozen else {
        return Ok(StatImpacts {
            data_stat: sigma_stat_diag.mapv(|v| v.max(0.0).sqrt()),
            bbb_stat: None,
        });
    };

    let sigma_tilde = covariance::leading_block_inverse(h_tilde, n_stat)?;
    let sigma_tilde_diag = covariance::diag(&sigma_tilde);
    Ok(StatImpacts {
        data_stat: sigma_tilde_diag.mapv(|v| v.max(0.0).sqrt()),
        bbb_stat: Some((&sigma_stat_diag - &sigma_tilde_diag).mapv(|v| v.max(0.0).sqrt())),
    })
}
