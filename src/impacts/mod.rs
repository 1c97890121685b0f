//! Impact decompositions (IMP): how much of a POI/NOI's uncertainty comes
//! from each nuisance, each nuisance group, data statistics, and (when
//! BBB is active) per-bin MC statistics — in both the "post-fit
//! covariance" and "global" (first-order linear response) flavors
//! (`spec.md` §4.5).

pub mod global;
pub mod postfit;

use ndarray::{Array1, Array2};

use crate::covariance::{self, Sensitivities};
use crate::error::Result;
use crate::workspace::Workspace;

/// Everything [`report`] needs beyond what is already reachable from the
/// [`Workspace`]: the post-fit Hessian, its inverse, the sensitivity
/// matrices, and (when BBB is active) a second Hessian with the BBB
/// gradient stopped.
pub struct ImpactInputs<'a> {
    /// Post-fit Hessian, `[nparm, nparm]`.
    pub hessian: &'a Array2<f64>,
    /// Post-fit covariance `Σ = H⁻¹`.
    pub sigma: &'a Array2<f64>,
    /// Sensitivity matrices `dx/dθ₀`, `dx/dn_obs`, `dx/dβ₀`.
    pub sensitivities: &'a Sensitivities,
    /// Hessian recomputed with the BBB penalty's gradient stopped;
    /// `None` when BBB is disabled.
    pub hessian_bbb_frozen: Option<&'a Array2<f64>>,
}

/// Parameter-space rows every impact table reports: every POI, followed
/// by the nuisances flagged `noi` (`spec.md` §4.5 "per-POI (and per-NOI)"),
/// gathered the way `original_source/combinetf2/fitter.py` gathers
/// `dxdtheta0[npoi:]` at `noigroupidxs` and concatenates it onto the POI
/// rows.
pub fn report_row_indices(workspace: &Workspace) -> Vec<usize> {
    let npoi = workspace.npoi();
    let mut rows: Vec<usize> = (0..npoi).collect();
    rows.extend(workspace.noi_indices().iter().map(|&n| npoi + n));
    rows
}

/// Impact columns in the ordering guaranteed by `spec.md` §4.5: per-group
/// impacts (workspace group order), then `stat`, then `binByBinStat` (if
/// BBB is active). `global` mirrors the same ordering for the first-order
/// linear-response flavor.
pub struct ImpactReport {
    /// `[n_report, n_group + 1 (+1 if BBB)]` post-fit-covariance impacts,
    /// one column per group, followed by `stat` and optionally
    /// `binByBinStat`.
    pub grouped: Array2<f64>,
    /// Same column ordering as `grouped`, first-order linear-response
    /// flavor.
    pub grouped_global: Array2<f64>,
    /// Ungrouped per-nuisance post-fit-covariance impacts,
    /// `[n_report, nsyst]`.
    pub per_nuisance: Array2<f64>,
    /// Ungrouped per-nuisance global impacts, `[n_report, nsyst]`.
    pub per_nuisance_global: Array2<f64>,
}

/// Assembles the full impact report.
pub fn report(workspace: &Workspace, inputs: &ImpactInputs) -> Result<ImpactReport> {
    let npoi = workspace.npoi();
    let n_stat = npoi + workspace.n_unconstrained();
    let groups = workspace.groups();
    let report_rows = report_row_indices(workspace);

    let per_nuisance = postfit::per_nuisance(inputs.sigma, &report_rows, npoi);
    let per_nuisance_global =
        global::per_nuisance(inputs.sensitivities, workspace.nuisances(), &report_rows);

    let mut grouped = postfit::grouped(inputs.sigma, groups, &report_rows, npoi)?;
    let mut grouped_global = global::grouped(&per_nuisance_global, groups);

    // The data/BBB-stat columns below are computed over the leading
    // `n_stat = npoi + n_unconstrained` block, then appended onto the
    // `report_rows`-indexed columns above. The two only line up when the
    // `noi`-flagged nuisances are exactly the unconstrained ones — the
    // same assumption `original_source/combinetf2/fitter.py` makes (and
    // flags as a known limitation otherwise).
    let stat = postfit::stat_impacts(inputs.hessian, inputs.hessian_bbb_frozen, n_stat)?;
    let n_obs = workspace.data_obs();
    let external_cov = workspace
        .data_cov_inv()
        .map(covariance::invert)
        .transpose()?;
    let data_stat_global =
        global::data_stat(inputs.sensitivities, &report_rows, n_obs, external_cov.as_ref());

    grouped = append_column(&grouped, &stat.data_stat);
    grouped_global = append_column(&grouped_global, &data_stat_global);

    if let Some(bbb_stat) = &stat.bbb_stat {
        grouped = append_column(&grouped, bbb_stat);
        let kstat = workspace
            .kstat()
            .expect("binByBinStat validated at workspace construction");
        let bbb_global = global::bbb_stat(inputs.sensitivities, &report_rows, kstat);
        grouped_global = append_column(&grouped_global, &bbb_global);
    }

    Ok(ImpactReport {
        grouped,
        grouped_global,
        per_nuisance,
        per_nuisance_global,
    })
}

fn append_column(m: &Array2<f64>, col: &Array1<f64>) -> Array2<f64> {
    let mut out = Array2::zeros((m.nrows(), m.ncols() + 1));
    out.slice_mut(ndarray::s![.., ..m.ncols()]).assign(m);
    out.slice_mut(ndarray::s![.., m.ncols()]).assign(col);
    out
}
