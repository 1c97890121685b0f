//! Serde-derived input/output artifact shapes: the external I/O contract
//! (`spec.md` §6). Template/tensor authoring and file persistence are out
//! of scope; this module only defines the shapes a caller serializes a
//! [`crate::workspace::Workspace`] from and a fit result into.

use ndarray::{Array1, Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::config::FitterOptions;
use crate::workspace::{Channel, Groups, Nuisance, Process, Workspace};
use crate::workspace::{LogKTensor, NormTensor};

/// The full input contract: everything [`crate::workspace::Workspace::new`]
/// needs, laid out for serialization.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkspaceArtifact {
    /// Number of parameters of interest.
    pub npoi: usize,
    /// Process metadata, in template-tensor column order.
    pub processes: Vec<Process>,
    /// Nuisance metadata, in `logk`/`theta` slot order.
    pub nuisances: Vec<Nuisance>,
    /// Nuisance group membership for impact reporting.
    pub groups: GroupsArtifact,
    /// Channel table: name, axes, global bin range, optional luminosity,
    /// masked flag.
    pub channels: Vec<Channel>,
    /// Nominal per-(bin, process) yield.
    pub norm: NormTensor,
    /// Per-(bin, process, nuisance) log-normal response.
    pub logk: LogKTensor,
    /// Observed per-bin event counts.
    pub data_obs: Array1<f64>,
    /// Externally supplied inverse data covariance (chi-square mode
    /// only).
    pub data_cov_inv: Option<Array2<f64>>,
    /// Effective MC event count per bin, for Barlow-Beeston nuisances.
    pub kstat: Option<Array1<f64>>,
    /// Driver flags that affect core semantics.
    pub options: FitterOptions,
}

/// Builds a [`Workspace`], running the same validation
/// [`Workspace::new`] always runs.
impl TryFrom<WorkspaceArtifact> for Workspace {
    type Error = crate::error::FitError;

    fn try_from(artifact: WorkspaceArtifact) -> std::result::Result<Self, Self::Error> {
        Workspace::new(
            artifact.npoi,
            artifact.channels,
            artifact.processes,
            artifact.nuisances,
            artifact.groups.into(),
            artifact.norm,
            artifact.logk,
            artifact.data_obs,
            artifact.data_cov_inv,
            artifact.kstat,
            artifact.options,
        )
    }
}

/// Inverse of [`TryFrom<WorkspaceArtifact> for Workspace`], for
/// round-tripping a workspace back out to its serializable shape.
impl From<&Workspace> for WorkspaceArtifact {
    fn from(workspace: &Workspace) -> Self {
        WorkspaceArtifact {
            npoi: workspace.npoi(),
            processes: workspace.processes().to_vec(),
            nuisances: workspace.nuisances().to_vec(),
            groups: workspace.groups().into(),
            channels: workspace.channels().to_vec(),
            norm: workspace.norm().clone(),
            logk: workspace.logk().clone(),
            data_obs: workspace.data_obs().clone(),
            data_cov_inv: workspace.data_cov_inv().cloned(),
            kstat: workspace.kstat().cloned(),
            options: workspace.options().clone(),
        }
    }
}

/// [`Groups`] is constructed from a ragged `(name, members)` list; this
/// mirrors that shape for serialization since `Groups` itself packs the
/// ragged structure into a flat offset table not meant to be hand-edited.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupsArtifact {
    /// `(group name, member nuisance indices)`, in report order.
    pub members: Vec<(String, Vec<usize>)>,
}

impl From<GroupsArtifact> for Groups {
    fn from(artifact: GroupsArtifact) -> Self {
        Groups::from_members(artifact.members)
    }
}

impl From<&Groups> for GroupsArtifact {
    fn from(groups: &Groups) -> Self {
        GroupsArtifact {
            members: groups
                .iter()
                .map(|(name, members)| (name.to_string(), members.to_vec()))
                .collect(),
        }
    }
}

/// Per-parameter post-fit summary: name, best-fit value, and `Σ_ii`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParmsArtifact {
    /// Parameter names, POIs first then nuisances.
    pub names: Vec<String>,
    /// Best-fit values.
    pub values: Array1<f64>,
    /// Diagonal of the post-fit covariance.
    pub variances: Array1<f64>,
}

/// Impact tables for one flavor (post-fit-covariance or global), in the
/// `spec.md` §4.5 ordering guarantee: per-group columns, then `stat`,
/// then `binByBinStat` if BBB is active.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImpactsArtifact {
    /// Column names: group names, then `"stat"`, then optionally
    /// `"binByBinStat"`.
    pub column_names: Vec<String>,
    /// Ungrouped per-nuisance impacts, `[n_report, nsyst]`.
    pub per_nuisance: Array2<f64>,
    /// Grouped impacts (group + stat [+ BBB] columns), `[n_report,
    /// n_columns]`.
    pub grouped: Array2<f64>,
}

/// Per-channel reported histograms and covariances.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChannelResultArtifact {
    /// Channel name.
    pub channel: String,
    /// Prefit expected yields, `norm_full` at `x_default`.
    pub hist_prefit: Array1<f64>,
    /// Post-fit expected yields at the best-fit `x`.
    pub hist_postfit: Array1<f64>,
    /// Post-fit expected yields, signal processes summed into one
    /// inclusive entry.
    pub hist_postfit_inclusive: Array1<f64>,
    /// Post-fit covariance of `hist_postfit`.
    pub cov_postfit: Array2<f64>,
    /// Per-parameter up/down variation tensor, `[nbins, nparm, 2]`.
    pub variations: Array3<f64>,
}

/// Scalar fit-quality summary.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FitMeta {
    /// Chi-square of the fit at the best-fit point.
    pub chi2: f64,
    /// Degrees of freedom for `chi2`.
    pub ndf: i64,
    /// Full (non-stabilized) NLL at the best-fit point.
    pub nll_full: f64,
    /// Saturated-model NLL, the reference point for `chi2`.
    pub nll_saturated: f64,
    /// Expected distance to minimum at convergence.
    pub edm: f64,
}

/// The full output contract.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FitResultArtifact {
    /// Parameter names, values, and marginal variances.
    pub parms: ParmsArtifact,
    /// Full post-fit covariance `Σ`.
    pub cov: Array2<f64>,
    /// Post-fit-covariance impacts.
    pub impacts: ImpactsArtifact,
    /// Global (linear-response) impacts.
    pub global_impacts: ImpactsArtifact,
    /// Per-channel reported histograms, covariances and variations.
    pub channels: Vec<ChannelResultArtifact>,
    /// Scalar fit-quality summary.
    pub meta: FitMeta,
}
