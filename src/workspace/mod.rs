//! Immutable input model (IM): shapes, template tensors, nuisance
//! metadata, channel layout. Constructed once from a workspace artifact
//! and never mutated afterwards (`spec.md` §3 "Lifecycle").

mod channel;
mod nuisance;
mod process;
mod tensor;

pub use channel::{Channel, ChannelAxis};
pub use nuisance::{Groups, Nuisance, ResponseKind};
pub use process::Process;
pub use tensor::{LogKEntry, LogKTensor, NormEntry, NormTensor};

use ndarray::{Array1, Array2};

use crate::config::FitterOptions;
use crate::error::{FitError, Result};

/// Immutable container of shapes, template tensors, nuisance metadata and
/// channel layout (`spec.md` §2/§3 "Input model").
#[derive(Clone, Debug)]
pub struct Workspace {
    channels: Vec<Channel>,
    processes: Vec<Process>,
    nuisances: Vec<Nuisance>,
    groups: Groups,
    norm: NormTensor,
    logk: LogKTensor,
    data_obs: Array1<f64>,
    data_cov_inv: Option<Array2<f64>>,
    kstat: Option<Array1<f64>>,
    options: FitterOptions,
    npoi: usize,
}

impl Workspace {
    /// Builds and validates a workspace. Raises [`FitError::ConfigConflict`]
    /// or [`FitError::InvalidData`] on any violation of `spec.md` §3's
    /// invariants.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        npoi: usize,
        channels: Vec<Channel>,
        processes: Vec<Process>,
        nuisances: Vec<Nuisance>,
        groups: Groups,
        norm: NormTensor,
        logk: LogKTensor,
        data_obs: Array1<f64>,
        data_cov_inv: Option<Array2<f64>>,
        kstat: Option<Array1<f64>>,
        options: FitterOptions,
    ) -> Result<Self> {
        options.validate()?;

        let nbins = norm.shape().0;

        // Channel ranges partition [0, nbins).
        let mut sorted: Vec<&Channel> = channels.iter().collect();
        sorted.sort_by_key(|c| c.start);
        let mut cursor = 0usize;
        for c in &sorted {
            if c.start != cursor {
                return Err(FitError::InvalidData(format!(
                    "channel {:?} starts at {} but bin space cursor is at {cursor}",
                    c.name, c.start
                )));
            }
            if c.stop <= c.start {
                return Err(FitError::InvalidData(format!(
                    "channel {:?} has empty or inverted range", c.name
                )));
            }
            cursor = c.stop;
        }
        if cursor != nbins {
            return Err(FitError::InvalidData(format!(
                "channels cover {cursor} bins but templates have {nbins} bins"
            )));
        }

        if norm.shape() != logk_proc_shape(&logk, nbins) {
            return Err(FitError::InvalidData(
                "norm and logk tensors disagree on (nbins, nproc)".into(),
            ));
        }

        if !norm.is_nonnegative() {
            return Err(FitError::InvalidData("norm must be nonnegative".into()));
        }

        if data_obs.len() != nbins {
            return Err(FitError::InvalidData(format!(
                "data_obs has length {} but expected {nbins}",
                data_obs.len()
            )));
        }

        if !options.chisq_fit && data_obs.iter().any(|&v| v <= 0.0) {
            return Err(FitError::InvalidData(
                "n_obs must be strictly positive for the Poisson likelihood".into(),
            ));
        }

        if options.bin_by_bin_stat {
            match &kstat {
                None => {
                    return Err(FitError::InvalidData(
                        "binByBinStat requires kstat".into(),
                    ))
                }
                Some(k) => {
                    if k.len() != nbins {
                        return Err(FitError::InvalidData(format!(
                            "kstat has length {} but expected {nbins}",
                            k.len()
                        )));
                    }
                    if k.iter().any(|&v| v <= 0.0) {
                        return Err(FitError::InvalidData(
                            "kstat must be strictly positive when BBB is enabled".into(),
                        ));
                    }
                }
            }
        }

        if let Some(cov) = &data_cov_inv {
            if !options.chisq_fit || !options.external_covariance {
                return Err(FitError::ConfigConflict(
                    "data_cov_inv requires chisqFit and externalCovariance".into(),
                ));
            }
            if cov.nrows() != nbins || cov.ncols() != nbins {
                return Err(FitError::InvalidData(format!(
                    "data_cov_inv must be {nbins}x{nbins}"
                )));
            }
        }

        let nsyst = nuisances.len();
        if logk.nsyst() != nsyst {
            return Err(FitError::InvalidData(format!(
                "logk declares {} nuisances but {nsyst} were supplied",
                logk.nsyst()
            )));
        }
        for n in &nuisances {
            if let Some(g) = n.group {
                if g >= groups.len() {
                    return Err(FitError::InvalidData(format!(
                        "nuisance {:?} references unknown group {g}", n.name
                    )));
                }
            }
        }

        for p in &processes {
            if p.signal && p.poi_index.map_or(true, |i| i >= npoi) {
                return Err(FitError::InvalidData(format!(
                    "signal process {:?} has no valid poi_index", p.name
                )));
            }
        }

        Ok(Self {
            channels,
            processes,
            nuisances,
            groups,
            norm,
            logk,
            data_obs,
            data_cov_inv,
            kstat,
            options,
            npoi,
        })
    }

    /// Total number of bins across all channels.
    pub fn nbins(&self) -> usize {
        self.norm.shape().0
    }

    /// Number of processes.
    pub fn nproc(&self) -> usize {
        self.norm.shape().1
    }

    /// Number of nuisance parameters.
    pub fn nsyst(&self) -> usize {
        self.nuisances.len()
    }

    /// Number of parameters of interest.
    pub fn npoi(&self) -> usize {
        self.npoi
    }

    /// Number of unconstrained nuisances (`constraint_weight == 0`).
    pub fn n_unconstrained(&self) -> usize {
        self.nuisances.iter().filter(|n| n.is_unconstrained()).count()
    }

    /// Nuisance indices flagged `noi`, in workspace order — reported
    /// alongside the POIs in impact tables (`spec.md` §4.5).
    pub fn noi_indices(&self) -> Vec<usize> {
        self.nuisances
            .iter()
            .enumerate()
            .filter(|(_, n)| n.noi)
            .map(|(i, _)| i)
            .collect()
    }

    /// Names of every reported parameter: one per POI (from the first
    /// signal process scaled by that POI index, or `poi{i}` if none is
    /// found), followed by one per nuisance.
    pub fn parameter_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.npoi + self.nuisances.len());
        for i in 0..self.npoi {
            let name = self
                .processes
                .iter()
                .find(|p| p.poi_index == Some(i))
                .map(|p| p.name.clone())
                .unwrap_or_else(|| format!("poi{i}"));
            names.push(name);
        }
        names.extend(self.nuisances.iter().map(|n| n.name.clone()));
        names
    }

    /// Channel layout.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Process metadata.
    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    /// Nuisance metadata.
    pub fn nuisances(&self) -> &[Nuisance] {
        &self.nuisances
    }

    /// Group partition.
    pub fn groups(&self) -> &Groups {
        &self.groups
    }

    /// Nominal norm tensor.
    pub fn norm(&self) -> &NormTensor {
        &self.norm
    }

    /// Template response tensor.
    pub fn logk(&self) -> &LogKTensor {
        &self.logk
    }

    /// Observed data vector.
    pub fn data_obs(&self) -> &Array1<f64> {
        &self.data_obs
    }

    /// Swaps in a pseudodata vector, re-validating invariants (supplement
    /// from `original_source/combinetf2/workspace.py`'s pseudodata
    /// support). Consumes and returns `self` since the workspace is
    /// otherwise immutable.
    pub fn with_pseudodata(mut self, pseudodata: Array1<f64>) -> Result<Self> {
        if pseudodata.len() != self.nbins() {
            return Err(FitError::InvalidData(format!(
                "pseudodata has length {} but expected {}",
                pseudodata.len(),
                self.nbins()
            )));
        }
        if !self.options.chisq_fit && pseudodata.iter().any(|&v| v <= 0.0) {
            return Err(FitError::InvalidData(
                "pseudodata must be strictly positive for the Poisson likelihood".into(),
            ));
        }
        self.data_obs = pseudodata;
        Ok(self)
    }

    /// Externally supplied inverse data covariance, chi-square mode only.
    pub fn data_cov_inv(&self) -> Option<&Array2<f64>> {
        self.data_cov_inv.as_ref()
    }

    /// Barlow-Beeston effective MC counts, when BBB is enabled.
    pub fn kstat(&self) -> Option<&Array1<f64>> {
        self.kstat.as_ref()
    }

    /// Driver options this workspace was validated against.
    pub fn options(&self) -> &FitterOptions {
        &self.options
    }

    /// Per-bin inclusion mask: `false` for bins belonging to a masked
    /// channel, which contribute to the expectation model but are excluded
    /// from every likelihood term (`spec.md` §3 "masked").
    pub fn likelihood_mask(&self) -> Vec<bool> {
        let mut mask = vec![true; self.nbins()];
        for c in &self.channels {
            if c.masked {
                for b in c.start..c.stop {
                    mask[b] = false;
                }
            }
        }
        mask
    }

    /// Number of bins entering the likelihood, i.e. not belonging to a
    /// masked channel.
    pub fn n_likelihood_bins(&self) -> usize {
        self.likelihood_mask().iter().filter(|&&m| m).count()
    }
}

fn logk_proc_shape(logk: &LogKTensor, nbins: usize) -> (usize, usize) {
    debug_assert_eq!(logk.nbins(), nbins);
    (logk.nbins(), logk.nproc())
}
