//! Dense or sparse template tensors (`norm`, `logk`).
//!
//! `spec.md` §9 "Sparse vs dense templates": the matmul contract must be
//! identical regardless of representation, so callers (the expectation
//! engine) never branch on storage. Sparse storage uses flat COO indices
//! over `(bin, proc[, nuisance])`, per `spec.md` §3.

use ndarray::{Array2, Array3, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// A single `(bin, proc) -> value` sparse entry.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormEntry {
    /// Flat bin index.
    pub bin: u32,
    /// Process index.
    pub proc: u32,
    /// Nonnegative nominal yield.
    pub value: f64,
}

/// Nominal norm tensor, shape `[nbins, nproc]`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum NormTensor {
    /// Dense `[nbins, nproc]` array.
    Dense(Array2<f64>),
    /// Sparse COO entries over `(bin, proc)`.
    Sparse {
        /// Number of bins.
        nbins: usize,
        /// Number of processes.
        nproc: usize,
        /// Nonzero entries.
        entries: Vec<NormEntry>,
    },
}

impl NormTensor {
    /// `(nbins, nproc)` shape.
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Self::Dense(a) => (a.nrows(), a.ncols()),
            Self::Sparse { nbins, nproc, .. } => (*nbins, *nproc),
        }
    }

    /// Materializes a dense `[nbins, nproc]` array.
    pub fn to_dense(&self) -> Array2<f64> {
        match self {
            Self::Dense(a) => a.clone(),
            Self::Sparse {
                nbins,
                nproc,
                entries,
            } => {
                let mut out = Array2::zeros((*nbins, *nproc));
                for e in entries {
                    out[[e.bin as usize, e.proc as usize]] += e.value;
                }
                out
            }
        }
    }

    /// `true` if every stored value is nonnegative (`spec.md` §3 invariant).
    pub fn is_nonnegative(&self) -> bool {
        match self {
            Self::Dense(a) => a.iter().all(|&v| v >= 0.0),
            Self::Sparse { entries, .. } => entries.iter().all(|e| e.value >= 0.0),
        }
    }
}

/// A single `(bin, proc, nuisance) -> value` sparse `logk` entry. When the
/// tensor is asymmetric, `down`/`up` halves are stored as two parallel
/// entry lists sharing the same `(bin, proc, nuisance)` key space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogKEntry {
    /// Flat bin index.
    pub bin: u32,
    /// Process index.
    pub proc: u32,
    /// Nuisance index.
    pub syst: u32,
    /// Log-response value.
    pub value: f64,
}

/// Template response tensor `logk`: log of the multiplicative response per
/// `(bin, proc, nuisance)`, dense or sparse, symmetric or asymmetric.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum LogKTensor {
    /// Dense `[nbins, nproc, nsyst]`.
    DenseSymmetric(Array3<f64>),
    /// Dense `[nbins, nproc, 2, nsyst]`; axis 2 is `{down, up}`.
    DenseAsymmetric {
        /// `down` half, shape `[nbins, nproc, nsyst]`.
        down: Array3<f64>,
        /// `up` half, shape `[nbins, nproc, nsyst]`.
        up: Array3<f64>,
    },
    /// Sparse COO entries, one half.
    SparseSymmetric {
        /// Number of bins.
        nbins: usize,
        /// Number of processes.
        nproc: usize,
        /// Number of nuisances.
        nsyst: usize,
        /// Nonzero entries.
        entries: Vec<LogKEntry>,
    },
    /// Sparse COO entries, two halves.
    SparseAsymmetric {
        /// Number of bins.
        nbins: usize,
        /// Number of processes.
        nproc: usize,
        /// Number of nuisances.
        nsyst: usize,
        /// `down` half entries.
        down: Vec<LogKEntry>,
        /// `up` half entries.
        up: Vec<LogKEntry>,
    },
}

impl LogKTensor {
    /// Number of bins.
    pub fn nbins(&self) -> usize {
        match self {
            Self::DenseSymmetric(a) => a.len_of(Axis(0)),
            Self::DenseAsymmetric { down, .. } => down.len_of(Axis(0)),
            Self::SparseSymmetric { nbins, .. } | Self::SparseAsymmetric { nbins, .. } => *nbins,
        }
    }

    /// Number of processes.
    pub fn nproc(&self) -> usize {
        match self {
            Self::DenseSymmetric(a) => a.len_of(Axis(1)),
            Self::DenseAsymmetric { down, .. } => down.len_of(Axis(1)),
            Self::SparseSymmetric { nproc, .. } | Self::SparseAsymmetric { nproc, .. } => *nproc,
        }
    }

    /// Number of nuisances.
    pub fn nsyst(&self) -> usize {
        match self {
            Self::DenseSymmetric(a) => a.len_of(Axis(2)),
            Self::DenseAsymmetric { down, .. } => down.len_of(Axis(2)),
            Self::SparseSymmetric { nsyst, .. } | Self::SparseAsymmetric { nsyst, .. } => *nsyst,
        }
    }

    /// `true` for the two-half (asymmetric) representation.
    pub fn is_asymmetric(&self) -> bool {
        matches!(self, Self::DenseAsymmetric { .. } | Self::SparseAsymmetric { .. })
    }

    fn to_dense_halves(&self) -> (Array3<f64>, Option<Array3<f64>>) {
        let (nbins, nproc, nsyst) = (self.nbins(), self.nproc(), self.nsyst());
        match self {
            Self::DenseSymmetric(a) => (a.clone(), None),
            Self::DenseAsymmetric { down, up } => (down.clone(), Some(up.clone())),
            Self::SparseSymmetric { entries, .. } => {
                let mut down = Array3::zeros((nbins, nproc, nsyst));
                for e in entries {
                    down[[e.bin as usize, e.proc as usize, e.syst as usize]] += e.value;
                }
                (down, None)
            }
            Self::SparseAsymmetric { down, up, .. } => {
                let mut down_a = Array3::zeros((nbins, nproc, nsyst));
                let mut up_a = Array3::zeros((nbins, nproc, nsyst));
                for e in down {
                    down_a[[e.bin as usize, e.proc as usize, e.syst as usize]] += e.value;
                }
                for e in up {
                    up_a[[e.bin as usize, e.proc as usize, e.syst as usize]] += e.value;
                }
                (down_a, Some(up_a))
            }
        }
    }

    /// Contracts the template against a response vector `eta`: length
    /// `nsyst` in the symmetric case, or `2 * nsyst` (stacked `[theta,
    /// theta * alpha]`, per `spec.md` §4.1 step 2) in the asymmetric case.
    /// Returns `log_s`, shape `[nbins, nproc]`.
    pub fn contract(&self, eta: ArrayView1<f64>) -> Array2<f64> {
        let (nbins, nproc, nsyst) = (self.nbins(), self.nproc(), self.nsyst());
        let (down, up) = self.to_dense_halves();
        let flat_down = down
            .into_shape((nbins * nproc, nsyst))
            .expect("contiguous reshape");
        let mut out = flat_down.dot(&eta.slice(ndarray::s![..nsyst]).to_owned());
        if let Some(up) = up {
            let flat_up = up
                .into_shape((nbins * nproc, nsyst))
                .expect("contiguous reshape");
            out = out + flat_up.dot(&eta.slice(ndarray::s![nsyst..]).to_owned());
        }
        out.into_shape((nbins, nproc)).expect("contiguous reshape")
    }

    /// `d(log_s)/d(theta)`, shape `[nbins, nproc, nsyst]`. For the
    /// asymmetric case this already folds in the interpolation weight
    /// `w1 = alpha(theta) + theta * alpha'(theta)` via the chain rule on
    /// `theta * alpha(theta)`.
    pub fn dlogs_dtheta(&self, w1: Option<ArrayView1<f64>>) -> Array3<f64> {
        let (down, up) = self.to_dense_halves();
        match (up, w1) {
            (None, _) => down,
            (Some(up), Some(w1)) => {
                let w1 = w1.insert_axis(Axis(0)).insert_axis(Axis(0));
                down + up * w1
            }
            (Some(_), None) => panic!("asymmetric template requires interpolation weights"),
        }
    }

    /// `d^2(log_s)/d(theta_n)^2` (diagonal only: cross terms vanish because
    /// each nuisance's log-response is a separable function of that
    /// nuisance alone), shape `[nbins, nproc, nsyst]`.
    pub fn d2logs_dtheta2_diag(&self, w2: Option<ArrayView1<f64>>) -> Array3<f64> {
        let nsyst = self.nsyst();
        match (self, w2) {
            (Self::DenseSymmetric(_), _) | (Self::SparseSymmetric { .. }, _) => {
                Array3::zeros((self.nbins(), self.nproc(), nsyst))
            }
            (_, Some(w2)) => {
                let (_, up) = self.to_dense_halves();
                let up = up.expect("asymmetric template");
                let w2 = w2.insert_axis(Axis(0)).insert_axis(Axis(0));
                up * w2
            }
            (_, None) => panic!("asymmetric template requires interpolation curvature"),
        }
    }
}
