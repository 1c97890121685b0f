//! Expectation engine (EE): parameter vector `x = (poi, theta)` to
//! per-bin expected yield, with the Jacobian and curvature needed by the
//! likelihood engine to assemble an exact gradient and Hessian
//! (`spec.md` §4.1, redesign note in `SPEC_FULL.md` §4.2).

pub mod interpolation;
pub mod poi;

mod bbb;

pub use poi::{default_x_poi, signal_strength, SignalStrength};

use ndarray::{Array1, Array2, Array3, ArrayView1, Axis};
use rayon::prelude::*;

use crate::workspace::Workspace;

/// Parameter vector split into the POI block and the nuisance block.
#[derive(Clone, Copy)]
pub struct Params<'a> {
    /// Parameters of interest, length `npoi`.
    pub x_poi: ArrayView1<'a, f64>,
    /// Nuisance parameters, length `nsyst`.
    pub theta: ArrayView1<'a, f64>,
}

impl<'a> Params<'a> {
    /// Bundles the POI and nuisance blocks.
    pub fn new(x_poi: ArrayView1<'a, f64>, theta: ArrayView1<'a, f64>) -> Self {
        Self { x_poi, theta }
    }

    /// Total parameter count `npoi + nsyst`.
    pub fn nparm(&self) -> usize {
        self.x_poi.len() + self.theta.len()
    }
}

/// Knobs that do not live in `FitterOptions` because they vary per
/// evaluation rather than per workspace (e.g. BBB gradient-stopping is
/// only active while building the no-BBB Hessian for impact
/// decomposition, `spec.md` §4.5).
#[derive(Clone, Copy, Debug)]
pub struct EvalOptions {
    /// Squares the POI (`false`) or uses it directly (`true`).
    pub allow_negative_poi: bool,
    /// Profile `beta` analytically (`true`) or freeze it at `beta0` (`false`).
    pub profile_bbb: bool,
    /// Treat the profiled `beta` as a constant for differentiation.
    pub stop_gradient_bbb: bool,
    /// Rescale the expectation to match `sum(n_obs)` post-BBB.
    pub normalize: bool,
    /// Optional `scale * log(n_exp)` transform applied last.
    pub exponential_transform_scale: Option<f64>,
}

/// Result of a single expectation evaluation, retaining the intermediates
/// the likelihood engine needs to assemble the exact Hessian without
/// recomputing the forward pass.
pub struct Expectation {
    /// Final per-bin expected yield, after BBB / normalize / transform.
    pub n_exp: Array1<f64>,
    /// Per-bin expectation before BBB, normalize and transform.
    pub n_exp_central: Array1<f64>,
    /// BBB multiplier (ones when BBB is disabled).
    pub beta: Array1<f64>,
    /// Per-(bin, process) contribution, same post-processing chain as
    /// `n_exp` (`spec.md` §4.1 "norm_full").
    pub norm_full: Array2<f64>,
    /// `d(n_exp) / dx`, shape `[nbins, nparm]`.
    pub jacobian: Array2<f64>,
    /// `d(beta) / dx`, shape `[nbins, nparm]`; zero when BBB is disabled or
    /// frozen. Lets the likelihood engine chain the BBB penalty term's
    /// derivative through to `x` without recomputing the forward pass.
    pub beta_jacobian: Array2<f64>,

    core_jacobian: Array2<f64>,
    chain_m1: Array1<f64>,
    chain_m2: Array1<f64>,
    dbeta_du: Array1<f64>,
    d2beta_du2: Array1<f64>,
    snormnorm: Array2<f64>,
    dlogs: Array3<f64>,
    d2logs_diag: Array3<f64>,
    signal: SignalStrength,
}

/// Second derivative of a likelihood term with respect to the final
/// expectation `y = n_exp`: diagonal when the term is a sum of independent
/// per-bin pieces (Poisson, data-derived chi-square, BBB), dense when bins
/// are coupled by an externally supplied covariance (`spec.md` §4.2).
pub enum Curvature<'a> {
    /// `d^2(L)/d(y_b)^2`, one entry per bin.
    Diagonal(ArrayView1<'a, f64>),
    /// `d^2(L)/d(y_b) d(y_b')`, `[nbins, nbins]`.
    Dense(ndarray::ArrayView2<'a, f64>),
}

impl Expectation {
    /// Assembles the Hessian contribution of a likelihood term given its
    /// gradient `g_b = dL/d(y_b)` and curvature with respect to the final
    /// expectation `y = n_exp`. Two pieces are combined:
    ///
    /// - a Gauss-Newton term `jacobian^T * W * jacobian`, using the exact
    ///   final Jacobian (so it captures the normalize stage's cross-bin
    ///   coupling too, as a standard Gauss-Newton approximation to its
    ///   curvature — `SPEC_FULL.md` §4.2);
    /// - an exact curvature correction from the core response model and
    ///   the elementwise BBB/transform chain, via `bin_curvature`.
    ///
    /// Used by the likelihood engine for the data, chi-square and BBB terms
    /// alike (`spec.md` §4.2 "Derivatives").
    pub fn hessian_contribution(&self, g: ArrayView1<f64>, w: Curvature) -> Array2<f64> {
        let nbins = self.n_exp.len();
        let nparm = self.jacobian.ncols();
        debug_assert_eq!(g.len(), nbins);

        let mut hessian = match w {
            Curvature::Diagonal(c) => {
                let weighted = &self.jacobian * &c.to_owned().insert_axis(Axis(1));
                self.jacobian.t().dot(&weighted)
            }
            Curvature::Dense(cov) => {
                let tmp = cov.dot(&self.jacobian);
                self.jacobian.t().dot(&tmp)
            }
        };

        // Curvature correction from the core response model and the
        // elementwise post-processing chain (BBB, transform).
        let eff_a: Array1<f64> = (0..nbins).map(|b| g[b] * self.chain_m1[b]).collect();
        let eff_c: Array1<f64> = (0..nbins).map(|b| g[b] * self.chain_m2[b]).collect();

        let weighted_core = &self.core_jacobian * &eff_c.clone().insert_axis(Axis(1));
        hessian += &self.core_jacobian.t().dot(&weighted_core);

        let npoi = self.signal.dr.ncols();
        let nsyst = self.dlogs.len_of(Axis(2));
        debug_assert_eq!(nparm, npoi + nsyst);

        let blocks: Vec<Array2<f64>> = (0..nbins)
            .into_par_iter()
            .map(|b| self.bin_curvature(b, npoi, nsyst) * eff_a[b])
            .collect();
        for block in blocks {
            hessian += &block;
        }
        hessian
    }

    /// Hessian contribution of a penalty term on `beta` itself (the BBB
    /// term), given its gradient `g_b = dL/d(beta_b)` and diagonal
    /// curvature `c_b = d^2(L)/d(beta_b)^2`. `beta` is a per-bin function
    /// of the *central* expectation `u`, independent of the BBB/normalize/
    /// transform chain applied to `n_exp`, so this chains through
    /// `core_jacobian` and `bin_curvature` directly rather than through
    /// `jacobian`/`chain_m1`/`chain_m2`.
    pub fn beta_hessian_contribution(&self, g: ArrayView1<f64>, c: ArrayView1<f64>) -> Array2<f64> {
        let nbins = self.n_exp.len();
        let nparm = self.core_jacobian.ncols();
        debug_assert_eq!(g.len(), nbins);
        debug_assert_eq!(c.len(), nbins);

        let eff_c: Array1<f64> = (0..nbins)
            .map(|b| c[b] * self.dbeta_du[b].powi(2) + g[b] * self.d2beta_du2[b])
            .collect();
        let eff_a: Array1<f64> = (0..nbins).map(|b| g[b] * self.dbeta_du[b]).collect();

        let weighted = &self.core_jacobian * &eff_c.clone().insert_axis(Axis(1));
        let mut hessian = self.core_jacobian.t().dot(&weighted);

        let npoi = self.signal.dr.ncols();
        let nsyst = self.dlogs.len_of(Axis(2));
        debug_assert_eq!(nparm, npoi + nsyst);

        let blocks: Vec<Array2<f64>> = (0..nbins)
            .into_par_iter()
            .map(|b| self.bin_curvature(b, npoi, nsyst) * eff_a[b])
            .collect();
        for block in blocks {
            hessian += &block;
        }
        hessian
    }

    fn bin_curvature(&self, b: usize, npoi: usize, nsyst: usize) -> Array2<f64> {
        let snormnorm_b = self.snormnorm.index_axis(Axis(0), b);
        let dlogs_b = self.dlogs.index_axis(Axis(0), b);
        let d2logs_b = self.d2logs_diag.index_axis(Axis(0), b);
        let r = &self.signal.r;
        let dr = &self.signal.dr;
        let d2r = &self.signal.d2r;

        let nparm = npoi + nsyst;
        let mut k = Array2::zeros((nparm, nparm));

        // POI-POI block, diagonal only (each process depends on one POI).
        for kk in 0..npoi {
            let d2r_k = d2r.index_axis(Axis(1), kk);
            k[[kk, kk]] = snormnorm_b.dot(&d2r_k);
        }

        // Theta-theta block: weighted Gram matrix plus diagonal curvature.
        let w: Array1<f64> = (0..snormnorm_b.len())
            .map(|p| snormnorm_b[p] * r[p])
            .collect();
        let weighted_theta = &dlogs_b.to_owned() * &w.clone().insert_axis(Axis(1));
        let theta_theta = weighted_theta.t().dot(&dlogs_b);
        let diag_extra = w.dot(&d2logs_b);
        for n in 0..nsyst {
            for m in 0..nsyst {
                k[[npoi + n, npoi + m]] = theta_theta[[n, m]];
            }
            k[[npoi + n, npoi + n]] += diag_extra[n];
        }

        // POI-theta block (and its transpose).
        let weighted_poi = &dr.to_owned() * &snormnorm_b.to_owned().insert_axis(Axis(1));
        let poi_theta = weighted_poi.t().dot(&dlogs_b);
        for kk in 0..npoi {
            for n in 0..nsyst {
                k[[kk, npoi + n]] = poi_theta[[kk, n]];
                k[[npoi + n, kk]] = poi_theta[[kk, n]];
            }
        }

        k
    }
}

/// Evaluates the expectation engine at `params`, following `spec.md`
/// §4.1 steps 1-7 exactly, and assembles the Jacobian needed downstream.
pub fn evaluate(
    workspace: &Workspace,
    params: Params,
    n_obs: ArrayView1<f64>,
    beta0: ArrayView1<f64>,
    opts: &EvalOptions,
) -> Expectation {
    let nbins = workspace.nbins();
    let npoi = workspace.npoi();
    let nsyst = workspace.nsyst();
    let nparm = npoi + nsyst;

    // Step 1: signal strengths.
    let signal = poi::signal_strength(workspace, params.x_poi, opts.allow_negative_poi);

    // Step 2: response exponent vector eta (and its derivative factors).
    let logk = workspace.logk();
    let (eta, w1, w2) = if logk.is_asymmetric() {
        let w1 = interpolation::w1(params.theta);
        let w2 = interpolation::w2(params.theta);
        (interpolation::stack_eta(params.theta), Some(w1), Some(w2))
    } else {
        (params.theta.to_owned(), None, None)
    };

    // Step 3: log_s, s, snormnorm.
    let log_s = logk.contract(eta.view());
    let s = log_s.mapv(f64::exp);
    let norm = workspace.norm().to_dense();
    let snormnorm = &norm * &s;

    let dlogs = logk.dlogs_dtheta(w1.as_ref().map(|a| a.view()));
    let d2logs_diag = logk.d2logs_dtheta2_diag(w2.as_ref().map(|a| a.view()));

    // Step 4: central expectation and its exact Jacobian.
    let n_exp_central = snormnorm.dot(&signal.r);

    let mut core_jacobian = Array2::<f64>::zeros((nbins, nparm));
    {
        let poi_block = snormnorm.dot(&signal.dr);
        core_jacobian.slice_mut(ndarray::s![.., 0..npoi]).assign(&poi_block);

        let weighted = &snormnorm * &signal.r.clone().insert_axis(Axis(0));
        // [nbins, nproc, nsyst] * [nbins, nproc, 1] summed over proc.
        let theta_block = (&dlogs * &weighted.clone().insert_axis(Axis(2))).sum_axis(Axis(1));
        core_jacobian
            .slice_mut(ndarray::s![.., npoi..nparm])
            .assign(&theta_block);
    }

    // Step 5: BBB.
    let (beta, bbb_m1, bbb_m2, dbeta_du, d2beta_du2) = if opts.profile_bbb {
        let kstat = workspace
            .kstat()
            .expect("BBB profiling requires kstat")
            .view();
        let stage = bbb::profile(n_obs, kstat, n_exp_central.view(), opts.stop_gradient_bbb);
        (stage.beta, stage.m1, stage.m2, stage.dbeta_du, stage.d2beta_du2)
    } else if workspace.kstat().is_some() {
        let stage = bbb::frozen(beta0);
        (stage.beta, stage.m1, stage.m2, stage.dbeta_du, stage.d2beta_du2)
    } else {
        (
            Array1::ones(nbins),
            Array1::ones(nbins),
            Array1::zeros(nbins),
            Array1::zeros(nbins),
            Array1::zeros(nbins),
        )
    };
    let n_exp_bbb = &beta * &n_exp_central;
    let bbb_jacobian = &core_jacobian * &bbb_m1.clone().insert_axis(Axis(1));
    let beta_jacobian = &core_jacobian * &dbeta_du.clone().insert_axis(Axis(1));
    // Per-(bin, process) contribution, scaled by the same bin-wise beta.
    let mut norm_full = &snormnorm * &signal.r.clone().insert_axis(Axis(0));
    norm_full = &norm_full * &beta.clone().insert_axis(Axis(1));

    let mut chain_m1 = bbb_m1;
    let mut chain_m2 = bbb_m2;

    // Step 6: normalize-to-data. Exact first order; the scale factor's own
    // x-dependence is treated as locally constant for the Hessian
    // (documented simplification, SPEC_FULL.md §4.2).
    let (n_exp_normalized, jacobian_after_normalize) = if opts.normalize {
        let sum_n_obs: f64 = n_obs.sum();
        let sum_u: f64 = n_exp_bbb.sum();
        let scale = sum_n_obs / sum_u;
        let col_sums = bbb_jacobian.sum_axis(Axis(0));
        let mut jac = &bbb_jacobian * scale;
        for i in 0..nparm {
            let ds_dxi = -scale * col_sums[i] / sum_u;
            for b in 0..nbins {
                jac[[b, i]] += n_exp_bbb[b] * ds_dxi;
            }
        }
        chain_m1.mapv_inplace(|v| v * scale);
        chain_m2.mapv_inplace(|v| v * scale);
        norm_full *= scale;
        (&n_exp_bbb * scale, jac)
    } else {
        (n_exp_bbb.clone(), bbb_jacobian)
    };

    // Step 7: exponential transform.
    let (n_exp, jacobian) = if let Some(scale) = opts.exponential_transform_scale {
        let n_exp = n_exp_normalized.mapv(|v| scale * v.ln());
        let f1 = n_exp_normalized.mapv(|v| scale / v);
        let f2 = n_exp_normalized.mapv(|v| -scale / (v * v));
        let jac = &jacobian_after_normalize * &f1.clone().insert_axis(Axis(1));
        for b in 0..nbins {
            chain_m2[b] = f2[b] * chain_m1[b].powi(2) + f1[b] * chain_m2[b];
            chain_m1[b] *= f1[b];
        }
        norm_full = norm_full.mapv(|v| scale * v.ln());
        (n_exp, jac)
    } else {
        (n_exp_normalized, jacobian_after_normalize)
    };

    Expectation {
        n_exp,
        n_exp_central,
        beta,
        norm_full,
        jacobian,
        beta_jacobian,
        core_jacobian,
        chain_m1,
        chain_m2,
        dbeta_du,
        d2beta_du2,
        snormnorm,
        dlogs,
        d2logs_diag,
        signal,
    }
}
