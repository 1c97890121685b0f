//! Owned end-to-end pipeline (`spec.md` §5): ties the expectation engine,
//! likelihood engine, minimizer, covariance/sensitivities, impacts and
//! toy generator into a single mutable-state object. One [`Fitter`] owns
//! one fit's worth of state; independent fitter instances share no
//! mutable state, matching the single-threaded cooperative orchestration
//! model (internal linear-algebra kernels may still parallelize).

use ndarray::{s, Array1, Array2, Axis};
use rand::Rng;

use crate::artifact::{ChannelResultArtifact, FitMeta, FitResultArtifact, ImpactsArtifact, ParmsArtifact};
use crate::covariance::{self, Sensitivities};
use crate::error::Result;
use crate::expectation::{self, default_x_poi, EvalOptions, Params};
use crate::impacts::{self, ImpactInputs, ImpactReport};
use crate::likelihood::{self, saturated, ReferenceState};
use crate::minimizer::{self, MinimizerResult};
use crate::observable::{self, ObservableJacobians};
use crate::toys;
use crate::workspace::Workspace;

/// Mutable fit state: the parameter vector, its reference points, and
/// everything derived from the most recent minimization.
pub struct FitterState {
    /// Current parameter vector `[x_poi, theta]`.
    pub x: Array1<f64>,
    /// Gaussian-constraint center.
    pub theta0: Array1<f64>,
    /// BBB reference value (all-ones when BBB is disabled or not yet
    /// randomized).
    pub beta0: Array1<f64>,
    /// Expectation at the last re-linearization, stabilizing the
    /// reported Poisson NLL.
    pub n_exp_nom: Option<Array1<f64>>,
    /// Post-fit covariance, `None` before the first successful fit.
    pub cov: Option<Array2<f64>>,
    /// Sensitivity matrices, `None` before the first successful fit.
    pub sensitivities: Option<Sensitivities>,
    /// Outcome of the most recent minimization.
    pub minimizer_result: Option<MinimizerResult>,
}

impl FitterState {
    fn defaults(workspace: &Workspace) -> Self {
        let options = workspace.options();
        let npoi = workspace.npoi();
        let nsyst = workspace.nsyst();
        let x_poi = default_x_poi(options.poi_default, npoi, options.allow_negative_poi);
        let theta = Array1::zeros(nsyst);
        let x = ndarray::concatenate(ndarray::Axis(0), &[x_poi.view(), theta.view()])
            .expect("both blocks are 1-D");
        let beta0 = Array1::ones(workspace.nbins());
        let theta0 = Array1::zeros(nsyst);
        Self {
            x,
            theta0,
            beta0,
            n_exp_nom: None,
            cov: None,
            sensitivities: None,
            minimizer_result: None,
        }
    }
}

/// Owns a [`Workspace`] and its mutable [`FitterState`].
pub struct Fitter {
    workspace: Workspace,
    state: FitterState,
}

impl Fitter {
    /// Builds a fitter at default parameter values (`spec.md` §9
    /// "Non-negativity via squaring").
    pub fn new(workspace: Workspace) -> Self {
        let state = FitterState::defaults(&workspace);
        Self { workspace, state }
    }

    /// The underlying immutable input model.
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// The current mutable fit state.
    pub fn state(&self) -> &FitterState {
        &self.state
    }

    fn eval_opts(&self, stop_gradient_bbb: bool) -> EvalOptions {
        let options = self.workspace.options();
        EvalOptions {
            allow_negative_poi: options.allow_negative_poi,
            profile_bbb: options.bin_by_bin_stat,
            stop_gradient_bbb,
            normalize: options.normalize,
            exponential_transform_scale: options.exponential_transform_scale,
        }
    }

    fn evaluate(&self, x: &Array1<f64>, eval_opts: EvalOptions) -> likelihood::Evaluation {
        let npoi = self.workspace.npoi();
        let params = Params::new(x.slice(s![..npoi]), x.slice(s![npoi..]));
        let reference = ReferenceState {
            theta0: self.state.theta0.view(),
            beta0: self.state.beta0.view(),
            n_exp_nom: self.state.n_exp_nom.as_ref().map(|n| n.view()),
        };
        likelihood::evaluate(&self.workspace, params, &reference, &eval_opts)
    }

    /// Runs the trust-region minimizer from the current `x`, then
    /// derives the post-fit covariance and sensitivity matrices
    /// (`spec.md` §4.3, §4.4).
    pub fn fit(&mut self, max_iters: u64) -> Result<&MinimizerResult> {
        let eval_opts = self.eval_opts(false);
        let result = minimizer::minimize(
            &self.workspace,
            self.state.x.clone(),
            self.state.theta0.view(),
            self.state.beta0.view(),
            eval_opts,
            max_iters,
        )?;

        self.state.x = result.x.clone();

        let eval = self.evaluate(&self.state.x, eval_opts);
        let hessian = eval.hessian();
        let sigma = covariance::invert(&hessian)?;
        let sensitivities = covariance::sensitivities(
            &self.workspace,
            &eval.expectation,
            &sigma,
            self.state.beta0.view(),
        );

        self.state.cov = Some(sigma);
        self.state.sensitivities = Some(sensitivities);
        self.state.n_exp_nom = Some(eval.expectation.n_exp.clone());
        self.state.minimizer_result = Some(result);

        Ok(self
            .state
            .minimizer_result
            .as_ref()
            .expect("just assigned"))
    }

    /// Negative log-likelihood of the saturated model, the reference
    /// point for a goodness-of-fit chi-square (`spec.md` §4.2).
    pub fn nll_saturated(&self) -> f64 {
        let mask = self.workspace.likelihood_mask();
        saturated::value(self.workspace.data_obs().view(), &mask)
    }

    /// `2 · (NLL_full − L_sat)` at the current `x`, the goodness-of-fit
    /// chi-square (`spec.md` §8 "Chi² round-trip").
    pub fn chi_square(&self) -> f64 {
        let eval_opts = self.eval_opts(false);
        let eval = self.evaluate(&self.state.x, eval_opts);
        2.0 * (eval.value_full - self.nll_saturated())
    }

    /// Degrees of freedom for [`Fitter::chi_square`].
    pub fn ndf(&self) -> i64 {
        saturated::ndof(&self.workspace)
    }

    /// Impact decomposition for every POI/NOI, in both post-fit-
    /// covariance and global flavors. Requires a prior successful
    /// [`Fitter::fit`].
    pub fn impacts(&self) -> Result<ImpactReport> {
        let cov = self
            .state
            .cov
            .as_ref()
            .expect("impacts require a prior successful fit");
        let sensitivities = self
            .state
            .sensitivities
            .as_ref()
            .expect("impacts require a prior successful fit");

        let eval_opts = self.eval_opts(false);
        let eval = self.evaluate(&self.state.x, eval_opts);
        let hessian = eval.hessian();

        let hessian_bbb_frozen = if self.workspace.options().bin_by_bin_stat {
            let frozen_opts = self.eval_opts(true);
            let frozen_eval = self.evaluate(&self.state.x, frozen_opts);
            Some(frozen_eval.hessian())
        } else {
            None
        };

        let inputs = ImpactInputs {
            hessian: &hessian,
            sigma: cov,
            sensitivities,
            hessian_bbb_frozen: hessian_bbb_frozen.as_ref(),
        };
        impacts::report(&self.workspace, &inputs)
    }

    /// Nominal (pre-randomization) expectation at the default starting
    /// point, used for [`Fitter::result`]'s `hist_prefit`.
    fn prefit_expectation(&self) -> expectation::Expectation {
        let options = self.workspace.options();
        let npoi = self.workspace.npoi();
        let nsyst = self.workspace.nsyst();
        let x_poi = default_x_poi(options.poi_default, npoi, options.allow_negative_poi);
        let theta = Array1::zeros(nsyst);
        let beta0 = Array1::ones(self.workspace.nbins());
        let params = Params::new(x_poi.view(), theta.view());
        expectation::evaluate(
            &self.workspace,
            params,
            self.workspace.data_obs().view(),
            beta0.view(),
            &self.eval_opts(false),
        )
    }

    /// Assembles the full output contract (`spec.md` §6): per-parameter
    /// summary, post-fit covariance, both impact flavors, and per-channel
    /// histograms/covariances/variations. Requires a prior successful
    /// [`Fitter::fit`].
    pub fn result(&self) -> Result<FitResultArtifact> {
        let cov = self
            .state
            .cov
            .as_ref()
            .expect("result requires a prior successful fit");
        let minimizer_result = self
            .state
            .minimizer_result
            .as_ref()
            .expect("result requires a prior successful fit");

        let eval_opts = self.eval_opts(false);
        let eval = self.evaluate(&self.state.x, eval_opts);
        let prefit = self.prefit_expectation();

        let parms = ParmsArtifact {
            names: self.workspace.parameter_names(),
            values: self.state.x.clone(),
            variances: covariance::diag(cov),
        };

        let report = self.impacts()?;
        let mut column_names = self.workspace.groups().names.clone();
        column_names.push("stat".to_string());
        if self.workspace.options().bin_by_bin_stat {
            column_names.push("binByBinStat".to_string());
        }
        let impacts = ImpactsArtifact {
            column_names: column_names.clone(),
            per_nuisance: report.per_nuisance,
            grouped: report.grouped,
        };
        let global_impacts = ImpactsArtifact {
            column_names,
            per_nuisance: report.per_nuisance_global,
            grouped: report.grouped_global,
        };

        let channels = self
            .workspace
            .channels()
            .iter()
            .map(|channel| {
                let range = channel.start..channel.stop;
                let jac = eval.expectation.jacobian.slice(s![range.clone(), ..]).to_owned();
                let hist_prefit = prefit.n_exp.slice(s![range.clone()]).to_owned();
                let hist_postfit = eval.expectation.n_exp.slice(s![range.clone()]).to_owned();
                let hist_postfit_inclusive = eval
                    .expectation
                    .norm_full
                    .slice(s![range.clone(), ..])
                    .sum_axis(Axis(1));
                let cov_postfit = jac.dot(&cov.dot(&jac.t()));

                let nsyst = self.workspace.nsyst();
                let nbins = self.workspace.nbins();
                let nout = jac.nrows();
                let jac_struct = ObservableJacobians {
                    df_dx: jac,
                    df_dtheta0: Array2::zeros((nout, nsyst)),
                    df_dnobs: Array2::zeros((nout, nbins)),
                    df_dbeta0: Array2::zeros((nout, nbins)),
                };
                let variations = observable::variations(hist_postfit.view(), &jac_struct, cov, true);

                ChannelResultArtifact {
                    channel: channel.name.clone(),
                    hist_prefit,
                    hist_postfit,
                    hist_postfit_inclusive,
                    cov_postfit,
                    variations,
                }
            })
            .collect();

        let meta = FitMeta {
            chi2: self.chi_square(),
            ndf: self.ndf(),
            nll_full: eval.value_full,
            nll_saturated: self.nll_saturated(),
            edm: minimizer_result.edm,
        };

        Ok(FitResultArtifact {
            parms,
            cov: cov.clone(),
            impacts,
            global_impacts,
            channels,
            meta,
        })
    }

    /// Randomizes `x`/`theta0`/`beta0`/`n_obs` per `spec.md` §4.7, resets
    /// `x` to its default, and re-centers the stabilized NLL. Does not
    /// re-run the minimizer; call [`Fitter::fit`] afterward.
    pub fn randomize_toy<R: Rng>(
        &mut self,
        rng: &mut R,
        bayesian: bool,
        bootstrap_data: bool,
    ) -> Result<()> {
        let options = self.workspace.options().clone();
        let npoi = self.workspace.npoi();
        let nsyst = self.workspace.nsyst();

        if bayesian {
            self.state.x = toys::bayesian_x(rng, npoi, npoi + nsyst)?;
        } else {
            self.state.theta0 = toys::frequentist_theta0(rng, nsyst);
        }

        if options.bin_by_bin_stat {
            let kstat = self
                .workspace
                .kstat()
                .expect("validated at workspace construction");
            self.state.beta0 = toys::bbb_beta0(rng, kstat.view());
        }

        let new_data_obs = if bootstrap_data {
            if options.bin_by_bin_stat && !bayesian {
                return Err(crate::error::FitError::Unsupported(
                    "bin-by-bin statistical uncertainties are always propagated in a \
                     Bayesian manner and cannot be consistently propagated for \
                     bootstrap toys under frequentist randomization"
                        .into(),
                ));
            }
            toys::poisson_data(rng, self.workspace.data_obs().view())?
        } else {
            let eval_opts = self.eval_opts(false);
            let expected = self.evaluate(&self.state.x, eval_opts).expectation.n_exp;
            toys::poisson_data(rng, expected.view())?
        };
        self.workspace = self.workspace.clone().with_pseudodata(new_data_obs)?;

        // Reset `x` to its default while preserving the randomized
        // `theta0`/`beta0` reference points.
        self.state.x = {
            let x_poi = default_x_poi(options.poi_default, npoi, options.allow_negative_poi);
            ndarray::concatenate(ndarray::Axis(0), &[x_poi.view(), self.state.theta0.view()])
                .expect("both blocks are 1-D")
        };
        self.state.cov = None;
        self.state.sensitivities = None;
        self.state.minimizer_result = None;

        let eval_opts = self.eval_opts(false);
        self.state.n_exp_nom = Some(self.evaluate(&self.state.x, eval_opts).expectation.n_exp);

        Ok(())
    }
}
