//! Likelihood engine (LE): negative log-likelihood value, gradient,
//! Hessian and Hessian-vector products.
//!
//! Derivatives are assembled analytically from the expectation engine's
//! Jacobian and curvature rather than recorded on an automatic-
//! differentiation tape: every term here (Poisson, chi-square, Gaussian
//! constraint, BBB penalty) has a closed-form first and second derivative
//! with respect to the quantity it depends on (`n_exp`, `theta`, `beta`),
//! and [`crate::expectation::Expectation`] already exposes the chain-rule
//! pieces needed to carry those through to `x` (`SPEC_FULL.md` §4.2).

pub mod bbb_term;
pub mod chisq;
pub mod constraint;
pub mod poisson;
pub mod saturated;

use ndarray::{Array1, Array2, ArrayView1};

use crate::expectation::{self, EvalOptions, Expectation, Params};
use crate::workspace::Workspace;

/// Reference state the likelihood is evaluated against, beyond the
/// parameter vector itself: the constraint center, the BBB reference
/// value, and (Poisson mode only) the expectation at the last
/// re-linearization, used purely to stabilize the reported NLL value.
pub struct ReferenceState<'a> {
    /// Gaussian constraint center, length `nsyst`.
    pub theta0: ArrayView1<'a, f64>,
    /// BBB reference value, length `nbins`; all-ones when unused.
    pub beta0: ArrayView1<'a, f64>,
    /// Expectation at the last re-linearization, for the numerically
    /// stabilized Poisson value. `None` disables the offset.
    pub n_exp_nom: Option<ArrayView1<'a, f64>>,
}

/// Value, gradient and (on demand) Hessian/HVP of the total NLL at a
/// single parameter vector.
pub struct Evaluation {
    /// `NLL_data + NLL_constraint + NLL_bbb`, using the numerically
    /// stabilized Poisson term when applicable.
    pub value: f64,
    /// Same decomposition using the raw (non-offset) Poisson term; equal
    /// to `value` outside Poisson mode.
    pub value_full: f64,
    /// `d(value)/dx`, length `nparm`.
    pub gradient: Array1<f64>,
    /// The expectation this evaluation was built from.
    pub expectation: Expectation,

    data_grad_y: Array1<f64>,
    data_curv: chisq::CurvatureOwned,
    constraint_hessian_diag: Array1<f64>,
    bbb: Option<(Array1<f64>, Array1<f64>)>,
}

impl Evaluation {
    /// Assembles the dense Hessian `d^2(value)/dx^2`.
    pub fn hessian(&self) -> Array2<f64> {
        let nparm = self.gradient.len();
        let mut h = self
            .expectation
            .hessian_contribution(self.data_grad_y.view(), self.data_curv.view());

        if let Some((g, c)) = &self.bbb {
            h += &self
                .expectation
                .beta_hessian_contribution(g.view(), c.view());
        }

        let npoi = nparm - self.constraint_hessian_diag.len();
        for (n, &w) in self.constraint_hessian_diag.iter().enumerate() {
            h[[npoi + n, npoi + n]] += w;
        }
        h
    }

    /// Hessian-vector product `H * v`, via a dense matrix-vector product
    /// against the analytically assembled Hessian. Hessians in this
    /// regime are small enough (`spec.md` §9, typically well under
    /// `10^4` parameters) that this is cheaper than a second
    /// forward-over-reverse differentiation pass.
    pub fn hvp(&self, v: ArrayView1<f64>) -> Array1<f64> {
        self.hessian().dot(&v)
    }
}

/// Evaluates the total NLL, its gradient, and everything needed to later
/// assemble the Hessian, at `params`.
pub fn evaluate(
    workspace: &Workspace,
    params: Params,
    reference: &ReferenceState,
    eval_opts: &EvalOptions,
) -> Evaluation {
    let mask = workspace.likelihood_mask();
    let options = workspace.options();
    let n_obs = workspace.data_obs().view();

    let expectation = expectation::evaluate(workspace, params, n_obs, reference.beta0, eval_opts);
    let n_exp = expectation.n_exp.view();

    let (data_value, data_value_full, data_grad_y, data_curv) = if options.chisq_fit {
        let cov = if options.external_covariance {
            chisq::Covariance::External(
                workspace
                    .data_cov_inv()
                    .expect("validated at construction")
                    .view(),
            )
        } else {
            chisq::Covariance::DataDerived
        };
        let v = chisq::value(n_obs, n_exp, &cov, &mask);
        let g = chisq::gradient(n_obs, n_exp, &cov, &mask);
        let c = chisq::curvature(n_obs, &cov, &mask);
        (v, v, g, c)
    } else {
        let full = poisson::value(n_obs, n_exp, &mask);
        let stabilized = match reference.n_exp_nom {
            Some(nom) => poisson::value_stabilized(n_obs, n_exp, nom, &mask),
            None => full,
        };
        let g = poisson::gradient(n_obs, n_exp, &mask);
        let c = poisson::curvature(n_obs, n_exp, &mask);
        (stabilized, full, g, chisq::CurvatureOwned::Diagonal(c))
    };

    let theta0 = reference.theta0;
    let weight: Array1<f64> = workspace
        .nuisances()
        .iter()
        .map(|n| n.constraint_weight)
        .collect();
    let constraint_value = constraint::value(params.theta, theta0, weight.view());
    let constraint_grad = constraint::gradient(params.theta, theta0, weight.view());
    let constraint_hessian_diag = constraint::hessian_diag(weight.view());

    let bbb = if options.bin_by_bin_stat {
        let kstat = workspace.kstat().expect("validated at construction").view();
        let beta = expectation.beta.view();
        let bbb_value = bbb_term::value(kstat, beta, reference.beta0, &mask);
        let bbb_grad_beta = bbb_term::gradient(kstat, beta, reference.beta0, &mask);
        let bbb_curv_beta = bbb_term::curvature(kstat, beta, &mask);
        Some((bbb_value, bbb_grad_beta, bbb_curv_beta))
    } else {
        None
    };

    let npoi = workspace.npoi();
    let nparm = npoi + workspace.nsyst();
    let mut gradient = Array1::zeros(nparm);
    {
        let data_via_x = expectation.jacobian.t().dot(&data_grad_y);
        gradient += &data_via_x;
    }
    for (n, &g) in constraint_grad.iter().enumerate() {
        gradient[npoi + n] += g;
    }

    let mut value = data_value + constraint_value;
    let mut value_full = data_value_full + constraint_value;

    let bbb_for_hessian = if let Some((bbb_value, bbb_grad_beta, bbb_curv_beta)) = bbb {
        value += bbb_value;
        value_full += bbb_value;
        let via_x = expectation.beta_jacobian.t().dot(&bbb_grad_beta);
        gradient += &via_x;
        Some((bbb_grad_beta, bbb_curv_beta))
    } else {
        None
    };

    Evaluation {
        value,
        value_full,
        gradient,
        expectation,
        data_grad_y,
        data_curv,
        constraint_hessian_diag,
        bbb: bbb_for_hessian,
    }
}
