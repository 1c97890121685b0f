//! Minimizer driver (MD): a trust-region Newton-Krylov minimizer over the
//! total NLL, wired against the likelihood engine's analytic gradient and
//! Hessian-vector product (`spec.md` §4.3).
//!
//! The workspace's declared `argmin`/`argmin-math` dependency backs this
//! directly: [`argmin::solver::trustregion::TrustRegion`] with a
//! [`argmin::solver::trustregion::Steihaug`] conjugate-gradient subproblem
//! solver, which only needs cost/gradient/Hessian callbacks — exactly the
//! contract [`crate::likelihood::Evaluation`] already exposes.

use argmin::core::{CostFunction, Error as ArgminError, Executor, Gradient, Hessian, State};
use argmin::solver::trustregion::{Steihaug, TrustRegion};
use ndarray::{s, Array1, Array2, ArrayView1};

use crate::expectation::{EvalOptions, Params};
use crate::likelihood::{self, ReferenceState};
use crate::workspace::Workspace;

/// Outcome of a minimization run.
pub struct MinimizerResult {
    /// Best-fit parameter vector, `[x_poi, theta]` concatenated.
    pub x: Array1<f64>,
    /// NLL at `x`.
    pub value: f64,
    /// Gradient at `x`; should be near zero at a converged minimum.
    pub gradient: Array1<f64>,
    /// Expected distance to minimum, `½ gᵀ H⁻¹ g` (`spec.md` §6 GLOSSARY).
    pub edm: f64,
    /// Number of iterations the trust-region solver took.
    pub iterations: u64,
}

/// Bundles a [`Workspace`] and the fixed reference state / eval options
/// the minimizer holds constant while varying `x`, implementing argmin's
/// [`CostFunction`], [`Gradient`] and [`Hessian`] traits.
struct Problem<'a> {
    workspace: &'a Workspace,
    reference: ReferenceState<'a>,
    eval_opts: EvalOptions,
    npoi: usize,
}

impl Problem<'_> {
    fn split<'b>(&self, x: &'b Array1<f64>) -> Params<'b> {
        // `x` always has length `npoi + nsyst`, checked once at
        // workspace construction (`spec.md` §3 invariant).
        Params::new(x.slice(s![..self.npoi]), x.slice(s![self.npoi..]))
    }

    fn evaluate(&self, x: &Array1<f64>) -> likelihood::Evaluation {
        let params = self.split(x);
        likelihood::evaluate(self.workspace, params, &self.reference, &self.eval_opts)
    }
}

impl CostFunction for Problem<'_> {
    type Param = Array1<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, ArgminError> {
        Ok(self.evaluate(x).value)
    }
}

impl Gradient for Problem<'_> {
    type Param = Array1<f64>;
    type Gradient = Array1<f64>;

    fn gradient(&self, x: &Self::Param) -> Result<Self::Gradient, ArgminError> {
        Ok(self.evaluate(x).gradient)
    }
}

impl Hessian for Problem<'_> {
    type Param = Array1<f64>;
    type Hessian = Array2<f64>;

    fn hessian(&self, x: &Self::Param) -> Result<Self::Hessian, ArgminError> {
        Ok(self.evaluate(x).hessian())
    }
}

/// Runs the trust-region Newton-Krylov minimizer from `x0` until argmin's
/// default convergence criteria are met or `max_iters` is exceeded.
pub fn minimize(
    workspace: &Workspace,
    x0: Array1<f64>,
    theta0: ArrayView1<f64>,
    beta0: ArrayView1<f64>,
    eval_opts: EvalOptions,
    max_iters: u64,
) -> Result<MinimizerResult, crate::error::FitError> {
    let npoi = workspace.npoi();
    let make_problem = || Problem {
        workspace,
        reference: ReferenceState {
            theta0,
            beta0,
            n_exp_nom: None,
        },
        eval_opts,
        npoi,
    };

    let subproblem = Steihaug::new();
    let solver = TrustRegion::new(subproblem);

    let res = Executor::new(make_problem(), solver)
        .configure(|state| state.param(x0).max_iters(max_iters))
        .run()
        .map_err(|e| crate::error::FitError::Unsupported(format!("minimizer failed: {e}")))?;

    let state = res.state();
    let x = state
        .get_best_param()
        .cloned()
        .ok_or_else(|| crate::error::FitError::Unsupported("minimizer produced no parameter".into()))?;
    let value = state.get_best_cost();
    let iterations = state.get_iter();

    // Recompute the evaluation at the reported minimum for the gradient
    // and Hessian the executor does not hand back directly.
    let eval = make_problem().evaluate(&x);
    let gradient = eval.gradient.clone();
    let hessian = eval.hessian();
    let edm = expected_distance_to_minimum(&gradient, &hessian)?;

    Ok(MinimizerResult {
        x,
        value,
        gradient,
        edm,
        iterations,
    })
}

/// `½ gᵀ H⁻¹ g`. The Cholesky factorization both certifies positive-
/// definiteness (`spec.md` §7 [`crate::error::FitError::NotPositiveDefinite`])
/// and is cheap to discard in favor of a direct solve for `H⁻¹ g`.
fn expected_distance_to_minimum(
    gradient: &Array1<f64>,
    hessian: &Array2<f64>,
) -> Result<f64, crate::error::FitError> {
    use ndarray_linalg::{Cholesky, Solve, UPLO};

    hessian.cholesky(UPLO::Lower).map_err(|_| {
        crate::error::FitError::NotPositiveDefinite(
            "Hessian is not positive definite at the reported minimum".into(),
        )
    })?;
    let y = hessian.solve(gradient).map_err(|_| {
        crate::error::FitError::NotPositiveDefinite(
            "Hessian is singular at the reported minimum".into(),
        )
    })?;
    Ok(0.5 * gradient.dot(&y))
}
