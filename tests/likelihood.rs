#[path = "fixtures/mod.rs"]
mod fixtures;

#[cfg(test)]
mod likelihood {
    use approx::assert_relative_eq;
    use binfit::expectation::{EvalOptions, Params};
    use binfit::likelihood::{self, saturated, ReferenceState};
    use ndarray::{array, Array1};

    use super::fixtures;

    fn default_eval_opts() -> EvalOptions {
        EvalOptions {
            allow_negative_poi: false,
            profile_bbb: false,
            stop_gradient_bbb: false,
            normalize: false,
            exponential_transform_scale: None,
        }
    }

    #[test]
    fn saturated_nll_is_a_lower_bound() {
        let workspace = fixtures::poisson();
        let mask = workspace.likelihood_mask();
        let l_sat = saturated::value(workspace.data_obs().view(), &mask);

        let x_poi = array![1.2];
        let theta = array![0.3, -0.1];
        let theta0 = array![0.0, 0.0];
        let beta0 = Array1::ones(4);
        let params = Params::new(x_poi.view(), theta.view());
        let reference = ReferenceState {
            theta0: theta0.view(),
            beta0: beta0.view(),
            n_exp_nom: None,
        };
        let eval_opts = default_eval_opts();
        let eval = likelihood::evaluate(&workspace, params, &reference, &eval_opts);

        // Poisson NLL (ignoring the constant constraint term's minimum at
        // theta==theta0) is minimized exactly when n_exp == n_obs, i.e.
        // the saturated model; a displaced point must score worse.
        assert!(eval.value_full > l_sat);
    }

    #[test]
    fn constraint_term_vanishes_at_theta0() {
        let workspace = fixtures::poisson();
        let x_poi = array![1.0];
        let theta = array![0.0, 0.0];
        let beta0 = Array1::ones(4);
        let params = Params::new(x_poi.view(), theta.view());
        let reference = ReferenceState {
            theta0: theta.view(),
            beta0: beta0.view(),
            n_exp_nom: None,
        };
        let eval_opts = default_eval_opts();
        let eval = likelihood::evaluate(&workspace, params, &reference, &eval_opts);

        // data_obs was built to equal the nominal expectation at (mu=1,
        // theta=0), so only the (zero) constraint term should remain
        // beyond the saturated value.
        let l_sat = saturated::value(workspace.data_obs().view(), &workspace.likelihood_mask());
        assert_relative_eq!(eval.value_full, l_sat, max_relative = 1e-6);
    }

    #[test]
    fn hessian_is_symmetric() {
        let workspace = fixtures::poisson();
        let x_poi = array![1.05];
        let theta = array![0.1, -0.2];
        let theta0 = array![0.0, 0.0];
        let beta0 = Array1::ones(4);
        let params = Params::new(x_poi.view(), theta.view());
        let reference = ReferenceState {
            theta0: theta0.view(),
            beta0: beta0.view(),
            n_exp_nom: None,
        };
        let eval_opts = default_eval_opts();
        let eval = likelihood::evaluate(&workspace, params, &reference, &eval_opts);
        let h = eval.hessian();

        for i in 0..h.nrows() {
            for j in 0..h.ncols() {
                assert_relative_eq!(h[[i, j]], h[[j, i]], max_relative = 1e-8, epsilon = 1e-10);
            }
        }
    }
}
