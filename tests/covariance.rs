#[path = "fixtures/mod.rs"]
mod fixtures;

#[cfg(test)]
mod covariance {
    use approx::assert_relative_eq;
    use binfit::covariance;
    use binfit::expectation::{EvalOptions, Params};
    use binfit::likelihood::{self, ReferenceState};
    use ndarray::{array, Array1};

    use super::fixtures;

    #[test]
    fn invert_round_trips_through_hessian() {
        let workspace = fixtures::poisson();
        let x_poi = array![1.0];
        let theta = array![0.0, 0.0];
        let theta0 = array![0.0, 0.0];
        let beta0 = Array1::ones(4);
        let params = Params::new(x_poi.view(), theta.view());
        let reference = ReferenceState {
            theta0: theta0.view(),
            beta0: beta0.view(),
            n_exp_nom: None,
        };
        let eval_opts = EvalOptions {
            allow_negative_poi: false,
            profile_bbb: false,
            stop_gradient_bbb: false,
            normalize: false,
            exponential_transform_scale: None,
        };
        let eval = likelihood::evaluate(&workspace, params, &reference, &eval_opts);
        let hessian = eval.hessian();
        let sigma = covariance::invert(&hessian).expect("fixture Hessian is positive definite");

        let identity = hessian.dot(&sigma);
        let n = identity.nrows();
        for i in 0..n {
            for j in 0..n {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(identity[[i, j]], expected, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn prefit_diag_uses_placeholder_for_unconstrained_nuisance() {
        let workspace = fixtures::poisson();
        let diag = covariance::prefit_diag(&workspace, 10.0);

        // npoi=1, then bkgNorm (weight=1 -> 1/1) and lumi (unconstrained
        // -> placeholder).
        assert_relative_eq!(diag[0], 0.0);
        assert_relative_eq!(diag[1], 1.0);
        assert_relative_eq!(diag[2], 10.0);
    }

    #[test]
    fn leading_block_inverse_matches_full_inverse_subblock() {
        let workspace = fixtures::poisson();
        let x_poi = array![1.0];
        let theta = array![0.0, 0.0];
        let theta0 = array![0.0, 0.0];
        let beta0 = Array1::ones(4);
        let params = Params::new(x_poi.view(), theta.view());
        let reference = ReferenceState {
            theta0: theta0.view(),
            beta0: beta0.view(),
            n_exp_nom: None,
        };
        let eval_opts = EvalOptions {
            allow_negative_poi: false,
            profile_bbb: false,
            stop_gradient_bbb: false,
            normalize: false,
            exponential_transform_scale: None,
        };
        let eval = likelihood::evaluate(&workspace, params, &reference, &eval_opts);
        let hessian = eval.hessian();

        // With only one POI and one unconstrained nuisance, n_stat == 2
        // happens to be the full parameter count here, so the leading
        // block inverse must equal the full inverse exactly.
        let full = covariance::invert(&hessian).unwrap();
        let leading = covariance::leading_block_inverse(&hessian, hessian.nrows()).unwrap();
        for i in 0..full.nrows() {
            for j in 0..full.ncols() {
                assert_relative_eq!(full[[i, j]], leading[[i, j]], epsilon = 1e-8);
            }
        }
    }
}
