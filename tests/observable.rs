#[path = "fixtures/mod.rs"]
mod fixtures;

#[cfg(test)]
mod observable {
    use approx::assert_relative_eq;
    use binfit::covariance;
    use binfit::expectation::{EvalOptions, Params};
    use binfit::likelihood::{self, ReferenceState};
    use binfit::observable::{self, ObservableJacobians};
    use ndarray::{array, Array1, Array2};

    use super::fixtures;

    #[test]
    fn non_profile_covariance_of_x_itself_matches_sigma() {
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
        let sigma = covariance::invert(&hessian).unwrap();

        let nparm = sigma.nrows();
        let jac = ObservableJacobians {
            df_dx: Array2::eye(nparm),
            df_dtheta0: Array2::zeros((nparm, theta0.len())),
            df_dnobs: Array2::zeros((nparm, workspace.nbins())),
            df_dbeta0: Array2::zeros((nparm, workspace.nbins())),
        };
        // f(x) = x itself has no direct n_obs/beta0 dependence, so only
        // the J_x * Sigma * J_x^T term should contribute; with J_x == I
        // that must reproduce Sigma exactly.
        let cov = observable::non_profile_covariance(&jac, &sigma, workspace.data_obs().view(), None);
        for i in 0..nparm {
            for j in 0..nparm {
                assert_relative_eq!(cov[[i, j]], sigma[[i, j]], epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn ndf_subtracts_one_when_normalized() {
        assert_eq!(observable::ndf(5, false), 5);
        assert_eq!(observable::ndf(5, true), 4);
    }

    #[test]
    fn chi_square_of_zero_residual_is_zero() {
        let cov = array![[2.0, 0.0], [0.0, 3.0]];
        let residual = array![0.0, 0.0];
        let chi2 = observable::chi_square(residual.view(), &cov).unwrap();
        assert_relative_eq!(chi2, 0.0);
    }
}
