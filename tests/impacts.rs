#[path = "fixtures/mod.rs"]
mod fixtures;

#[cfg(test)]
mod impacts {
    use binfit::covariance;
    use binfit::expectation::{EvalOptions, Params};
    use binfit::impacts::{self, ImpactInputs};
    use binfit::likelihood::{self, ReferenceState};
    use ndarray::{array, Array1};

    use super::fixtures;

    fn eval_opts() -> EvalOptions {
        EvalOptions {
            allow_negative_poi: false,
            profile_bbb: false,
            stop_gradient_bbb: false,
            normalize: false,
            exponential_transform_scale: None,
        }
    }

    #[test]
    fn report_has_one_row_per_poi_and_noi_and_one_column_per_group_plus_stat() {
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
        let eval = likelihood::evaluate(&workspace, params, &reference, &eval_opts());
        let hessian = eval.hessian();
        let sigma = covariance::invert(&hessian).unwrap();
        let sensitivities =
            covariance::sensitivities(&workspace, &eval.expectation, &sigma, beta0.view());

        let inputs = ImpactInputs {
            hessian: &hessian,
            sigma: &sigma,
            sensitivities: &sensitivities,
            hessian_bbb_frozen: None,
        };
        let report = impacts::report(&workspace, &inputs).unwrap();

        // 1 POI row plus 1 NOI row ("lumi" is flagged `noi`).
        assert_eq!(report.per_nuisance.nrows(), 2);
        assert_eq!(report.per_nuisance.ncols(), workspace.nsyst());
        // 2 groups + stat column (no BBB in this fixture).
        assert_eq!(report.grouped.ncols(), workspace.groups().len() + 1);
        assert_eq!(report.grouped_global.ncols(), workspace.groups().len() + 1);
    }

    #[test]
    fn unconstrained_nuisance_has_zero_global_impact() {
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
        let eval = likelihood::evaluate(&workspace, params, &reference, &eval_opts());
        let hessian = eval.hessian();
        let sigma = covariance::invert(&hessian).unwrap();
        let sensitivities =
            covariance::sensitivities(&workspace, &eval.expectation, &sigma, beta0.view());

        let inputs = ImpactInputs {
            hessian: &hessian,
            sigma: &sigma,
            sensitivities: &sensitivities,
            hessian_bbb_frozen: None,
        };
        let report = impacts::report(&workspace, &inputs).unwrap();

        // "lumi" (index 1) is unconstrained; the global impact formula is
        // defined to be zero for it regardless of the fit.
        assert_eq!(report.per_nuisance_global[[0, 1]], 0.0);
    }
}
