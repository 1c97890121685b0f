#[path = "fixtures/mod.rs"]
mod fixtures;

#[cfg(test)]
mod fitter {
    use approx::assert_relative_eq;
    use binfit::prelude::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    use super::fixtures;

    #[test]
    fn fit_converges_near_truth_when_data_matches_nominal() {
        let workspace = fixtures::poisson();
        let mut fit = Fitter::new(workspace);

        let result = fit.fit(100).unwrap();
        assert!(result.gradient.iter().all(|g| g.abs() < 1e-3));

        // data_obs was built as BACKGROUND + SIGNAL at (mu=1, theta=0),
        // so that's where the Poisson fit should land.
        assert_relative_eq!(fit.state().x[0], 1.0, max_relative = 1e-2);
        for &theta in fit.state().x.slice(ndarray::s![1..]).iter() {
            assert_relative_eq!(theta, 0.0, epsilon = 1e-2);
        }
    }

    #[test]
    fn chi_square_matches_twice_the_nll_gap_to_saturated() {
        let workspace = fixtures::poisson();
        let mut fit = Fitter::new(workspace);
        fit.fit(100).unwrap();

        let chi2 = fit.chi_square();
        assert!(chi2 >= 0.0);
        assert!(chi2 < 1e-2, "converged fit on matching data should be ~0, got {chi2}");
    }

    #[test]
    fn ndf_accounts_for_poi_and_unconstrained_nuisances() {
        let workspace = fixtures::poisson();
        let fit = Fitter::new(workspace);
        // 4 bins - 1 poi - 1 unconstrained (lumi) - 0 (no normalize) == 2.
        assert_eq!(fit.ndf(), 2);
    }

    #[test]
    fn impacts_after_fit_has_expected_shape() {
        let workspace = fixtures::poisson();
        let mut fit = Fitter::new(workspace);
        fit.fit(100).unwrap();
        let report = fit.impacts().unwrap();
        // 1 POI row plus 1 NOI row ("lumi" is flagged `noi`).
        assert_eq!(report.per_nuisance.nrows(), 2);
    }

    #[test]
    fn randomize_toy_resets_x_but_keeps_theta0_and_refits() {
        let workspace = fixtures::poisson();
        let mut fit = Fitter::new(workspace);
        fit.fit(100).unwrap();

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1234);
        fit.randomize_toy(&mut rng, false, false).unwrap();

        // x is reset to the default starting point, not the prior best fit.
        assert_relative_eq!(fit.state().x[0], 1.0);
        assert!(fit.state().cov.is_none());

        // Re-fitting after randomization should still converge.
        let result = fit.fit(100).unwrap();
        assert!(result.gradient.iter().all(|g| g.abs() < 1e-2));
    }

    #[test]
    fn bayesian_toys_reject_explicit_pois() {
        let workspace = fixtures::poisson();
        let mut fit = Fitter::new(workspace);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        // This fixture has npoi == 1, so Bayesian randomization must fail.
        assert!(fit.randomize_toy(&mut rng, true, false).is_err());
    }
}
