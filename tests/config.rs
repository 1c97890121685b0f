#[path = "fixtures/mod.rs"]
mod fixtures;

#[cfg(test)]
mod config {
    use binfit::prelude::*;

    use super::fixtures;

    #[test]
    fn external_covariance_and_bin_by_bin_stat_conflict() {
        let options = FitterOptions {
            chisq_fit: true,
            external_covariance: true,
            bin_by_bin_stat: true,
            ..FitterOptions::default()
        };
        // `FitterOptions::validate` is checked eagerly by `Workspace::new`,
        // before kstat/data_cov_inv are even inspected.
        assert!(matches!(options.validate(), Err(FitError::ConfigConflict(_))));
    }

    #[test]
    fn external_covariance_without_chisq_fit_conflicts() {
        let options = FitterOptions {
            external_covariance: true,
            ..FitterOptions::default()
        };
        assert!(matches!(options.validate(), Err(FitError::ConfigConflict(_))));
    }

    #[test]
    fn chisq_fit_with_external_covariance_builds_successfully() {
        let options = FitterOptions {
            chisq_fit: true,
            external_covariance: true,
            ..FitterOptions::default()
        };
        let workspace = fixtures::build(options);
        assert!(workspace.data_cov_inv().is_some());
    }
}
