#[path = "fixtures/mod.rs"]
mod fixtures;

#[cfg(test)]
mod projector {
    use approx::assert_relative_eq;
    use binfit::projector::Projector;

    use super::fixtures;

    #[test]
    fn keeping_the_only_axis_is_the_identity() {
        let workspace = fixtures::poisson();
        let values = fixtures::DATA_OBS.to_vec();

        let projector = Projector::new("signal_region", vec!["x"]);
        let projected = projector.project(&workspace, &values, |v| v).unwrap();

        assert_eq!(projected.shape(), &[4]);
        for (i, &expected) in fixtures::DATA_OBS.iter().enumerate() {
            assert_relative_eq!(projected[[i]], expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn dropping_the_only_axis_sums_everything() {
        let workspace = fixtures::poisson();
        let values = fixtures::DATA_OBS.to_vec();

        let projector = Projector::new("signal_region", vec![]);
        let projected = projector.project(&workspace, &values, |v| v).unwrap();

        let total: f64 = fixtures::DATA_OBS.iter().sum();
        assert_eq!(projected.len(), 1);
        assert_relative_eq!(projected.iter().next().copied().unwrap(), total, epsilon = 1e-12);
    }

    #[test]
    fn unknown_channel_is_a_projection_error() {
        let workspace = fixtures::poisson();
        let values = fixtures::DATA_OBS.to_vec();
        let projector = Projector::new("does_not_exist", vec!["x"]);
        assert!(projector.project(&workspace, &values, |v| v).is_err());
    }
}
