#[path = "fixtures/mod.rs"]
mod fixtures;

#[cfg(test)]
mod toys {
    use binfit::toys;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    use super::fixtures;

    #[test]
    fn bootstrap_pseudodata_replaces_workspace_data_obs() {
        let workspace = fixtures::poisson();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let bootstrapped = toys::poisson_data(&mut rng, workspace.data_obs().view()).unwrap();

        let updated = workspace.with_pseudodata(bootstrapped.clone()).unwrap();
        for (a, b) in updated.data_obs().iter().zip(bootstrapped.iter()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn pseudodata_must_have_the_right_length() {
        let workspace = fixtures::poisson();
        let wrong_length = ndarray::Array1::ones(3);
        assert!(workspace.with_pseudodata(wrong_length).is_err());
    }
}
