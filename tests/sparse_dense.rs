#[path = "fixtures/mod.rs"]
mod fixtures;

#[cfg(test)]
mod sparse_dense {
    use approx::assert_relative_eq;
    use binfit::workspace::NormTensor;

    use super::fixtures;

    #[test]
    fn sparse_norm_matches_dense() {
        let dense = match fixtures::build(Default::default()).norm() {
            NormTensor::Dense(a) => a.clone(),
            NormTensor::Sparse { .. } => panic!("fixture builds a dense tensor"),
        };
        let sparse = fixtures::sparse_norm().to_dense();

        assert_eq!(dense.shape(), sparse.shape());
        for (a, b) in dense.iter().zip(sparse.iter()) {
            assert_relative_eq!(a, b, max_relative = 1e-12);
        }
    }
}
