use criterion::{criterion_group, criterion_main};

mod fit;
mod fixtures;
mod likelihood;

criterion_group!(
    benches,
    likelihood::evaluate::nll_and_hessian,
    fit::converge::trust_region
);

criterion_main!(benches);
