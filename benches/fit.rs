pub mod converge {
    use binfit::prelude::*;
    use criterion::{black_box, Criterion};

    use crate::fixtures;

    pub fn trust_region(c: &mut Criterion) {
        c.bench_function("fitter::fit::trust_region", |b| {
            b.iter(|| {
                let mut fit = Fitter::new(fixtures::workspace());
                let value = fit.fit(100).expect("fixture workspace converges").value;
                black_box(value)
            })
        });
    }
}
