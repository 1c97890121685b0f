pub mod evaluate {
    use binfit::expectation::{EvalOptions, Params};
    use binfit::likelihood::{self, ReferenceState};
    use criterion::{black_box, Criterion};
    use ndarray::{array, Array1};

    use crate::fixtures;

    pub fn nll_and_hessian(c: &mut Criterion) {
        let workspace = fixtures::workspace();
        let x_poi = array![1.0];
        let theta = array![0.0, 0.0];
        let theta0 = array![0.0, 0.0];
        let beta0 = Array1::ones(4);
        let eval_opts = EvalOptions {
            allow_negative_poi: false,
            profile_bbb: false,
            stop_gradient_bbb: false,
            normalize: false,
            exponential_transform_scale: None,
        };

        c.bench_function("likelihood::evaluate::value_gradient", |b| {
            b.iter(|| {
                let params = Params::new(x_poi.view(), theta.view());
                let reference = ReferenceState {
                    theta0: theta0.view(),
                    beta0: beta0.view(),
                    n_exp_nom: None,
                };
                black_box(likelihood::evaluate(
                    black_box(&workspace),
                    params,
                    &reference,
                    &eval_opts,
                ))
            })
        });

        c.bench_function("likelihood::evaluate::hessian", |b| {
            b.iter(|| {
                let params = Params::new(x_poi.view(), theta.view());
                let reference = ReferenceState {
                    theta0: theta0.view(),
                    beta0: beta0.view(),
                    n_exp_nom: None,
                };
                let eval = likelihood::evaluate(&workspace, params, &reference, &eval_opts);
                black_box(eval.hessian())
            })
        });
    }
}
