//! Minimal workspace shared by the benchmarks in this directory. Kept
//! separate from `tests/fixtures` since benches and tests are distinct
//! compilation units with no path between them.

use binfit::prelude::*;
use binfit::workspace::{LogKTensor, NormTensor, ResponseKind};
use ndarray::{array, Array2, Array3};

pub fn workspace() -> Workspace {
    let channels = vec![Channel {
        name: "signal_region".into(),
        axes: vec![ChannelAxis {
            name: "x".into(),
            edges: (0..=4).map(|i| i as f64).collect(),
        }],
        start: 0,
        stop: 4,
        lumi: None,
        masked: false,
    }];
    let processes = vec![Process::background("background"), Process::signal("signal", 0)];
    let nuisances = vec![
        Nuisance {
            name: "bkgNorm".into(),
            constraint_weight: 1.0,
            group: Some(0),
            noi: false,
            response: ResponseKind::Symmetric,
        },
        Nuisance {
            name: "lumi".into(),
            constraint_weight: 0.0,
            group: Some(1),
            noi: true,
            response: ResponseKind::Symmetric,
        },
    ];
    let groups = Groups::from_members(vec![("bkgNorm".into(), vec![0]), ("lumi".into(), vec![1])]);

    let mut norm = Array2::zeros((4, 2));
    let background = [50.0, 40.0, 30.0, 20.0];
    let signal = [5.0, 8.0, 10.0, 12.0];
    for b in 0..4 {
        norm[[b, 0]] = background[b];
        norm[[b, 1]] = signal[b];
    }

    let mut logk = Array3::zeros((4, 2, 2));
    for b in 0..4 {
        logk[[b, 0, 0]] = 0.10;
        logk[[b, 1, 1]] = 0.05;
    }

    let data_obs = array![55.0, 48.0, 40.0, 32.0];

    Workspace::new(
        1,
        channels,
        processes,
        nuisances,
        groups,
        NormTensor::Dense(norm),
        LogKTensor::DenseSymmetric(logk),
        data_obs,
        None,
        None,
        FitterOptions::default(),
    )
    .expect("benchmark fixture workspace is internally consistent")
}
