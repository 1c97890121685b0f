//! Shared fixture builder for integration tests: a minimal one-channel,
//! two-process, two-nuisance workspace, small enough to reason about by
//! hand. Not itself a test binary (`tests/fixtures/mod.rs`, not
//! `tests/fixtures.rs`), so cargo doesn't try to run it standalone.

use binfit::prelude::*;
use binfit::workspace::{LogKTensor, NormEntry, NormTensor, ResponseKind};
use ndarray::{array, Array1, Array2, Array3};

/// Background yields per bin, at `theta = 0`.
pub const BACKGROUND: [f64; 4] = [50.0, 40.0, 30.0, 20.0];
/// Signal yields per bin at `mu = 1`, `theta = 0`.
pub const SIGNAL: [f64; 4] = [5.0, 8.0, 10.0, 12.0];
/// `data_obs` exactly at `BACKGROUND + SIGNAL`, so a fit from the default
/// starting point begins at (or very near) the minimum.
pub const DATA_OBS: [f64; 4] = [55.0, 48.0, 40.0, 32.0];

fn channels() -> Vec<Channel> {
    vec![Channel {
        name: "signal_region".into(),
        axes: vec![ChannelAxis {
            name: "x".into(),
            edges: vec![0.0, 1.0, 2.0, 3.0, 4.0],
        }],
        start: 0,
        stop: 4,
        lumi: None,
        masked: false,
    }]
}

fn processes() -> Vec<Process> {
    vec![Process::background("background"), Process::signal("signal", 0)]
}

fn nuisances() -> Vec<Nuisance> {
    vec![
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
    ]
}

fn groups() -> Groups {
    Groups::from_members(vec![
        ("bkgNorm".into(), vec![0]),
        ("lumi".into(), vec![1]),
    ])
}

fn norm() -> NormTensor {
    let mut a = Array2::zeros((4, 2));
    for b in 0..4 {
        a[[b, 0]] = BACKGROUND[b];
        a[[b, 1]] = SIGNAL[b];
    }
    NormTensor::Dense(a)
}

fn logk() -> LogKTensor {
    // bkgNorm (index 0) scales the background process by 10% per unit
    // theta; lumi (index 1) scales the signal process by 5%.
    let mut a = Array3::zeros((4, 2, 2));
    for b in 0..4 {
        a[[b, 0, 0]] = 0.10;
        a[[b, 1, 1]] = 0.05;
    }
    LogKTensor::DenseSymmetric(a)
}

/// Confirms [`NormTensor::Sparse`]/[`LogKTensor`] entry types round-trip
/// through [`NormTensor::to_dense`] the same as the dense constructors
/// above (used by [`sparse_norm_matches_dense`]).
pub fn sparse_norm() -> NormTensor {
    let mut entries = Vec::new();
    for b in 0..4 {
        entries.push(NormEntry {
            bin: b as u32,
            proc: 0,
            value: BACKGROUND[b],
        });
        entries.push(NormEntry {
            bin: b as u32,
            proc: 1,
            value: SIGNAL[b],
        });
    }
    NormTensor::Sparse {
        nbins: 4,
        nproc: 2,
        entries,
    }
}

fn data_obs() -> Array1<f64> {
    array![DATA_OBS[0], DATA_OBS[1], DATA_OBS[2], DATA_OBS[3]]
}

/// Builds the fixture workspace under the given driver options, adding
/// `kstat`/`data_cov_inv` automatically when `options` calls for them.
pub fn build(options: FitterOptions) -> Workspace {
    let kstat = options
        .bin_by_bin_stat
        .then(|| Array1::from(vec![100.0, 100.0, 100.0, 100.0]));
    let data_cov_inv = options.external_covariance.then(|| {
        let mut cov_inv = Array2::zeros((4, 4));
        for (b, &y) in DATA_OBS.iter().enumerate() {
            cov_inv[[b, b]] = 1.0 / y;
        }
        cov_inv
    });

    Workspace::new(
        1,
        channels(),
        processes(),
        nuisances(),
        groups(),
        norm(),
        logk(),
        data_obs(),
        data_cov_inv,
        kstat,
        options,
    )
    .expect("fixture workspace is internally consistent")
}

/// The Poisson-likelihood default fixture.
pub fn poisson() -> Workspace {
    build(FitterOptions::default())
}
