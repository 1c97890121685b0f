#![warn(missing_docs)]

//! A binned maximum-likelihood / chi-square fitter for multi-channel
//! template analyses.
//!
//! The crate is organized leaves-first, mirroring the data flow described
//! by the workspace: an immutable [`workspace`] is consumed by the
//! [`expectation`] engine, which feeds the [`likelihood`], which is
//! minimized by [`minimizer`]. After convergence, [`covariance`] derives
//! the post-fit covariance and parameter sensitivities, which in turn feed
//! [`impacts`] and [`observable`] (composed with [`projector`]).
//! [`toys`] randomizes the workspace state and restarts the loop. The
//! [`fitter`] module ties all of the above into a single owned pipeline.

/// Error kinds shared by every fallible boundary in the crate.
pub mod error;

/// Crate-wide configuration (`FitterOptions`) and small shared types.
pub mod config;

/// Immutable input model: channels, processes, nuisances, templates.
pub mod workspace;

/// Parameter vector to per-bin expected yield, with Jacobian/curvature.
pub mod expectation;

/// Negative log-likelihood, gradient, Hessian, Hessian-vector products.
pub mod likelihood;

/// Trust-region Newton-Krylov minimizer driver.
pub mod minimizer;

/// Post-fit covariance and implicit-function-theorem sensitivities.
pub mod covariance;

/// Per-parameter / per-group / stat / BBB impact decompositions.
pub mod impacts;

/// Arbitrary derived-observable value, variance, covariance, variations.
pub mod observable;

/// Channel-axis selection / reduction / transposition.
pub mod projector;

/// Bayesian / frequentist / bootstrap randomization of fitter state.
pub mod toys;

/// Serde-derived input/output artifact shapes (external I/O contract).
pub mod artifact;

/// Owned end-to-end pipeline: workspace + mutable fit state.
pub mod fitter;

/// Frequently used items.
pub mod prelude;
