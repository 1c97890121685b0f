/// Re-export error types.
pub use crate::error::{FitError, Result};
/// Re-export configuration.
pub use crate::config::{FitterOptions, PoiMode};
/// Re-export the input model.
pub use crate::workspace::{Channel, ChannelAxis, Groups, Nuisance, Process, Workspace};
/// Re-export the expectation engine.
pub use crate::expectation::{EvalOptions, Expectation, Params};
/// Re-export the likelihood engine.
pub use crate::likelihood::{evaluate as evaluate_likelihood, Evaluation, ReferenceState};
/// Re-export the minimizer.
pub use crate::minimizer::{minimize, MinimizerResult};
/// Re-export covariance and sensitivities.
pub use crate::covariance::Sensitivities;
/// Re-export impacts.
pub use crate::impacts::{ImpactInputs, ImpactReport};
/// Re-export observable propagation.
pub use crate::observable::{ObservableJacobians, ProfiledJacobians};
/// Re-export the projector.
pub use crate::projector::Projector;
/// Re-export the artifact I/O contract.
pub use crate::artifact::{FitMeta, FitResultArtifact, WorkspaceArtifact};
/// Re-export the owned end-to-end pipeline.
pub use crate::fitter::{Fitter, FitterState};
