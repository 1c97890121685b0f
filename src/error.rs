use thiserror::Error;

/// Fitter error enumerator.
///
/// Every variant is recoverable by the caller: construction errors abort
/// before any state is mutated, evaluation errors propagate out of a
/// single fit (or mark a single toy iteration failed), none is a panic.
#[derive(Debug, Error)]
pub enum FitError {
    /// Two or more options were requested that cannot hold simultaneously.
    #[error("configuration conflict: {0}")]
    ConfigConflict(String),

    /// The data or template tensors violate a data-model invariant.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A Cholesky factorization of the Hessian (or a sub-block used for
    /// impacts) failed because the matrix is not positive definite.
    #[error("matrix is not positive definite: {0}")]
    NotPositiveDefinite(String),

    /// A requested channel axis does not exist.
    #[error("projection error: axis {axis:?} not found in channel {channel:?}")]
    ProjectionError {
        /// Channel the projection was requested on.
        channel: String,
        /// Axis name that could not be resolved.
        axis: String,
    },

    /// A combination of modes that is individually valid but jointly
    /// unsupported was requested.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Convenience alias for fallible fitter operations.
pub type Result<T> = std::result::Result<T, FitError>;
