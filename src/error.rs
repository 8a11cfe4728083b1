//! Errors raised while inverting a transform.
//!
//! Failing to converge is *not* an error: the solver reports it through
//! [`Termination`](crate::Termination). The variants here cover broken
//! preconditions and numeric degeneracy, both of which leave no usable
//! estimate behind.

use thiserror::Error;

/// Reasons an inversion call could not produce an estimate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InverseError {
    /// A coordinate vector or matrix does not match the transform's dimensionality.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The transform does not map a space onto a space of the same dimension.
    #[error("transform is not square: {source_dims} source and {target_dims} target dimensions")]
    NotSquare {
        source_dims: usize,
        target_dims: usize,
    },

    /// The Jacobian at the current estimate has no inverse.
    #[error("singular Jacobian")]
    SingularJacobian,

    /// The descent direction has zero, near-zero or non-finite magnitude.
    #[error("degenerate descent direction")]
    DegenerateDirection,

    /// The forward transform produced `NaN` or `$\pm\infty$`.
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),

    /// An exact Jacobian was requested but the transform cannot provide one.
    #[error("transform does not provide an exact Jacobian")]
    MissingJacobian,

    /// Displacement-driven inversion was requested for a transform without a field.
    #[error("transform does not provide displacement vectors")]
    MissingDisplacement,

    /// Only returned by the `*_converged` helpers which treat a best-effort
    /// estimate as a failure.
    #[error("inversion did not converge: residual {residual} after {iterations} iterations")]
    NotConverged { residual: f64, iterations: usize },
}

/// Result type for inversion operations.
pub type Result<T> = core::result::Result<T, InverseError>;

impl InverseError {
    pub(crate) fn check_len(expected: usize, actual: usize) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::DimensionMismatch { expected, actual })
        }
    }
}
