//! Error types for the exuvia-kernel crate.
//!
//! Every numerical entry point validates its input up front and returns a
//! typed error rather than panicking or silently truncating.

/// Errors that can occur while encoding, comparing or embedding feature vectors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KernelError {
    /// The feature vector has more entries than there are simulated units.
    #[error("input too large: {len} features exceed the cap of {cap} simulated units")]
    InputTooLarge {
        /// Length of the rejected input.
        len: usize,
        /// Configured simulated-unit cap.
        cap: usize,
    },

    /// A parameter is out of its valid range.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Description of the offending parameter.
        reason: String,
    },

    /// Two vectors that must share a dimension do not.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimension required by the operation.
        expected: usize,
        /// The dimension that was supplied.
        actual: usize,
    },

    /// A feature was NaN or infinite.
    #[error("non-finite feature at index {index}")]
    NonFiniteInput {
        /// Position of the first non-finite value.
        index: usize,
    },
}

impl KernelError {
    /// Shorthand for [`KernelError::InvalidConfiguration`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}

/// Reject vectors containing NaN or infinities.
///
/// # Errors
///
/// Returns [`KernelError::NonFiniteInput`] naming the first bad index.
pub fn ensure_finite(features: &[f64]) -> Result<(), KernelError> {
    features
        .iter()
        .position(|x| !x.is_finite())
        .map_or(Ok(()), |index| Err(KernelError::NonFiniteInput { index }))
}

/// Reject vectors whose length differs from `expected`.
///
/// # Errors
///
/// Returns [`KernelError::DimensionMismatch`] on any difference.
pub const fn ensure_dimension(expected: usize, actual: usize) -> Result<(), KernelError> {
    if expected == actual {
        Ok(())
    } else {
        Err(KernelError::DimensionMismatch { expected, actual })
    }
}
