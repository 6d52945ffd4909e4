//! Sequence Embedder.
//!
//! Folds an ordered history of feature vectors into a single vector with
//! exponential recency decay: the most recent entry has weight `λ^0 = 1`,
//! the one before it `λ^1`, and so on. The weighted sum is divided by the
//! total weight, so the embedding of a constant history is that constant.

use crate::error::{KernelError, ensure_dimension, ensure_finite};

/// Default recency decay `λ`.
pub const DEFAULT_DECAY: f64 = 0.85;

/// Fold `history` (oldest first) into one embedding of length `dimension`.
///
/// An empty history yields the zero vector.
///
/// # Errors
///
/// - [`KernelError::InvalidConfiguration`] if `decay` is outside `(0, 1]`
/// - [`KernelError::DimensionMismatch`] if any entry is not `dimension` long
/// - [`KernelError::NonFiniteInput`] if any entry holds NaN or infinity
pub fn embed<V: AsRef<[f64]>>(
    history: &[V],
    decay: f64,
    dimension: usize,
) -> Result<Vec<f64>, KernelError> {
    validate_decay(decay)?;

    let mut sum = vec![0.0; dimension];
    let mut total_weight = 0.0;
    let mut weight = 1.0;

    for entry in history.iter().rev() {
        let entry = entry.as_ref();
        ensure_dimension(dimension, entry.len())?;
        ensure_finite(entry)?;
        for (acc, &x) in sum.iter_mut().zip(entry) {
            *acc += weight * x;
        }
        total_weight += weight;
        weight *= decay;
    }

    if total_weight > 0.0 {
        for acc in &mut sum {
            *acc /= total_weight;
        }
    }
    Ok(sum)
}

/// Embedder bound to a decay and a dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequenceEmbedder {
    decay: f64,
    dimension: usize,
}

impl SequenceEmbedder {
    /// Create an embedder.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::InvalidConfiguration`] if `decay` is outside `(0, 1]`.
    pub fn new(decay: f64, dimension: usize) -> Result<Self, KernelError> {
        validate_decay(decay)?;
        Ok(Self { decay, dimension })
    }

    /// Configured decay.
    pub const fn decay(&self) -> f64 {
        self.decay
    }

    /// Configured dimension.
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed a history (oldest first).
    ///
    /// # Errors
    ///
    /// See [`embed`].
    pub fn embed<V: AsRef<[f64]>>(&self, history: &[V]) -> Result<Vec<f64>, KernelError> {
        embed(history, self.decay, self.dimension)
    }
}

fn validate_decay(decay: f64) -> Result<(), KernelError> {
    if decay.is_finite() && decay > 0.0 && decay <= 1.0 {
        Ok(())
    } else {
        Err(KernelError::invalid(format!("decay {decay} must lie in (0, 1]")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_is_zero_vector() {
        let history: Vec<Vec<f64>> = Vec::new();
        assert_eq!(embed(&history, DEFAULT_DECAY, 3).unwrap(), vec![0.0; 3]);
    }

    #[test]
    fn single_entry_is_returned_unchanged() {
        let v = vec![0.125, -3.5, 7.0];
        assert_eq!(embed(std::slice::from_ref(&v), DEFAULT_DECAY, 3).unwrap(), v);
    }

    #[test]
    fn most_recent_entry_weighs_most() {
        let history = vec![vec![0.0], vec![1.0]];
        let e = embed(&history, DEFAULT_DECAY, 1).unwrap();
        // (1·1 + 0.85·0) / 1.85
        let expected = 1.0 / 1.85;
        assert!((e.first().copied().unwrap_or_default() - expected).abs() < 1e-12);
    }

    #[test]
    fn constant_history_embeds_to_constant() {
        let history = vec![vec![0.4, 0.6]; 20];
        let e = embed(&history, DEFAULT_DECAY, 2).unwrap();
        assert!((e[0] - 0.4).abs() < 1e-12);
        assert!((e[1] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn ragged_history_is_rejected() {
        let history = vec![vec![0.1, 0.2], vec![0.3]];
        assert_eq!(
            embed(&history, DEFAULT_DECAY, 2),
            Err(KernelError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn decay_out_of_range_is_rejected() {
        assert!(SequenceEmbedder::new(0.0, 2).is_err());
        assert!(SequenceEmbedder::new(1.5, 2).is_err());
        assert!(SequenceEmbedder::new(f64::NAN, 2).is_err());
        assert!(SequenceEmbedder::new(1.0, 2).is_ok());
    }
}
