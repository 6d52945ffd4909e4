//! Manifold Navigator.
//!
//! Projects an embedding onto the three fixed anchors. Each step scores the
//! current point against every anchor with the kernel estimator, turns the
//! scores into a probability distribution with a softmax, and moves the
//! point to the anchor-weighted blend. The step count and the anchor set are
//! fixed so distributions are comparable across entities.

use exuvia_types::{Anchor, AnchorDistribution};
use tracing::debug;

use crate::error::KernelError;
use crate::kernel::KernelEstimator;

/// Default number of navigation steps.
pub const DEFAULT_STEPS: usize = 3;

/// Result of navigating an embedding across the anchor manifold.
#[derive(Debug, Clone, PartialEq)]
pub struct Navigation {
    /// Distribution produced by the final step.
    pub distribution: AnchorDistribution,
    /// The anchor-weighted blend after the final step.
    pub endpoint: Vec<f64>,
}

/// Numerically stable softmax over three scores.
pub fn softmax(scores: [f64; 3]) -> [f64; 3] {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps = scores.map(|s| (s - max).exp());
    let total: f64 = exps.iter().sum();
    exps.map(|e| e / total)
}

/// Navigate `embedding` for `steps` iterations.
///
/// # Errors
///
/// - [`KernelError::InvalidConfiguration`] if `steps` is zero
/// - any error from [`KernelEstimator::kernel`] on the embedding
pub fn navigate(
    estimator: &KernelEstimator,
    embedding: &[f64],
    steps: usize,
) -> Result<Navigation, KernelError> {
    if steps == 0 {
        return Err(KernelError::invalid("navigation needs at least one step"));
    }

    let dimension = embedding.len();
    let anchors = Anchor::ALL.map(|anchor| anchor.vector(dimension));
    let mut point = embedding.to_vec();
    let mut weights = [0.0; 3];

    for step in 0..steps {
        let mut scores = [0.0; 3];
        for (score, anchor) in scores.iter_mut().zip(&anchors) {
            *score = estimator.kernel(&point, anchor)?;
        }
        weights = softmax(scores);

        // Anchors are constant vectors, so the blend is constant too.
        let level: f64 = weights
            .iter()
            .zip(Anchor::ALL)
            .map(|(w, anchor)| w * anchor.level())
            .sum();
        point = vec![level; dimension];

        debug!(step, ?scores, ?weights, level, "navigation step");
    }

    Ok(Navigation {
        distribution: AnchorDistribution::from_weights(weights),
        endpoint: point,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn softmax_sums_to_one() {
        let p = softmax([0.1, 0.9, 0.4]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(p[1] > p[2] && p[2] > p[0]);
    }

    #[test]
    fn softmax_of_equal_scores_is_uniform() {
        let p = softmax([0.3, 0.3, 0.3]);
        for w in p {
            assert!((w - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn equilibrium_is_a_symmetric_fixed_point() {
        let estimator = KernelEstimator::default();
        let nav = navigate(&estimator, &Anchor::Equilibrium.vector(10), DEFAULT_STEPS).unwrap();
        assert_eq!(nav.distribution.dominant(), Anchor::Equilibrium);
        assert!((nav.distribution.zero - nav.distribution.unity).abs() < 1e-12);
        for x in &nav.endpoint {
            assert!((x - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn embedding_near_unity_leans_toward_unity() {
        let estimator = KernelEstimator::default();
        let nav = navigate(&estimator, &[0.95; 6], 1).unwrap();
        assert!(nav.distribution.unity > nav.distribution.zero);
    }

    #[test]
    fn distribution_is_normalized() {
        let estimator = KernelEstimator::default();
        let nav = navigate(&estimator, &[0.1, 0.7, 0.3, 0.9], DEFAULT_STEPS).unwrap();
        let total: f64 = nav.distribution.weights().iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert_eq!(nav.endpoint.len(), 4);
    }

    #[test]
    fn zero_steps_is_rejected() {
        let estimator = KernelEstimator::default();
        assert!(navigate(&estimator, &[0.5], 0).is_err());
    }

    #[test]
    fn oversized_embedding_is_rejected() {
        let estimator = KernelEstimator::default();
        assert!(matches!(
            navigate(&estimator, &[0.5; 11], 1),
            Err(KernelError::InputTooLarge { .. })
        ));
    }
}
