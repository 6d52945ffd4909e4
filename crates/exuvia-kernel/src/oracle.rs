//! Retrocausal Fixed-Point Oracle.
//!
//! A bounded-iteration heuristic search for a self-consistent state: a
//! feature vector whose encoding is (almost) unchanged by one application of
//! the self-referential map
//!
//! ```text
//! T(x)_i = (x_i + mean(x)) / 2
//! ```
//!
//! which pulls every coordinate halfway toward the vector's own mean.
//!
//! The oracle keeps a small candidate space seeded with the initial state and
//! its successive images under `T`. Each iteration advances every candidate
//! by `T`, scores it by the kernel similarity against its previous iterate,
//! and runs one Grover-style amplitude update: candidates scoring above the
//! mean have their amplitude phase-flipped, then every amplitude is inverted
//! about the mean. The most probable candidate is the current answer, and
//! the search stops when its similarity moves by less than the tolerance.
//!
//! The search is total. If the iteration budget runs out it returns the
//! best candidate seen, flagged as not converged. Nothing stronger than the
//! bounded-iteration guarantee is claimed.

use tracing::{debug, warn};

use crate::error::{KernelError, ensure_dimension, ensure_finite};
use crate::kernel::KernelEstimator;

/// Default iteration budget.
pub const DEFAULT_MAX_ITERATIONS: u32 = 50;

/// Default convergence tolerance on the similarity change.
pub const DEFAULT_TOLERANCE: f64 = 1e-4;

/// Default number of candidates in the search space.
pub const DEFAULT_CANDIDATES: usize = 4;

/// Tunables for the oracle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OracleConfig {
    /// Stop once the current candidate's similarity changes by less than this.
    pub tolerance: f64,
    /// Size of the candidate space.
    pub candidates: usize,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            candidates: DEFAULT_CANDIDATES,
        }
    }
}

/// Outcome of a fixed-point search.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedPoint {
    /// The selected candidate.
    pub point: Vec<f64>,
    /// Kernel similarity between `point`'s encoding and its previous iterate.
    pub similarity: f64,
    /// Iterations actually run.
    pub iterations: u32,
    /// Whether the tolerance was met before the budget ran out.
    pub converged: bool,
}

/// Fixed-point search driven by a shared kernel estimator.
#[derive(Debug)]
pub struct RetrocausalOracle<'a> {
    estimator: &'a KernelEstimator,
    config: OracleConfig,
}

impl<'a> RetrocausalOracle<'a> {
    /// Create an oracle over `estimator`.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::InvalidConfiguration`] if the candidate count is
    /// zero or the tolerance is not a positive finite number.
    pub fn new(estimator: &'a KernelEstimator, config: OracleConfig) -> Result<Self, KernelError> {
        if config.candidates == 0 {
            return Err(KernelError::invalid("oracle needs at least one candidate"));
        }
        if !(config.tolerance.is_finite() && config.tolerance > 0.0) {
            return Err(KernelError::invalid(format!(
                "oracle tolerance {} must be positive",
                config.tolerance
            )));
        }
        Ok(Self { estimator, config })
    }

    /// Search for a self-consistent state starting from `initial`.
    ///
    /// # Errors
    ///
    /// - [`KernelError::InputTooLarge`] if `dimension` exceeds the unit cap
    /// - [`KernelError::DimensionMismatch`] if `initial` is not `dimension` long
    /// - [`KernelError::NonFiniteInput`] if `initial` holds NaN or infinity
    /// - [`KernelError::InvalidConfiguration`] if `max_iterations` is zero
    ///
    /// Failing to converge is not an error; see [`FixedPoint::converged`].
    pub fn find_fixed_point(
        &self,
        initial: &[f64],
        dimension: usize,
        max_iterations: u32,
    ) -> Result<FixedPoint, KernelError> {
        let cap = self.estimator.encoder().unit_cap();
        if dimension > cap {
            return Err(KernelError::InputTooLarge {
                len: dimension,
                cap,
            });
        }
        ensure_dimension(dimension, initial.len())?;
        ensure_finite(initial)?;
        if max_iterations == 0 {
            return Err(KernelError::invalid("max_iterations must be at least 1"));
        }

        let mut candidates = seed_candidates(initial, self.config.candidates);
        let mut amplitudes = uniform_amplitudes(candidates.len());
        let mut best_point = initial.to_vec();
        let mut best_similarity = f64::NEG_INFINITY;
        let mut previous: Option<f64> = None;

        for iteration in 1..=max_iterations {
            let mut scores = Vec::with_capacity(candidates.len());
            for candidate in &mut candidates {
                let next = self_map(candidate);
                scores.push(self.estimator.kernel(candidate, &next)?);
                *candidate = next;
            }

            amplify(&mut amplitudes, &scores);

            let current = most_probable(&amplitudes, &scores);
            let similarity = scores.get(current).copied().unwrap_or(0.0);
            let point = candidates.get(current).cloned().unwrap_or_default();

            if similarity > best_similarity {
                best_similarity = similarity;
                best_point.clone_from(&point);
            }

            debug!(iteration, current, similarity, "oracle iteration");

            if previous.is_some_and(|prev| (similarity - prev).abs() < self.config.tolerance) {
                return Ok(FixedPoint {
                    point,
                    similarity,
                    iterations: iteration,
                    converged: true,
                });
            }
            previous = Some(similarity);
        }

        warn!(
            max_iterations,
            best_similarity, "oracle did not converge; returning best candidate"
        );
        Ok(FixedPoint {
            point: best_point,
            similarity: best_similarity.max(0.0),
            iterations: max_iterations,
            converged: false,
        })
    }
}

/// The self-referential map: pull every coordinate halfway to the mean.
fn self_map(x: &[f64]) -> Vec<f64> {
    if x.is_empty() {
        return Vec::new();
    }
    let mean = x.iter().sum::<f64>() / count(x.len());
    x.iter().map(|v| (v + mean) / 2.0).collect()
}

/// `initial, T(initial), T(T(initial)), ...`, `k` entries.
fn seed_candidates(initial: &[f64], k: usize) -> Vec<Vec<f64>> {
    let mut out = Vec::with_capacity(k);
    let mut current = initial.to_vec();
    for _ in 0..k {
        let next = self_map(&current);
        out.push(current);
        current = next;
    }
    out
}

fn uniform_amplitudes(k: usize) -> Vec<f64> {
    let a = count(k).sqrt().recip();
    vec![a; k]
}

/// One Grover-style step: phase-flip above-average candidates, then invert
/// every amplitude about the mean and renormalize.
fn amplify(amplitudes: &mut [f64], scores: &[f64]) {
    if amplitudes.is_empty() {
        return;
    }
    let n = count(amplitudes.len());
    let mean_score = scores.iter().sum::<f64>() / n;

    for (amp, score) in amplitudes.iter_mut().zip(scores) {
        if *score > mean_score {
            *amp = -*amp;
        }
    }

    let mean_amp = amplitudes.iter().sum::<f64>() / n;
    for amp in amplitudes.iter_mut() {
        *amp = 2.0f64.mul_add(mean_amp, -*amp);
    }

    let norm = amplitudes.iter().map(|a| a * a).sum::<f64>().sqrt();
    if norm > f64::EPSILON {
        for amp in amplitudes.iter_mut() {
            *amp /= norm;
        }
    } else {
        let reset = n.sqrt().recip();
        for amp in amplitudes.iter_mut() {
            *amp = reset;
        }
    }
}

/// Index of the largest `|amplitude|²`. Equal probabilities go to the
/// higher-scoring candidate, then to the earliest.
fn most_probable(amplitudes: &[f64], scores: &[f64]) -> usize {
    const TIE: f64 = 1e-12;
    let mut best = 0;
    let mut best_p = f64::NEG_INFINITY;
    let mut best_score = f64::NEG_INFINITY;
    for (index, amp) in amplitudes.iter().enumerate() {
        let p = amp * amp;
        let score = scores.get(index).copied().unwrap_or(f64::NEG_INFINITY);
        let tied = (p - best_p).abs() <= TIE;
        if (!tied && p > best_p) || (tied && score > best_score) {
            best = index;
            best_p = p;
            best_score = score;
        }
    }
    best
}

#[allow(clippy::cast_precision_loss)]
const fn count(n: usize) -> f64 {
    n as f64
}
