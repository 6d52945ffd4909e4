//! Kernel Estimator.
//!
//! The kernel value `K(a, b) = |⟨a|b⟩|²` between two encoded states is the
//! similarity primitive used everywhere else in the engine. The overlap is
//! divided by the product of the state norms, which is a no-op for unit
//! states but makes `K(x, x)` exactly `1.0` in floating point.
//!
//! [`KernelEstimator`] memoizes kernel values over feature-vector pairs in a
//! bounded LRU cache shared by every caller. Navigation loops revisit the
//! same anchor pairs constantly, so the hit rate is high in practice.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use num_complex::Complex64;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::trace;

use crate::encoder::{EncodedState, Encoder};
use crate::error::{KernelError, ensure_dimension, ensure_finite};

/// Default number of memoized kernel values.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Kernel value between two encoded states, clamped to `[0, 1]`.
///
/// # Errors
///
/// Returns [`KernelError::DimensionMismatch`] if the states have different
/// lengths.
pub fn fidelity(a: &EncodedState, b: &EncodedState) -> Result<f64, KernelError> {
    ensure_dimension(a.len(), b.len())?;

    let overlap = a
        .amplitudes()
        .iter()
        .zip(b.amplitudes())
        .fold(Complex64::new(0.0, 0.0), |acc, (x, y)| conj_mul_add(acc, *x, *y));

    let norms = a.norm_sqr() * b.norm_sqr();
    if norms <= 0.0 {
        return Ok(0.0);
    }
    Ok((overlap.norm_sqr() / norms).clamp(0.0, 1.0))
}

/// `acc + conj(x) * y` on the components. Plain products keep the imaginary
/// part of `<x|x>` at exactly zero.
#[allow(clippy::suboptimal_flops)]
const fn conj_mul_add(acc: Complex64, x: Complex64, y: Complex64) -> Complex64 {
    Complex64::new(
        acc.re + (x.re * y.re + x.im * y.im),
        acc.im + (x.re * y.im - x.im * y.re),
    )
}

/// Cache key: the bit patterns of both feature vectors, smaller first, so
/// that `K(a, b)` and `K(b, a)` share one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PairKey {
    first: Vec<u64>,
    second: Vec<u64>,
}

impl PairKey {
    fn new(a: &[f64], b: &[f64]) -> Self {
        let a: Vec<u64> = a.iter().map(|x| x.to_bits()).collect();
        let b: Vec<u64> = b.iter().map(|x| x.to_bits()).collect();
        if a <= b {
            Self {
                first: a,
                second: b,
            }
        } else {
            Self {
                first: b,
                second: a,
            }
        }
    }
}

/// Hit/miss counters for the kernel cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that had to encode and compare.
    pub misses: u64,
    /// Entries currently held.
    pub entries: usize,
    /// Maximum number of entries.
    pub capacity: usize,
}

/// Memoizing kernel estimator over raw feature vectors.
///
/// Safe to share across threads; the cache lock is held only for lookups
/// and inserts, never while encoding.
#[derive(Debug)]
pub struct KernelEstimator {
    encoder: Encoder,
    cache: Mutex<LruCache<PairKey, f64>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl KernelEstimator {
    /// Create an estimator with the given encoder and cache capacity.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::InvalidConfiguration`] if `capacity` is zero.
    pub fn new(encoder: Encoder, capacity: usize) -> Result<Self, KernelError> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| KernelError::invalid("kernel cache capacity must be non-zero"))?;
        Ok(Self {
            encoder,
            cache: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    /// The encoder used for cache misses.
    pub const fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    /// Kernel value between the encodings of `a` and `b`.
    ///
    /// # Errors
    ///
    /// - [`KernelError::DimensionMismatch`] if the vectors differ in length
    /// - [`KernelError::NonFiniteInput`] for NaN or infinite features
    /// - [`KernelError::InputTooLarge`] if the vectors exceed the unit cap
    pub fn kernel(&self, a: &[f64], b: &[f64]) -> Result<f64, KernelError> {
        self.validate_pair(a, b)?;

        let key = PairKey::new(a, b);
        let cached = self.cache.lock().get(&key).copied();
        if let Some(value) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }

        let value = fidelity(&self.encoder.encode(a)?, &self.encoder.encode(b)?)?;
        self.misses.fetch_add(1, Ordering::Relaxed);
        trace!(dimension = a.len(), value, "kernel cache miss");
        self.cache.lock().put(key, value);
        Ok(value)
    }

    /// Check that `a` and `b` could be compared, without computing anything.
    ///
    /// # Errors
    ///
    /// Same conditions as [`KernelEstimator::kernel`].
    pub fn validate_pair(&self, a: &[f64], b: &[f64]) -> Result<(), KernelError> {
        ensure_dimension(a.len(), b.len())?;
        let cap = self.encoder.unit_cap();
        if a.len() > cap {
            return Err(KernelError::InputTooLarge { len: a.len(), cap });
        }
        ensure_finite(a)?;
        ensure_finite(b)
    }

    /// Current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let cache = self.cache.lock();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: cache.len(),
            capacity: cache.cap().get(),
        }
    }

    /// Drop every memoized value. Counters are kept.
    pub fn clear(&self) {
        self.cache.lock().clear();
    }
}

impl Default for KernelEstimator {
    fn default() -> Self {
        Self {
            encoder: Encoder::default(),
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            )),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::encoder::encode;

    #[test]
    fn self_fidelity_is_exactly_one() {
        let state = encode(&[0.3, -1.7, 2.2, 0.01], 3, 10).unwrap();
        assert_eq!(fidelity(&state, &state).unwrap(), 1.0);
    }

    #[test]
    fn fidelity_is_symmetric() {
        let a = encode(&[0.1, 0.9, 0.4], 2, 10).unwrap();
        let b = encode(&[0.7, 0.2, 0.4], 2, 10).unwrap();
        assert_eq!(fidelity(&a, &b).unwrap(), fidelity(&b, &a).unwrap());
    }

    #[test]
    fn fidelity_matches_closed_form_for_uniform_vectors() {
        // For uniform features x and y over n units with R = Σ(r+1), the
        // kernel is cos²(π·R·(y-x)/2)^n.
        let n: i32 = 4;
        let (x, y) = (0.2, 0.3);
        let a = encode(&[x; 4], 2, 10).unwrap();
        let b = encode(&[y; 4], 2, 10).unwrap();
        let half_angle = std::f64::consts::PI * 3.0 * (y - x) / 2.0;
        let expected = half_angle.cos().powi(2 * n);
        assert!((fidelity(&a, &b).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn fidelity_rejects_mismatched_lengths() {
        let a = encode(&[0.1], 1, 10).unwrap();
        let b = encode(&[0.1, 0.2], 1, 10).unwrap();
        assert_eq!(
            fidelity(&a, &b),
            Err(KernelError::DimensionMismatch {
                expected: 2,
                actual: 4
            })
        );
    }

    #[test]
    fn estimator_memoizes_both_orders() {
        let estimator = KernelEstimator::default();
        let a = [0.1, 0.2];
        let b = [0.8, 0.4];
        let first = estimator.kernel(&a, &b).unwrap();
        let second = estimator.kernel(&b, &a).unwrap();
        assert_eq!(first, second);

        let stats = estimator.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.capacity, DEFAULT_CACHE_CAPACITY);
    }

    #[test]
    fn estimator_evicts_least_recently_used() {
        let estimator = KernelEstimator::new(Encoder::default(), 2).unwrap();
        let _ = estimator.kernel(&[0.1], &[0.2]).unwrap();
        let _ = estimator.kernel(&[0.1], &[0.3]).unwrap();
        let _ = estimator.kernel(&[0.1], &[0.4]).unwrap();
        assert_eq!(estimator.stats().entries, 2);

        // The first pair was evicted and must be recomputed.
        let _ = estimator.kernel(&[0.1], &[0.2]).unwrap();
        assert_eq!(estimator.stats().misses, 4);
    }

    #[test]
    fn estimator_rejects_zero_capacity() {
        assert!(KernelEstimator::new(Encoder::default(), 0).is_err());
    }

    #[test]
    fn estimator_rejects_bad_input_without_caching() {
        let estimator = KernelEstimator::default();
        assert!(estimator.kernel(&[0.1], &[0.1, 0.2]).is_err());
        assert!(estimator.kernel(&[f64::INFINITY], &[0.1]).is_err());
        assert!(estimator.kernel(&[0.5; 11], &[0.5; 11]).is_err());
        assert_eq!(estimator.stats().entries, 0);
    }

    #[test]
    fn clear_empties_cache() {
        let estimator = KernelEstimator::default();
        let _ = estimator.kernel(&[0.1], &[0.2]).unwrap();
        estimator.clear();
        assert_eq!(estimator.stats().entries, 0);
    }
}
