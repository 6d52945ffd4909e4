//! State Vector Encoder.
//!
//! Maps a bounded real feature vector onto a normalized complex state vector
//! of length `2^n`, one simulated unit per feature. Encoding starts from the
//! uniform superposition and applies, for every repetition `r` and feature
//! `i`, the phase `e^{i·x_i·π·(r+1)}` to each amplitude whose index has bit
//! `i` set. Only unit-magnitude factors touch a normalized start, so the
//! output is unit-norm by construction.

use std::f64::consts::PI;

use num_complex::Complex64;

use crate::error::{KernelError, ensure_finite};

/// Default number of simulated units (and maximum feature-vector length).
pub const DEFAULT_UNIT_CAP: usize = 10;

/// Default number of encoding repetitions.
pub const DEFAULT_REPETITIONS: u32 = 2;

/// Hard ceiling on the configurable cap. `2^20` amplitudes is already 16 MiB.
pub const MAX_UNIT_CAP: usize = 20;

/// An immutable, unit-norm complex state vector.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedState {
    amplitudes: Vec<Complex64>,
}

impl EncodedState {
    /// The amplitudes, indexed by basis state.
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// Number of amplitudes (`2^units`).
    pub const fn len(&self) -> usize {
        self.amplitudes.len()
    }

    /// Always false: even a zero-feature encoding holds one amplitude.
    pub const fn is_empty(&self) -> bool {
        self.amplitudes.is_empty()
    }

    /// Total squared magnitude. Equal to 1 up to rounding.
    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes
            .iter()
            .fold(0.0, |acc, z| acc + z.norm_sqr())
    }

    /// Number of simulated units backing this state.
    pub const fn units(&self) -> u32 {
        self.amplitudes.len().trailing_zeros()
    }
}

/// Encoder bound to a simulated-unit cap and a repetition count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoder {
    unit_cap: usize,
    repetitions: u32,
}

impl Encoder {
    /// Create an encoder.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::InvalidConfiguration`] if `repetitions` is zero
    /// or `unit_cap` exceeds [`MAX_UNIT_CAP`].
    pub fn new(unit_cap: usize, repetitions: u32) -> Result<Self, KernelError> {
        if repetitions < 1 {
            return Err(KernelError::invalid("repetitions must be at least 1"));
        }
        if unit_cap > MAX_UNIT_CAP {
            return Err(KernelError::invalid(format!(
                "unit cap {unit_cap} exceeds the maximum of {MAX_UNIT_CAP}"
            )));
        }
        Ok(Self {
            unit_cap,
            repetitions,
        })
    }

    /// Configured simulated-unit cap.
    pub const fn unit_cap(&self) -> usize {
        self.unit_cap
    }

    /// Configured repetition count.
    pub const fn repetitions(&self) -> u32 {
        self.repetitions
    }

    /// Encode a feature vector.
    ///
    /// # Errors
    ///
    /// See [`encode`].
    pub fn encode(&self, features: &[f64]) -> Result<EncodedState, KernelError> {
        encode(features, self.repetitions, self.unit_cap)
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self {
            unit_cap: DEFAULT_UNIT_CAP,
            repetitions: DEFAULT_REPETITIONS,
        }
    }
}

/// Encode `features` into a `2^len` complex state vector.
///
/// # Errors
///
/// - [`KernelError::InputTooLarge`] if `features.len() > unit_cap`
/// - [`KernelError::InvalidConfiguration`] if `repetitions < 1`
/// - [`KernelError::NonFiniteInput`] if any feature is NaN or infinite
pub fn encode(
    features: &[f64],
    repetitions: u32,
    unit_cap: usize,
) -> Result<EncodedState, KernelError> {
    let units = features.len();
    if units > unit_cap || units > MAX_UNIT_CAP {
        return Err(KernelError::InputTooLarge {
            len: units,
            cap: unit_cap.min(MAX_UNIT_CAP),
        });
    }
    if repetitions < 1 {
        return Err(KernelError::invalid("repetitions must be at least 1"));
    }
    ensure_finite(features)?;

    let size = 1_usize << units;
    let exponent = i32::try_from(units)
        .map_err(|e| KernelError::invalid(format!("unit count {units}: {e}")))?;
    // 2^(-n/2)
    let start = 0.5_f64.powi(exponent).sqrt();
    let mut amplitudes = vec![Complex64::new(start, 0.0); size];

    for r in 0..repetitions {
        let scale = PI * f64::from(r.saturating_add(1));
        for (bit, &feature) in features.iter().enumerate() {
            let rotation = Complex64::from_polar(1.0, feature * scale);
            let mask = 1_usize << bit;
            for (index, amplitude) in amplitudes.iter_mut().enumerate() {
                if index & mask != 0 {
                    *amplitude = rotate(*amplitude, rotation);
                }
            }
        }
    }

    Ok(EncodedState { amplitudes })
}

/// Complex product `z * w`, written out on the components.
#[allow(clippy::suboptimal_flops)]
const fn rotate(z: Complex64, w: Complex64) -> Complex64 {
    Complex64::new(z.re * w.re - z.im * w.im, z.re * w.im + z.im * w.re)
}
