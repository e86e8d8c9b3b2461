//! Injectable noise for diplomatic evaluation.
//!
//! Evaluation adds a small random perturbation to every diplomatic score so
//! that relations near a threshold can flip between states from one tick to
//! the next. Production uses [`UniformNoise`]; tests pin the value with
//! [`FixedNoise`] or remove it with [`NoNoise`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default noise amplitude: samples are drawn from `[-0.1, 0.1]`.
pub const DEFAULT_NOISE_AMPLITUDE: f64 = 0.1;

/// A source of perturbations added to diplomatic scores.
pub trait NoiseSource: Send {
    /// Draw the next perturbation.
    fn sample(&mut self) -> f64;
}

/// Uniform noise in `[-amplitude, amplitude]`.
#[derive(Debug, Clone)]
pub struct UniformNoise {
    rng: StdRng,
    amplitude: f64,
}

impl UniformNoise {
    /// Reproducible noise from a fixed seed.
    pub fn seeded(seed: u64, amplitude: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            amplitude: amplitude.abs(),
        }
    }

    /// Noise seeded from the operating system.
    pub fn from_entropy(amplitude: f64) -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            amplitude: amplitude.abs(),
        }
    }
}

impl NoiseSource for UniformNoise {
    fn sample(&mut self) -> f64 {
        self.rng.random_range(-self.amplitude..=self.amplitude)
    }
}

/// Always returns the same value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedNoise(pub f64);

impl NoiseSource for FixedNoise {
    fn sample(&mut self) -> f64 {
        self.0
    }
}

/// Always returns zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoNoise;

impl NoiseSource for NoNoise {
    fn sample(&mut self) -> f64 {
        0.0
    }
}
