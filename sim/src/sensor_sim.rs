//! Position sensor simulator.
//!
//! Generates scalar position measurements z = C·x_true + v, v ~ 𝒩(0, σ²),
//! from a seeded ChaCha8 stream so runs are reproducible.

use anyhow::{ensure, Result};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::Normal;

/// Noisy position-only sensor.
pub struct PositionSensor {
    noise_std: f64,
    noise: Normal<f64>,
    rng: ChaCha8Rng,
}

impl PositionSensor {
    pub fn new(noise_std: f64, seed: u64) -> Result<Self> {
        ensure!(
            noise_std.is_finite() && noise_std >= 0.0,
            "sensor noise std must be finite and non-negative, got {noise_std}"
        );
        Ok(Self {
            noise_std,
            noise: Normal::new(0.0, noise_std)?,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    pub fn noise_std(&self) -> f64 {
        self.noise_std
    }

    /// Observe the position component of `state`.
    pub fn measure(&mut self, state: &[f64; 2]) -> f64 {
        state[0] + self.noise.sample(&mut self.rng)
    }
}
