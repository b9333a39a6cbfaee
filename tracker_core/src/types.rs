//! Fundamental types used across the entire workspace.

use nalgebra::{Matrix2, RowVector2, Vector2};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Fixed-size aliases: the model is always 2 states, 1 scalar measurement.
// ---------------------------------------------------------------------------

/// State vector: [position, velocity]
pub type StateVec = Vector2<f64>;

/// 2×2 state covariance matrix
pub type StateCov = Matrix2<f64>;

/// 2×1 Kalman gain (and control matrix B)
pub type Gain = Vector2<f64>;

/// 1×2 measurement matrix C
pub type MeasurementRow = RowVector2<f64>;

// ---------------------------------------------------------------------------
// Belief
// ---------------------------------------------------------------------------

/// Mean and covariance of the estimate at one instant.
///
/// This is a value snapshot: copying it out of the filter never aliases
/// the filter's working memory.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Belief {
    pub x: StateVec,
    pub p: StateCov,
}

impl Default for Belief {
    /// `x = [0, 0]`, `P = I`.
    fn default() -> Self {
        Self {
            x: StateVec::zeros(),
            p: StateCov::identity(),
        }
    }
}

impl Belief {
    pub fn new(x: StateVec, p: StateCov) -> Self {
        Self { x, p }
    }

    pub fn position(&self) -> f64 {
        self.x[0]
    }

    pub fn velocity(&self) -> f64 {
        self.x[1]
    }

    pub fn position_variance(&self) -> f64 {
        self.p[(0, 0)]
    }

    pub fn velocity_variance(&self) -> f64 {
        self.p[(1, 1)]
    }

    /// True if `p` is finite, symmetric within `tol`, and positive
    /// semi-definite within `tol` (2×2: non-negative diagonal and determinant).
    pub fn is_valid_covariance(&self, tol: f64) -> bool {
        let p = &self.p;
        if p.iter().any(|v| !v.is_finite()) || self.x.iter().any(|v| !v.is_finite()) {
            return false;
        }
        if (p[(0, 1)] - p[(1, 0)]).abs() > tol {
            return false;
        }
        p[(0, 0)] >= -tol && p[(1, 1)] >= -tol && p.determinant() >= -tol
    }

    /// Plain-array view, used for serialisation by the harness.
    pub fn to_arrays(&self) -> ([f64; 2], [[f64; 2]; 2]) {
        (
            [self.x[0], self.x[1]],
            [
                [self.p[(0, 0)], self.p[(0, 1)]],
                [self.p[(1, 0)], self.p[(1, 1)]],
            ],
        )
    }
}

// ---------------------------------------------------------------------------
// Covariance update form
// ---------------------------------------------------------------------------

/// How the posterior covariance is formed in `update`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovarianceUpdate {
    /// P' = (I − K·C)·P
    #[default]
    Standard,
    /// P' = (I − K·C)·P·(I − K·C)ᵀ + K·Q·Kᵀ
    Joseph,
}
