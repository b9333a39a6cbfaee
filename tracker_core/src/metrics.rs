//! Estimation metrics: MSE of filtered, predicted and raw-measurement position,
//! RMSE of velocity.

use crate::types::StateVec;
use serde::{Deserialize, Serialize};

/// Ground-truth kinematic state of the target at one step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub time: f64,
    pub position: f64,
    pub velocity: f64,
}

/// Accumulated metric statistics.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EstimationMetrics {
    /// Leading steps excluded from the error sums (filter settling)
    pub burn_in: u64,
    /// Number of steps seen, including burn-in
    pub n_steps: u64,
    /// Number of steps that contributed to the sums
    pub n_evaluated: u64,
    /// Sum of squared filtered (posterior) position errors
    pub sum_sq_pos_err: f64,
    /// Sum of squared predicted (prior) position errors
    pub sum_sq_pred_err: f64,
    /// Sum of squared raw measurement errors
    pub sum_sq_meas_err: f64,
    /// Sum of squared filtered velocity errors
    pub sum_sq_vel_err: f64,
}

impl EstimationMetrics {
    pub fn with_burn_in(burn_in: u64) -> Self {
        Self {
            burn_in,
            ..Self::default()
        }
    }

    fn mean(&self, sum: f64) -> f64 {
        if self.n_evaluated == 0 {
            return 0.0;
        }
        sum / self.n_evaluated as f64
    }

    /// Mean squared error of the filtered position (m²).
    pub fn mse_position(&self) -> f64 {
        self.mean(self.sum_sq_pos_err)
    }

    /// Mean squared error of the predicted position (m²).
    pub fn mse_prediction(&self) -> f64 {
        self.mean(self.sum_sq_pred_err)
    }

    /// Mean squared error of the raw measurements (m²).
    pub fn mse_measurement(&self) -> f64 {
        self.mean(self.sum_sq_meas_err)
    }

    /// Root-mean-square filtered position error (m).
    pub fn rmse_position(&self) -> f64 {
        self.mse_position().sqrt()
    }

    /// Root-mean-square filtered velocity error (m/s).
    pub fn rmse_velocity(&self) -> f64 {
        self.mean(self.sum_sq_vel_err).sqrt()
    }

    /// mse_measurement / mse_position; > 1 means the filter beats the sensor.
    pub fn improvement_ratio(&self) -> f64 {
        let mse = self.mse_position();
        if mse == 0.0 {
            return f64::INFINITY;
        }
        self.mse_measurement() / mse
    }

    /// Accumulate one step: truth, the raw measurement, and the prior and
    /// posterior means.
    pub fn accumulate(
        &mut self,
        truth: &GroundTruth,
        measurement: f64,
        prior: &StateVec,
        posterior: &StateVec,
    ) {
        self.n_steps += 1;
        if self.n_steps <= self.burn_in {
            return;
        }
        let dp = posterior[0] - truth.position;
        let dpr = prior[0] - truth.position;
        let dz = measurement - truth.position;
        let dv = posterior[1] - truth.velocity;
        self.sum_sq_pos_err += dp * dp;
        self.sum_sq_pred_err += dpr * dpr;
        self.sum_sq_meas_err += dz * dz;
        self.sum_sq_vel_err += dv * dv;
        self.n_evaluated += 1;
    }
}
