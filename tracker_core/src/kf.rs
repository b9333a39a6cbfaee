//! Kalman filter: predict and update steps.
//!
//! # Design choices
//! - We use a **linear KF** with a constant-acceleration (CA) motion model in
//!   one dimension. Acceleration is a known control input, not a state.
//! - All math is done in `f64` on fixed-size `nalgebra` types. The state
//!   never changes dimension, so no dynamic matrices are involved.
//! - The measurement is a single scalar, so the innovation covariance `S`
//!   is a scalar and the "inverse" in the gain is a reciprocal.
//! - The `Estimator` trait is the seam the simulator drives; it owns the
//!   predict → update protocol but not the order of calls.
//!
//! ## State vector
//! x = [p, v]ᵀ  (2-dimensional)
//!
//! ## CA transition / control model
//! A = [[1, dt], [0, 1]],  B = [dt²/2, dt]ᵀ
//! i.e. p += v*dt + u*dt²/2,  v += u*dt
//!
//! ## Process noise R (discrete white noise acceleration)
//! R = σₐ² · [[dt⁴/4, dt³/2], [dt³/2, dt²]]
//!
//! ## Measurement model
//! C = [1, 0],  Q = σ_z²

use crate::error::{Error, Result};
use crate::types::{Belief, CovarianceUpdate, Gain, MeasurementRow, StateCov, StateVec};
use serde::{Deserialize, Serialize};

/// Tolerance used when validating a caller-supplied covariance.
const COVARIANCE_TOL: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A recursive state estimator driven by the caller's predict/update loop.
pub trait Estimator {
    /// Advance the belief one time step. Returns a snapshot of the new mean.
    fn predict(&mut self) -> StateVec;

    /// Correct the belief with one scalar measurement `z`.
    fn update(&mut self, z: f64) -> Result<KfUpdateResult>;

    /// Snapshot of the current mean and covariance.
    fn belief(&self) -> Belief;

    /// `predict` followed by `update(z)`.
    ///
    /// If the update is rejected the prediction has already been applied.
    fn step(&mut self, z: f64) -> Result<StepOutput> {
        let prior = self.predict();
        let update = self.update(z)?;
        Ok(StepOutput { prior, update })
    }
}

/// Result of a KF update step, exposed for inspection and logging.
#[derive(Clone, Copy, Debug)]
pub struct KfUpdateResult {
    /// Innovation ν = z − C·x
    pub innovation: f64,
    /// Innovation covariance S = C·P·Cᵀ + Q
    pub innovation_cov: f64,
    /// Kalman gain K = P·Cᵀ·S⁻¹
    pub gain: Gain,
    /// Posterior belief
    pub posterior: Belief,
}

/// Output of [`Estimator::step`].
#[derive(Clone, Copy, Debug)]
pub struct StepOutput {
    /// Mean after `predict`, before the measurement was applied
    pub prior: StateVec,
    pub update: KfUpdateResult,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Configuration for the constant-acceleration filter.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KfConfig {
    /// Time step (s)
    pub dt: f64,
    /// Control input: known acceleration (m/s²)
    pub control_input: f64,
    /// Process noise std dev: unmodelled acceleration (m/s²)
    pub sigma_a: f64,
    /// Measurement noise std dev (m)
    pub sigma_z: f64,
    /// Posterior covariance form
    pub covariance_update: CovarianceUpdate,
}

impl Default for KfConfig {
    fn default() -> Self {
        Self {
            dt: 0.1,
            control_input: 1.0,
            sigma_a: 0.25,
            sigma_z: 2.0,
            covariance_update: CovarianceUpdate::Standard,
        }
    }
}

impl KfConfig {
    /// Reject parameters that would produce degenerate model matrices.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("dt", self.dt),
            ("sigma_a", self.sigma_a),
            ("sigma_z", self.sigma_z),
        ] {
            if !value.is_finite() {
                return Err(Error::InvalidConfig {
                    name,
                    value,
                    reason: "must be finite",
                });
            }
            if value <= 0.0 {
                return Err(Error::InvalidConfig {
                    name,
                    value,
                    reason: "must be strictly positive",
                });
            }
        }
        if !self.control_input.is_finite() {
            return Err(Error::InvalidConfig {
                name: "control_input",
                value: self.control_input,
                reason: "must be finite",
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Constant Acceleration model
// ---------------------------------------------------------------------------

/// Constant-acceleration Kalman filter (2-state, linear, scalar measurement).
///
/// Model matrices are built once in [`ConstAccelKf::new`] and never change.
/// `predict`/`update` take `&mut self`; use one instance per track.
#[derive(Clone, Debug)]
pub struct ConstAccelKf {
    config: KfConfig,
    a: StateCov,
    b: Gain,
    r: StateCov,
    c: MeasurementRow,
    q: f64,
    initial: Belief,
    belief: Belief,
}

impl ConstAccelKf {
    pub fn new(config: KfConfig) -> Result<Self> {
        config.validate()?;
        let dt = config.dt;
        let initial = Belief::default();
        let kf = Self {
            a: Self::transition_matrix(dt),
            b: Self::control_matrix(dt),
            r: Self::process_noise(dt, config.sigma_a),
            c: MeasurementRow::new(1.0, 0.0),
            q: config.sigma_z * config.sigma_z,
            config,
            initial,
            belief: initial,
        };
        tracing::debug!(
            dt,
            u = config.control_input,
            sigma_a = config.sigma_a,
            sigma_z = config.sigma_z,
            "constructed constant-acceleration filter"
        );
        Ok(kf)
    }

    /// Shorthand for `new` with the standard covariance update.
    pub fn from_params(dt: f64, u: f64, sigma_a: f64, sigma_z: f64) -> Result<Self> {
        Self::new(KfConfig {
            dt,
            control_input: u,
            sigma_a,
            sigma_z,
            covariance_update: CovarianceUpdate::Standard,
        })
    }

    /// Replace the initial belief (`x = 0`, `P = I`). `reset` returns here.
    pub fn with_belief(mut self, belief: Belief) -> Result<Self> {
        if !belief.is_valid_covariance(COVARIANCE_TOL) {
            return Err(Error::InvalidCovariance(format!(
                "initial belief must be finite, symmetric and PSD: x={:?}, P={:?}",
                belief.x.as_slice(),
                belief.p.as_slice()
            )));
        }
        self.initial = belief;
        self.belief = belief;
        Ok(self)
    }

    /// Build state transition matrix A for timestep dt.
    pub fn transition_matrix(dt: f64) -> StateCov {
        // position += velocity * dt
        StateCov::new(1.0, dt, 0.0, 1.0)
    }

    /// Build control matrix B mapping scalar acceleration onto [p, v].
    pub fn control_matrix(dt: f64) -> Gain {
        Gain::new(dt * dt / 2.0, dt)
    }

    /// Build process noise matrix R for timestep dt.
    /// Uses discrete white noise acceleration model (DWNA).
    pub fn process_noise(dt: f64, sigma_a: f64) -> StateCov {
        let var = sigma_a * sigma_a;
        let dt2 = dt * dt;
        let dt3 = dt2 * dt;
        let dt4 = dt3 * dt;
        StateCov::new(dt4 / 4.0, dt3 / 2.0, dt3 / 2.0, dt2) * var
    }

    pub fn config(&self) -> &KfConfig {
        &self.config
    }

    pub fn a(&self) -> &StateCov {
        &self.a
    }

    pub fn b(&self) -> &Gain {
        &self.b
    }

    pub fn r(&self) -> &StateCov {
        &self.r
    }

    pub fn c(&self) -> &MeasurementRow {
        &self.c
    }

    pub fn q(&self) -> f64 {
        self.q
    }

    pub fn state(&self) -> StateVec {
        self.belief.x
    }

    pub fn covariance(&self) -> StateCov {
        self.belief.p
    }

    /// Restore the initial belief.
    pub fn reset(&mut self) {
        self.belief = self.initial;
    }
}

impl Estimator for ConstAccelKf {
    fn predict(&mut self) -> StateVec {
        let Belief { x, p } = self.belief;
        let x = self.a * x + self.b * self.config.control_input;
        let p = self.a * p * self.a.transpose() + self.r;
        self.belief = Belief::new(x, symmetrize(&p));
        tracing::trace!(pos = x[0], vel = x[1], "predict");
        x
    }

    fn update(&mut self, z: f64) -> Result<KfUpdateResult> {
        if !z.is_finite() {
            tracing::warn!(z, "rejected non-finite measurement");
            return Err(Error::NonFiniteMeasurement(z));
        }
        let Belief { x, p } = self.belief;

        // Innovation covariance: S = C·P·Cᵀ + Q  (scalar)
        let pct = p * self.c.transpose();
        let s = (self.c * pct)[(0, 0)] + self.q;
        if !(s.is_finite() && s > 0.0) {
            tracing::warn!(s, "innovation covariance is degenerate");
            return Err(Error::DegenerateInnovation(s));
        }

        // Kalman gain: K = P·Cᵀ·S⁻¹
        let k: Gain = pct / s;

        // Innovation: ν = z − C·x
        let innovation = z - (self.c * x)[(0, 0)];
        let x = x + k * innovation;

        let i_kc = StateCov::identity() - k * self.c;
        let p = match self.config.covariance_update {
            CovarianceUpdate::Standard => i_kc * p,
            CovarianceUpdate::Joseph => {
                i_kc * p * i_kc.transpose() + k * k.transpose() * self.q
            }
        };
        self.belief = Belief::new(x, symmetrize(&p));
        tracing::trace!(z, innovation, s, pos = x[0], vel = x[1], "update");

        Ok(KfUpdateResult {
            innovation,
            innovation_cov: s,
            gain: k,
            posterior: self.belief,
        })
    }

    fn belief(&self) -> Belief {
        self.belief
    }
}

/// (P + Pᵀ) / 2, keeps round-off from breaking symmetry over long runs.
fn symmetrize(p: &StateCov) -> StateCov {
    (p + p.transpose()) * 0.5
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn reference_kf() -> ConstAccelKf {
        ConstAccelKf::from_params(0.1, 1.0, 0.25, 2.0).unwrap()
    }

    #[test]
    fn model_matrices_match_kinematics() {
        let kf = reference_kf();
        assert_eq!(*kf.a(), StateCov::new(1.0, 0.1, 0.0, 1.0));
        assert_abs_diff_eq!(kf.b()[0], 0.005, epsilon = 1e-15);
        assert_abs_diff_eq!(kf.b()[1], 0.1, epsilon = 1e-15);
        assert_eq!(*kf.c(), MeasurementRow::new(1.0, 0.0));
        assert_abs_diff_eq!(kf.q(), 4.0, epsilon = 1e-15);

        let r = kf.r();
        let var = 0.0625;
        assert_abs_diff_eq!(r[(0, 0)], var * 1e-4 / 4.0, epsilon = 1e-15);
        assert_abs_diff_eq!(r[(0, 1)], var * 1e-3 / 2.0, epsilon = 1e-15);
        assert_eq!(r[(0, 1)], r[(1, 0)]);
        assert_abs_diff_eq!(r[(1, 1)], var * 1e-2, epsilon = 1e-15);
    }

    #[test]
    fn initial_belief_is_zero_mean_identity_cov() {
        let kf = reference_kf();
        assert_eq!(kf.state(), StateVec::zeros());
        assert_eq!(kf.covariance(), StateCov::identity());
    }

    #[test]
    fn first_predict_is_control_only() {
        let mut kf = reference_kf();
        let x = kf.predict();
        assert_abs_diff_eq!(x[0], 0.005, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 0.1, epsilon = 1e-12);

        // P = A·Aᵀ + R
        let a = ConstAccelKf::transition_matrix(0.1);
        let expected = a * a.transpose() + ConstAccelKf::process_noise(0.1, 0.25);
        let p = kf.covariance();
        for i in 0..2 {
            for j in 0..2 {
                assert_abs_diff_eq!(p[(i, j)], expected[(i, j)], epsilon = 1e-12);
            }
        }
        assert_abs_diff_eq!(p[(0, 0)], 1.01 + 0.0625 * 1e-4 / 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p[(0, 1)], 0.1 + 0.0625 * 1e-3 / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p[(1, 1)], 1.0 + 0.0625 * 1e-2, epsilon = 1e-12);
    }

    #[test]
    fn update_after_predict_moves_position_by_gain() {
        let mut kf = reference_kf();
        kf.predict();
        let p00 = kf.covariance()[(0, 0)];
        let res = kf.update(0.0).unwrap();

        let k0 = p00 / (p00 + 4.0);
        assert_abs_diff_eq!(res.gain[0], k0, epsilon = 1e-12);
        assert_abs_diff_eq!(res.innovation, -0.005, epsilon = 1e-12);
        assert_abs_diff_eq!(res.innovation_cov, p00 + 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(kf.state()[0], 0.005 * (1.0 - k0), epsilon = 1e-12);
    }

    #[test]
    fn predicted_state_is_a_snapshot() {
        let mut kf = reference_kf();
        let x = kf.predict();
        kf.update(100.0).unwrap();
        assert_abs_diff_eq!(x[0], 0.005, epsilon = 1e-12);
        assert!(kf.state()[0] > 1.0);
    }

    #[test]
    fn update_never_increases_diagonal() {
        for mode in [CovarianceUpdate::Standard, CovarianceUpdate::Joseph] {
            let mut kf = ConstAccelKf::new(KfConfig {
                covariance_update: mode,
                ..KfConfig::default()
            })
            .unwrap();
            for i in 0..200 {
                kf.predict();
                let prior = kf.covariance();
                kf.update((i as f64 * 0.37).sin() * 5.0).unwrap();
                let post = kf.covariance();
                assert!(post[(0, 0)] <= prior[(0, 0)], "{mode:?} step {i}");
                assert!(post[(1, 1)] <= prior[(1, 1)], "{mode:?} step {i}");
                assert!(kf.belief().is_valid_covariance(1e-9));
            }
        }
    }

    #[test]
    fn joseph_and_standard_agree() {
        let mut std_kf = reference_kf();
        let mut jos_kf = ConstAccelKf::new(KfConfig {
            covariance_update: CovarianceUpdate::Joseph,
            ..KfConfig::default()
        })
        .unwrap();
        for i in 0..50 {
            let z = i as f64 * 0.3;
            std_kf.step(z).unwrap();
            jos_kf.step(z).unwrap();
        }
        let (a, b) = (std_kf.belief(), jos_kf.belief());
        assert_abs_diff_eq!(a.x[0], b.x[0], epsilon = 1e-9);
        assert_abs_diff_eq!(a.x[1], b.x[1], epsilon = 1e-9);
        assert_abs_diff_eq!(a.p[(0, 0)], b.p[(0, 0)], epsilon = 1e-9);
        assert_abs_diff_eq!(a.p[(1, 1)], b.p[(1, 1)], epsilon = 1e-9);
    }

    #[test]
    fn update_without_predict_uses_initial_covariance() {
        let mut kf = reference_kf();
        let res = kf.update(2.0).unwrap();
        // P = I → S = 1 + 4, K = [0.2, 0]
        assert_abs_diff_eq!(res.innovation_cov, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(res.gain[0], 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(res.gain[1], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(kf.state()[0], 0.4, epsilon = 1e-12);
        assert_abs_diff_eq!(kf.covariance()[(0, 0)], 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(kf.covariance()[(1, 1)], 1.0, epsilon = 1e-12);
        assert!(kf.belief().is_valid_covariance(1e-12));
    }

    #[test]
    fn rejects_non_positive_parameters() {
        assert!(matches!(
            ConstAccelKf::from_params(0.0, 1.0, 0.25, 2.0),
            Err(Error::InvalidConfig { name: "dt", .. })
        ));
        assert!(matches!(
            ConstAccelKf::from_params(0.1, 1.0, -0.25, 2.0),
            Err(Error::InvalidConfig { name: "sigma_a", .. })
        ));
        assert!(matches!(
            ConstAccelKf::from_params(0.1, 1.0, 0.25, 0.0),
            Err(Error::InvalidConfig { name: "sigma_z", .. })
        ));
        assert!(matches!(
            ConstAccelKf::from_params(0.1, f64::NAN, 0.25, 2.0),
            Err(Error::InvalidConfig { name: "control_input", .. })
        ));
        assert!(matches!(
            ConstAccelKf::from_params(f64::INFINITY, 1.0, 0.25, 2.0),
            Err(Error::InvalidConfig { name: "dt", .. })
        ));
    }

    #[test]
    fn non_finite_measurement_leaves_belief_untouched() {
        let mut kf = reference_kf();
        kf.predict();
        let before = kf.belief();
        assert!(matches!(
            kf.update(f64::NAN),
            Err(Error::NonFiniteMeasurement(v)) if v.is_nan()
        ));
        assert!(matches!(
            kf.update(f64::INFINITY),
            Err(Error::NonFiniteMeasurement(_))
        ));
        assert_eq!(kf.belief(), before);
    }

    #[test]
    fn degenerate_covariance_is_reported() {
        // P[0][0] = -4 cancels Q = 4 exactly; with_belief rejects it, so force it.
        let mut kf = reference_kf();
        kf.belief = Belief::new(StateVec::zeros(), StateCov::new(-4.0, 0.0, 0.0, 1.0));
        assert!(matches!(kf.update(1.0), Err(Error::DegenerateInnovation(_))));
    }

    #[test]
    fn with_belief_and_reset() {
        let start = Belief::new(StateVec::new(10.0, -1.0), StateCov::identity() * 25.0);
        let mut kf = reference_kf().with_belief(start).unwrap();
        assert_eq!(kf.belief(), start);
        kf.step(12.0).unwrap();
        assert_ne!(kf.belief(), start);
        kf.reset();
        assert_eq!(kf.belief(), start);

        let bad = Belief::new(StateVec::zeros(), StateCov::new(1.0, 3.0, 3.0, 1.0));
        assert!(matches!(
            reference_kf().with_belief(bad),
            Err(Error::InvalidCovariance(_))
        ));
    }
}
