//! `tracker_core` — Constant-acceleration Kalman filter for 1-D tracking.
//!
//! # Module layout
//! - [`types`]   — Fixed-size state / covariance types, `Belief`
//! - [`kf`]      — Kalman filter (predict / update), `KfConfig`
//! - [`error`]   — Error type
//! - [`metrics`] — MSE / RMSE against ground truth

pub mod error;
pub mod kf;
pub mod metrics;
pub mod types;

pub use error::{Error, Result};
pub use kf::{ConstAccelKf, Estimator, KfConfig, KfUpdateResult, StepOutput};
pub use metrics::{EstimationMetrics, GroundTruth};
pub use types::{Belief, CovarianceUpdate, Gain, MeasurementRow, StateCov, StateVec};
