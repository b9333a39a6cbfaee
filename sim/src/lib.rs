//! `sim` — Harness around the estimator: true trajectory, noisy sensor,
//! scenarios, trial/sweep runner, replay.

pub mod replay;
pub mod runner;
pub mod scenarios;
pub mod sensor_sim;
pub mod target;

pub use replay::{load_replay, replay_log, save_replay, ReplayLog, ReplayReport};
pub use runner::{run_sweep, run_trial, StepRecord, SweepSummary, TrialRecord};
pub use scenarios::{Scenario, ScenarioKind};
pub use sensor_sim::PositionSensor;
pub use target::{Target, Trajectory};
