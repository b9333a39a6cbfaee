//! Trial runner: owns the predict → update loop over a scenario.
//!
//! # Per-step cycle
//! 1. Advance the true target by `dt`
//! 2. Take one noisy position measurement
//! 3. `predict()` the filter to the same instant
//! 4. `update(z)` with the measurement
//! 5. Record the step and accumulate metrics
//!
//! Sweeps run independent trials in parallel, one estimator per trial.

use crate::scenarios::Scenario;
use crate::sensor_sim::PositionSensor;
use crate::target::Target;
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracker_core::{ConstAccelKf, EstimationMetrics, Estimator};

/// Everything observed and estimated at one step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub time: f64,
    /// True [position, velocity]
    pub truth: [f64; 2],
    pub measurement: f64,
    /// Mean returned by `predict` (before the measurement)
    pub prior: [f64; 2],
    /// Mean after `update`
    pub posterior: [f64; 2],
    /// Covariance after `update`
    pub covariance: [[f64; 2]; 2],
    pub gain: [f64; 2],
    pub innovation: f64,
}

/// Output of one trial.
#[derive(Clone, Debug)]
pub struct TrialRecord {
    pub scenario: Scenario,
    pub seed: u64,
    pub steps: Vec<StepRecord>,
    pub metrics: EstimationMetrics,
}

/// Per-seed result inside a sweep.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeedResult {
    pub seed: u64,
    pub mse_position: f64,
    pub mse_measurement: f64,
    pub rmse_velocity: f64,
    pub improvement_ratio: f64,
}

/// Aggregate over a multi-seed sweep.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SweepSummary {
    pub scenario_name: String,
    pub trials: Vec<SeedResult>,
    pub mean_mse_position: f64,
    pub min_mse_position: f64,
    pub max_mse_position: f64,
    pub mean_mse_measurement: f64,
    pub mean_improvement_ratio: f64,
}

/// Run `scenario` once with the sensor seeded from `seed`.
pub fn run_trial(scenario: &Scenario, seed: u64) -> Result<TrialRecord> {
    let mut kf = ConstAccelKf::new(scenario.filter)
        .with_context(|| format!("invalid filter config for scenario '{}'", scenario.name))?;
    let mut target = Target::new(scenario.trajectory);
    let mut sensor = PositionSensor::new(scenario.sensor_noise_std, seed)?;
    let mut metrics = EstimationMetrics::with_burn_in(scenario.burn_in);
    let mut steps = Vec::with_capacity(scenario.steps);
    let dt = scenario.filter.dt;

    for k in 0..scenario.steps {
        target.step(dt);
        let z = sensor.measure(&target.state);
        let out = kf
            .step(z)
            .with_context(|| format!("filter step {k} failed (z = {z})"))?;

        let posterior = out.update.posterior;
        metrics.accumulate(&target.ground_truth(), z, &out.prior, &posterior.x);

        let (post_x, post_p) = posterior.to_arrays();
        steps.push(StepRecord {
            time: target.time,
            truth: target.state,
            measurement: z,
            prior: [out.prior[0], out.prior[1]],
            posterior: post_x,
            covariance: post_p,
            gain: [out.update.gain[0], out.update.gain[1]],
            innovation: out.update.innovation,
        });
    }

    tracing::info!(
        scenario = %scenario.name,
        seed,
        steps = scenario.steps,
        mse_position = metrics.mse_position(),
        mse_measurement = metrics.mse_measurement(),
        "trial finished"
    );

    Ok(TrialRecord {
        scenario: scenario.clone(),
        seed,
        steps,
        metrics,
    })
}

/// Run one trial per seed in parallel and summarise the filtered MSE.
pub fn run_sweep(scenario: &Scenario, seeds: &[u64]) -> Result<SweepSummary> {
    anyhow::ensure!(!seeds.is_empty(), "sweep needs at least one seed");

    let trials: Vec<SeedResult> = seeds
        .par_iter()
        .map(|&seed| -> Result<SeedResult> {
            let trial = run_trial(scenario, seed)?;
            let m = &trial.metrics;
            Ok(SeedResult {
                seed,
                mse_position: m.mse_position(),
                mse_measurement: m.mse_measurement(),
                rmse_velocity: m.rmse_velocity(),
                improvement_ratio: m.improvement_ratio(),
            })
        })
        .collect::<Result<_>>()?;

    let summary = SweepSummary {
        scenario_name: scenario.name.clone(),
        mean_mse_position: mean_of(&trials, |t| t.mse_position),
        min_mse_position: trials
            .iter()
            .map(|t| t.mse_position)
            .fold(f64::INFINITY, f64::min),
        max_mse_position: trials
            .iter()
            .map(|t| t.mse_position)
            .fold(f64::NEG_INFINITY, f64::max),
        mean_mse_measurement: mean_of(&trials, |t| t.mse_measurement),
        mean_improvement_ratio: mean_of(&trials, |t| t.improvement_ratio),
        trials,
    };
    tracing::info!(
        scenario = %summary.scenario_name,
        trials = seeds.len(),
        mean_mse_position = summary.mean_mse_position,
        "sweep finished"
    );
    Ok(summary)
}

fn mean_of(trials: &[SeedResult], f: impl Fn(&SeedResult) -> f64) -> f64 {
    trials.iter().map(f).sum::<f64>() / trials.len() as f64
}
