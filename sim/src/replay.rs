//! Replay: serialize/deserialize trial logs and re-run them offline.

use crate::runner::{StepRecord, TrialRecord};
use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracker_core::{ConstAccelKf, EstimationMetrics, Estimator, GroundTruth, KfConfig};

/// A full recorded trial.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplayLog {
    pub scenario_name: String,
    pub seed: u64,
    pub filter: KfConfig,
    pub burn_in: u64,
    /// Per-step records in chronological order
    pub steps: Vec<StepRecord>,
}

impl From<&TrialRecord> for ReplayLog {
    fn from(trial: &TrialRecord) -> Self {
        Self {
            scenario_name: trial.scenario.name.clone(),
            seed: trial.seed,
            filter: trial.scenario.filter,
            burn_in: trial.scenario.burn_in,
            steps: trial.steps.clone(),
        }
    }
}

/// Outcome of re-running a log through a fresh filter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplayReport {
    pub steps: usize,
    /// Largest |Δ| between recorded and replayed posterior means
    pub max_state_deviation: f64,
    /// Largest |Δ| between recorded and replayed covariance entries
    pub max_cov_deviation: f64,
    pub metrics: EstimationMetrics,
}

impl ReplayReport {
    pub fn max_deviation(&self) -> f64 {
        self.max_state_deviation.max(self.max_cov_deviation)
    }
}

/// Save a replay log to a JSON file.
pub fn save_replay(log: &ReplayLog, path: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, log)?;
    Ok(())
}

/// Load a replay log from a JSON file.
pub fn load_replay(path: &Path) -> anyhow::Result<ReplayLog> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let reader = BufReader::new(file);
    let log: ReplayLog = serde_json::from_reader(reader)
        .with_context(|| format!("parsing replay log {}", path.display()))?;
    Ok(log)
}

/// Feed the recorded measurements to a fresh filter and compare estimates.
pub fn replay_log(log: &ReplayLog) -> anyhow::Result<ReplayReport> {
    ensure!(!log.steps.is_empty(), "replay log '{}' has no steps", log.scenario_name);
    let mut kf = ConstAccelKf::new(log.filter)?;
    let mut metrics = EstimationMetrics::with_burn_in(log.burn_in);
    let mut max_state_deviation = 0.0f64;
    let mut max_cov_deviation = 0.0f64;

    for (k, rec) in log.steps.iter().enumerate() {
        let out = kf
            .step(rec.measurement)
            .with_context(|| format!("replay step {k} failed"))?;
        let (x, p) = out.update.posterior.to_arrays();

        for i in 0..2 {
            max_state_deviation = max_state_deviation.max((x[i] - rec.posterior[i]).abs());
            for j in 0..2 {
                max_cov_deviation = max_cov_deviation.max((p[i][j] - rec.covariance[i][j]).abs());
            }
        }

        let truth = GroundTruth {
            time: rec.time,
            position: rec.truth[0],
            velocity: rec.truth[1],
        };
        metrics.accumulate(&truth, rec.measurement, &out.prior, &out.update.posterior.x);
    }

    tracing::info!(
        scenario = %log.scenario_name,
        steps = log.steps.len(),
        max_state_deviation,
        max_cov_deviation,
        "replay finished"
    );

    Ok(ReplayReport {
        steps: log.steps.len(),
        max_state_deviation,
        max_cov_deviation,
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::run_trial;
    use crate::scenarios::{Scenario, ScenarioKind};

    #[test]
    fn replay_reproduces_trial_exactly() {
        let trial = run_trial(&Scenario::build(ScenarioKind::Matched), 17).unwrap();
        let log = ReplayLog::from(&trial);
        let report = replay_log(&log).unwrap();
        assert_eq!(report.steps, trial.steps.len());
        assert_eq!(report.max_deviation(), 0.0);
        assert_eq!(report.metrics.mse_position(), trial.metrics.mse_position());
    }

    #[test]
    fn replay_detects_tampered_log() {
        let trial = run_trial(&Scenario::build(ScenarioKind::Coasting), 3).unwrap();
        let mut log = ReplayLog::from(&trial);
        log.steps[10].posterior[0] += 1.0;
        let report = replay_log(&log).unwrap();
        assert!(report.max_state_deviation >= 1.0 - 1e-9);
    }

    #[test]
    fn json_roundtrip_preserves_replay() {
        let trial = run_trial(&Scenario::build(ScenarioKind::Reference), 1).unwrap();
        let log = ReplayLog::from(&trial);
        let path = std::env::temp_dir().join(format!("katrack_replay_{}.json", std::process::id()));
        save_replay(&log, &path).unwrap();
        let loaded = load_replay(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.steps.len(), log.steps.len());
        assert_eq!(loaded.filter, log.filter);
        let report = replay_log(&loaded).unwrap();
        assert!(report.max_deviation() < 1e-9);
    }

    #[test]
    fn empty_log_is_rejected() {
        let log = ReplayLog {
            scenario_name: "empty".into(),
            seed: 0,
            filter: KfConfig::default(),
            burn_in: 0,
            steps: vec![],
        };
        assert!(replay_log(&log).is_err());
    }
}
