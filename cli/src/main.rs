//! `katrack` CLI: scenario runs, seed sweeps, replay import/export.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sim::replay::{load_replay, replay_log, save_replay, ReplayLog};
use sim::runner::{run_sweep, run_trial};
use sim::scenarios::{Scenario, ScenarioKind};
use std::path::{Path, PathBuf};
use tracker_core::KfConfig;

#[derive(Parser)]
#[command(name = "katrack", about = "Constant-acceleration Kalman tracker CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a named scenario once and output metrics.
    Run {
        #[arg(value_enum)]
        scenario: ScenarioKind,
        /// Random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// JSON file overriding the scenario's filter config
        #[arg(long)]
        filter_config: Option<PathBuf>,
        /// Output metrics to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
        /// Also save the full replay log
        #[arg(long)]
        save_replay: Option<PathBuf>,
    },
    /// Run a scenario over many seeds in parallel.
    Sweep {
        #[arg(value_enum)]
        scenario: ScenarioKind,
        /// Number of seeds
        #[arg(long, default_value_t = 32)]
        seeds: u64,
        /// First seed
        #[arg(long, default_value_t = 0)]
        start_seed: u64,
        /// JSON file overriding the scenario's filter config
        #[arg(long)]
        filter_config: Option<PathBuf>,
        /// Output the sweep summary to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Re-run a recorded log and check the estimates reproduce.
    Replay {
        /// Path to replay JSON file
        input: PathBuf,
        /// Maximum allowed deviation from the recorded estimates
        #[arg(long, default_value_t = 1e-9)]
        tolerance: f64,
        /// Output metrics to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            scenario,
            seed,
            filter_config,
            output,
            save_replay: save_path,
        } => {
            let scenario = build_scenario(scenario, filter_config.as_deref())?;
            run_scenario(&scenario, seed, output.as_deref(), save_path.as_deref())?;
        }
        Commands::Sweep {
            scenario,
            seeds,
            start_seed,
            filter_config,
            output,
        } => {
            let scenario = build_scenario(scenario, filter_config.as_deref())?;
            sweep_scenario(&scenario, start_seed, seeds, output.as_deref())?;
        }
        Commands::Replay {
            input,
            tolerance,
            output,
        } => {
            run_replay(&input, tolerance, output.as_deref())?;
        }
    }

    Ok(())
}

fn build_scenario(kind: ScenarioKind, filter_config: Option<&Path>) -> Result<Scenario> {
    let scenario = Scenario::build(kind);
    let Some(path) = filter_config else {
        return Ok(scenario);
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading filter config {}", path.display()))?;
    let filter: KfConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing filter config {}", path.display()))?;
    filter
        .validate()
        .with_context(|| format!("filter config {}", path.display()))?;
    tracing::info!(?filter, "using filter config override");
    Ok(scenario.with_filter(filter))
}

fn run_scenario(
    scenario: &Scenario,
    seed: u64,
    output_path: Option<&Path>,
    replay_path: Option<&Path>,
) -> Result<()> {
    println!(
        "Running scenario '{}' (seed={}, duration={:.1}s, dt={})...",
        scenario.name,
        seed,
        scenario.duration(),
        scenario.filter.dt
    );

    let start = std::time::Instant::now();
    let trial = run_trial(scenario, seed)?;
    let elapsed = start.elapsed();
    let m = &trial.metrics;

    println!(
        "Done: {} steps, elapsed={:.3}s",
        trial.steps.len(),
        elapsed.as_secs_f64()
    );
    println!(
        "Position MSE: filtered={:.4} predicted={:.4} raw={:.4} (x{:.2} better than raw)",
        m.mse_position(),
        m.mse_prediction(),
        m.mse_measurement(),
        m.improvement_ratio(),
    );
    println!("Velocity RMSE: {:.4}", m.rmse_velocity());
    if let Some(last) = trial.steps.last() {
        println!(
            "Final estimate: pos={:.3} vel={:.3} (truth pos={:.3} vel={:.3})",
            last.posterior[0], last.posterior[1], last.truth[0], last.truth[1]
        );
    }

    // Save replay if requested
    if let Some(rpath) = replay_path {
        save_replay(&ReplayLog::from(&trial), rpath)?;
        println!("Replay saved to {}", rpath.display());
    }

    // Output metrics
    if let Some(opath) = output_path {
        let json = serde_json::json!({
            "scenario": scenario.name,
            "seed": seed,
            "filter": scenario.filter,
            "elapsed_s": elapsed.as_secs_f64(),
            "steps": trial.steps.len(),
            "mse_position": m.mse_position(),
            "mse_prediction": m.mse_prediction(),
            "mse_measurement": m.mse_measurement(),
            "rmse_velocity": m.rmse_velocity(),
            "improvement_ratio": m.improvement_ratio(),
        });
        std::fs::write(opath, serde_json::to_string_pretty(&json)?)?;
        println!("Metrics saved to {}", opath.display());
    }

    Ok(())
}

fn sweep_scenario(
    scenario: &Scenario,
    start_seed: u64,
    n_seeds: u64,
    output_path: Option<&Path>,
) -> Result<()> {
    let seeds: Vec<u64> = (start_seed..start_seed.saturating_add(n_seeds)).collect();
    println!(
        "Sweeping scenario '{}' over {} seeds...",
        scenario.name,
        seeds.len()
    );

    let start = std::time::Instant::now();
    let summary = run_sweep(scenario, &seeds)?;
    println!(
        "Done: elapsed={:.3}s, filtered MSE mean={:.4} min={:.4} max={:.4}, raw MSE mean={:.4}, mean improvement x{:.2}",
        start.elapsed().as_secs_f64(),
        summary.mean_mse_position,
        summary.min_mse_position,
        summary.max_mse_position,
        summary.mean_mse_measurement,
        summary.mean_improvement_ratio,
    );

    if let Some(opath) = output_path {
        std::fs::write(opath, serde_json::to_string_pretty(&summary)?)?;
        println!("Summary saved to {}", opath.display());
    }

    Ok(())
}

fn run_replay(input: &Path, tolerance: f64, output_path: Option<&Path>) -> Result<()> {
    let log = load_replay(input)?;
    println!(
        "Replaying '{}' (seed={}, {} steps)...",
        log.scenario_name,
        log.seed,
        log.steps.len()
    );

    let report = replay_log(&log)?;
    println!(
        "Replay done: max state deviation={:e}, max covariance deviation={:e}",
        report.max_state_deviation, report.max_cov_deviation
    );

    if let Some(opath) = output_path {
        let json = serde_json::json!({
            "scenario": log.scenario_name,
            "seed": log.seed,
            "steps": report.steps,
            "max_state_deviation": report.max_state_deviation,
            "max_cov_deviation": report.max_cov_deviation,
            "mse_position": report.metrics.mse_position(),
            "mse_measurement": report.metrics.mse_measurement(),
        });
        std::fs::write(opath, serde_json::to_string_pretty(&json)?)?;
    }

    if report.max_deviation() > tolerance {
        bail!(
            "replay deviates from recorded estimates by {:e} (tolerance {:e})",
            report.max_deviation(),
            tolerance
        );
    }

    Ok(())
}
