//! Scenario definitions.
//!
//! Each scenario is a named pairing of a filter configuration, a true
//! trajectory and a sensor. All scenarios are deterministic given the same seed.

use crate::target::Trajectory;
use serde::{Deserialize, Serialize};
use tracker_core::KfConfig;

/// Which pre-defined scenario to load.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum ScenarioKind {
    /// Truth 0.1·(t² − t) for 100 s, sensor σ = 50 m, default filter
    Reference,
    /// Truth accelerates with exactly the filter's control input, sensor σ = σ_z
    Matched,
    /// Near-zero σ_z and a perfect sensor
    NearNoiseless,
    /// No control input, truth at constant 3 m/s
    Coasting,
}

/// A fully configured simulation scenario.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub filter: KfConfig,
    pub trajectory: Trajectory,
    /// Std dev of the simulated sensor noise (m); may differ from `filter.sigma_z`
    pub sensor_noise_std: f64,
    /// Number of predict/update cycles
    pub steps: usize,
    /// Leading steps excluded from metrics
    pub burn_in: u64,
}

impl Scenario {
    /// Build the named scenario.
    pub fn build(kind: ScenarioKind) -> Self {
        match kind {
            ScenarioKind::Reference => Self::reference(),
            ScenarioKind::Matched => Self::matched(),
            ScenarioKind::NearNoiseless => Self::near_noiseless(),
            ScenarioKind::Coasting => Self::coasting(),
        }
    }

    /// Swap in a different filter configuration, keeping truth and sensor.
    pub fn with_filter(mut self, filter: KfConfig) -> Self {
        self.filter = filter;
        self
    }

    pub fn duration(&self) -> f64 {
        self.steps as f64 * self.filter.dt
    }

    // -----------------------------------------------------------------------
    // Scenario 1: Reference
    // -----------------------------------------------------------------------
    fn reference() -> Self {
        Self {
            name: "reference".into(),
            filter: KfConfig::default(),
            trajectory: Trajectory::reference(),
            sensor_noise_std: 50.0,
            steps: 1000,
            burn_in: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Scenario 2: Matched
    // -----------------------------------------------------------------------
    fn matched() -> Self {
        let filter = KfConfig::default();
        Self {
            name: "matched".into(),
            filter,
            trajectory: Trajectory::ConstantAccel {
                x0: 0.0,
                v0: 0.0,
                accel: filter.control_input,
            },
            sensor_noise_std: filter.sigma_z,
            steps: 1000,
            burn_in: 50,
        }
    }

    // -----------------------------------------------------------------------
    // Scenario 3: Near-noiseless
    // -----------------------------------------------------------------------
    fn near_noiseless() -> Self {
        let filter = KfConfig {
            sigma_z: 1e-4,
            ..KfConfig::default()
        };
        Self {
            name: "near-noiseless".into(),
            filter,
            trajectory: Trajectory::ConstantAccel {
                x0: 0.0,
                v0: 0.0,
                accel: filter.control_input,
            },
            sensor_noise_std: 0.0,
            steps: 200,
            burn_in: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Scenario 4: Coasting
    // -----------------------------------------------------------------------
    fn coasting() -> Self {
        let filter = KfConfig {
            control_input: 0.0,
            ..KfConfig::default()
        };
        Self {
            name: "coasting".into(),
            filter,
            trajectory: Trajectory::ConstantAccel {
                x0: 0.0,
                v0: 3.0,
                accel: 0.0,
            },
            sensor_noise_std: filter.sigma_z,
            steps: 1000,
            burn_in: 100,
        }
    }
}
