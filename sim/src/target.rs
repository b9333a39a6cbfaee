//! Target trajectory models and state propagation.
//!
//! Each target has a true state [position, velocity] and a `Trajectory`
//! describing how it moves. The simulator steps the target forward in time.

use serde::{Deserialize, Serialize};
use tracker_core::GroundTruth;

/// Describes 1-D target motion.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Trajectory {
    /// x(t) = x0 + v0·t + a·t²/2
    ConstantAccel { x0: f64, v0: f64, accel: f64 },
}

impl Trajectory {
    /// x(t) = 0.1·(t² − t)
    pub fn reference() -> Self {
        Trajectory::ConstantAccel {
            x0: 0.0,
            v0: -0.1,
            accel: 0.2,
        }
    }

    /// Closed-form [position, velocity] at time `t`.
    pub fn sample(&self, t: f64) -> [f64; 2] {
        match *self {
            Trajectory::ConstantAccel { x0, v0, accel } => {
                [x0 + v0 * t + 0.5 * accel * t * t, v0 + accel * t]
            }
        }
    }

    pub fn accel(&self) -> f64 {
        match *self {
            Trajectory::ConstantAccel { accel, .. } => accel,
        }
    }
}

/// A simulated target with ground-truth state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Target {
    /// True state [position, velocity]
    pub state: [f64; 2],
    /// Simulation time of `state`
    pub time: f64,
    pub trajectory: Trajectory,
}

impl Target {
    pub fn new(trajectory: Trajectory) -> Self {
        Self {
            state: trajectory.sample(0.0),
            time: 0.0,
            trajectory,
        }
    }

    /// Propagate true state by `dt` seconds with the same kinematics the
    /// filter's A/B matrices encode.
    pub fn step(&mut self, dt: f64) {
        let a = self.trajectory.accel();
        let s = &mut self.state;
        s[0] += s[1] * dt + 0.5 * a * dt * dt;
        s[1] += a * dt;
        self.time += dt;
    }

    pub fn ground_truth(&self) -> GroundTruth {
        GroundTruth {
            time: self.time,
            position: self.state[0],
            velocity: self.state[1],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn reference_trajectory_matches_quadratic() {
        let traj = Trajectory::reference();
        for t in [0.0, 1.0, 2.5, 99.9] {
            let [p, v] = traj.sample(t);
            assert_abs_diff_eq!(p, 0.1 * (t * t - t), epsilon = 1e-9);
            assert_abs_diff_eq!(v, 0.2 * t - 0.1, epsilon = 1e-12);
        }
    }

    #[test]
    fn stepping_tracks_closed_form() {
        let traj = Trajectory::ConstantAccel {
            x0: 5.0,
            v0: 2.0,
            accel: 1.0,
        };
        let mut target = Target::new(traj);
        for _ in 0..100 {
            target.step(0.1);
        }
        let [p, v] = traj.sample(target.time);
        assert_abs_diff_eq!(target.state[0], p, epsilon = 1e-9);
        assert_abs_diff_eq!(target.state[1], v, epsilon = 1e-9);
        assert_abs_diff_eq!(target.time, 10.0, epsilon = 1e-9);
    }
}
