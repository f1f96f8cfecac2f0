//! Scenario files.
//!
//! A scenario lists the robots with their controllers, the static obstacles and the tick length
//! of a simulation run:
//!
//! ```yaml
//! time_step: 0.05
//! supervisor: {nominal_velocity: 0.1, too_close: 0.08, safe: 0.1, stop_distance: 0.02}
//! robots:
//!   - type: khepera3
//!     controller: blended_avoid_and_seek
//!     pose: {x: 0.0, y: 0.0, theta: 0.0}
//!     goal: [0.5, 0.5]
//! obstacles:
//!   - pose: {x: 0.3, y: 0.0, theta: 0.0}
//!     geometry: [[0, 0], [0.1, 0], [0.1, 0.1], [0, 0.1]]
//! random_obstacles: {count: 10, seed: 42, extent: 1.0, size: 0.05}
//! ```
//!
//! Robot types and controller names are resolved through closed registries, so unknown
//! identifiers are rejected while parsing.

use std::{f64::consts::PI, path::Path, time::Duration};

use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{
    ControllerError, ControllerKind, GeometryError, Obstacle, Polygon, Pose, Position, Robot,
    RobotError, RobotModel, Simulation, Supervisor, SupervisorConfig, World,
};

const RNG_SEED: u64 = 19878367467712;

/// Free radius around robot start positions and goals in which no random obstacle is placed.
const CLEARANCE: f64 = 0.2;

const MAX_ATTEMPTS_PER_OBSTACLE: usize = 100;

const MAX_RANDOM_OBSTACLES: usize = 10_000;

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse scenario: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid time step {0}, must be a positive number of seconds")]
    InvalidTimeStep(f64),
    #[error("invalid random obstacles: {0}")]
    InvalidRandomObstacles(&'static str),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Robot(#[from] RobotError),
    #[error(transparent)]
    Controller(#[from] ControllerError),
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Tick length in seconds. Checked when the scenario is read.
    #[serde(default = "default_time_step")]
    time_step: f64,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    pub robots: Vec<RobotSpec>,
    #[serde(default)]
    pub obstacles: Vec<ObstacleSpec>,
    #[serde(default)]
    pub random_obstacles: Option<RandomObstacles>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RobotSpec {
    #[serde(rename = "type", default)]
    pub model: RobotModel,
    #[serde(default)]
    pub controller: ControllerKind,
    #[serde(default)]
    pub pose: Pose,
    /// Defaults to the origin.
    #[serde(default)]
    pub goal: Option<[f64; 2]>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ObstacleSpec {
    #[serde(default)]
    pub pose: Pose,
    /// Polygon vertices in the obstacle frame.
    pub geometry: Vec<[f64; 2]>,
}

/// Square rocks scattered uniformly over `[-extent, extent]²`.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RandomObstacles {
    pub count: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    pub extent: f64,
    /// Edge length of a rock.
    pub size: f64,
}

fn default_time_step() -> f64 {
    0.05
}

fn default_seed() -> u64 {
    RNG_SEED
}

impl Default for Scenario {
    /// One Khepera III in a walled arena with a few rocks between it and its goal.
    fn default() -> Self {
        const HALF_WIDTH: f64 = 0.8;
        const THICKNESS: f64 = 0.05;

        let wall = |x: f64, y: f64, theta: f64| ObstacleSpec {
            pose: Pose::new(x, y, theta),
            geometry: vec![
                [-HALF_WIDTH - THICKNESS, 0.0],
                [HALF_WIDTH + THICKNESS, 0.0],
                [HALF_WIDTH + THICKNESS, THICKNESS],
                [-HALF_WIDTH - THICKNESS, THICKNESS],
            ],
        };

        Self {
            time_step: default_time_step(),
            supervisor: SupervisorConfig::default(),
            robots: vec![RobotSpec {
                model: RobotModel::Khepera3,
                controller: ControllerKind::BlendedAvoidAndSeek,
                pose: Pose::new(-0.5, -0.5, 0.25 * PI),
                goal: Some([0.5, 0.5]),
            }],
            obstacles: vec![
                wall(0.0, HALF_WIDTH, 0.0),
                wall(0.0, -HALF_WIDTH, PI),
                wall(HALF_WIDTH, 0.0, -0.5 * PI),
                wall(-HALF_WIDTH, 0.0, 0.5 * PI),
            ],
            random_obstacles: Some(RandomObstacles {
                count: 8,
                seed: RNG_SEED,
                extent: 0.6,
                size: 0.06,
            }),
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = serde_yaml::from_str(yaml)?;
        match Duration::try_from_secs_f64(scenario.time_step) {
            Ok(step) if !step.is_zero() => {}
            _ => return Err(ScenarioError::InvalidTimeStep(scenario.time_step)),
        }
        if let Some(random) = &scenario.random_obstacles {
            random.validate()?;
        }
        Ok(scenario)
    }

    pub fn time_step(&self) -> Duration {
        Duration::try_from_secs_f64(self.time_step).unwrap_or_default()
    }

    pub fn build(&self) -> Result<Simulation, ScenarioError> {
        let supervisors = self
            .robots
            .iter()
            .map(|spec| {
                let robot = Robot::new(spec.pose, spec.model.config())?;
                let goal = spec.goal.map(Position::from).unwrap_or_default();
                Ok(Supervisor::new(robot, spec.controller, self.supervisor)?.with_goal(goal))
            })
            .collect::<Result<Vec<_>, ScenarioError>>()?;

        let mut obstacles = self
            .obstacles
            .iter()
            .map(|spec| {
                let vertices = spec.geometry.iter().copied().map(Position::from).collect();
                Ok(Obstacle::new(spec.pose, Polygon::new(vertices)?))
            })
            .collect::<Result<Vec<_>, ScenarioError>>()?;

        if let Some(random) = self.random_obstacles {
            obstacles.extend(random.generate(&self.keep_out_zones())?);
        }

        debug!(
            "scenario with {} robots and {} obstacles",
            supervisors.len(),
            obstacles.len()
        );

        Ok(Simulation::new(World::new(supervisors, obstacles)))
    }

    fn keep_out_zones(&self) -> Vec<Position> {
        self.robots
            .iter()
            .flat_map(|spec| {
                [
                    spec.pose.position(),
                    spec.goal.map(Position::from).unwrap_or_default(),
                ]
            })
            .collect()
    }
}

impl RandomObstacles {
    fn validate(&self) -> Result<(), ScenarioError> {
        if !(self.extent.is_finite() && self.extent > 0.0) {
            return Err(ScenarioError::InvalidRandomObstacles(
                "extent must be a positive number",
            ));
        }
        if !(self.size.is_finite() && self.size > 0.0) {
            return Err(ScenarioError::InvalidRandomObstacles(
                "size must be a positive number",
            ));
        }
        if self.count > MAX_RANDOM_OBSTACLES {
            return Err(ScenarioError::InvalidRandomObstacles("too many obstacles"));
        }
        Ok(())
    }

    /// Places up to `count` rocks, each at least [`CLEARANCE`] away from every keep-out point.
    /// The same seed always yields the same rocks.
    fn generate(&self, keep_out: &[Position]) -> Result<Vec<Obstacle>, ScenarioError> {
        self.validate()?;

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let h = self.size / 2.0;
        let mut obstacles = vec![];

        for _ in 0..self.count.saturating_mul(MAX_ATTEMPTS_PER_OBSTACLE) {
            if obstacles.len() == self.count {
                break;
            }

            let position = Position::new(
                rng.random_range(-self.extent..=self.extent),
                rng.random_range(-self.extent..=self.extent),
            );
            let theta = rng.random_range(0.0..0.5 * PI);

            if keep_out
                .iter()
                .any(|p| p.distance(position) < CLEARANCE + h)
            {
                continue;
            }

            obstacles.push(Obstacle::new(
                Pose::new(position.x(), position.y(), theta),
                Polygon::new(vec![
                    Position::new(-h, -h),
                    Position::new(h, -h),
                    Position::new(h, h),
                    Position::new(-h, h),
                ])?,
            ));
        }

        Ok(obstacles)
    }
}
