//! Steering behaviors.
//!
//! A controller turns the robot's sensor readings and the supervisor's pose estimate into a
//! unicycle command. Controllers never touch the actuators themselves. Behaviors that steer
//! towards a heading keep a [`Pid`] whose memory lives as long as the controller.

use std::{fmt, time::Duration};

use once_cell::sync::Lazy;
use serde::Deserialize;
use thiserror::Error;

use super::{Angle, Pose, Position, Robot, Unicycle};

/// Mounting directions of the infrared ring, front sensors in the middle.
static SENSOR_HEADINGS: Lazy<[Angle; 9]> = Lazy::new(|| {
    [128.0, 75.0, 42.0, 13.0, -13.0, -42.0, -75.0, -128.0, 180.0].map(Angle::from_deg)
});

/// Front-biased weights of the obstacle vectors. Rear sensors do not contribute.
const SENSOR_GAINS: [f64; 9] = [0.0, 2.0, 8.0, 10.0, 10.0, 8.0, 2.0, 0.0, 0.0];

const REAR_SENSORS: [usize; 3] = [0, 7, 8];

/// Rear readings are replaced by this distance so they never count as the closest obstacle.
const REAR_SENSOR_DISTANCE: f64 = 1.0;

/// Readings below this are noise floor of the infrared sensors.
const MIN_RAW_READING: f64 = 18.0;

const HEADING_GAIN: f64 = 1.75;

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ControllerKind {
    AvoidObstacles,
    #[default]
    GoToGoal,
    BlendedAvoidAndSeek,
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ControllerKind::AvoidObstacles => "avoid obstacles",
            ControllerKind::GoToGoal => "go to goal",
            ControllerKind::BlendedAvoidAndSeek => "avoid and seek",
        })
    }
}

/// Parameters a behavior may need besides the robot state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BehaviorInputs {
    pub goal: Option<Position>,
    /// Linear velocity to drive at.
    pub v: f64,
    /// Obstacle distance below which only avoidance counts.
    pub d_c: f64,
    /// Obstacle distance above which only the goal counts.
    pub d_s: f64,
}

#[derive(Error, Debug, PartialEq)]
pub enum ControllerError {
    #[error("missing behavior input: {0}")]
    MissingInput(&'static str),
    #[error("expected {expected} proximity sensors, robot has {found}")]
    SensorCount { expected: usize, found: usize },
    #[error("too-close distance {d_c} must be below safe distance {d_s}")]
    InvalidThresholds { d_c: f64, d_s: f64 },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Controller {
    AvoidObstacles(AvoidObstacles),
    GoToGoal(GoToGoal),
    BlendedAvoidAndSeek(BlendedAvoidAndSeek),
}

impl Controller {
    pub fn new(kind: ControllerKind) -> Self {
        match kind {
            ControllerKind::AvoidObstacles => Controller::AvoidObstacles(AvoidObstacles::default()),
            ControllerKind::GoToGoal => Controller::GoToGoal(GoToGoal::default()),
            ControllerKind::BlendedAvoidAndSeek => {
                Controller::BlendedAvoidAndSeek(BlendedAvoidAndSeek::default())
            }
        }
    }

    pub fn kind(&self) -> ControllerKind {
        match self {
            Controller::AvoidObstacles(_) => ControllerKind::AvoidObstacles,
            Controller::GoToGoal(_) => ControllerKind::GoToGoal,
            Controller::BlendedAvoidAndSeek(_) => ControllerKind::BlendedAvoidAndSeek,
        }
    }

    pub fn pid(&self) -> Option<&Pid> {
        match self {
            Controller::AvoidObstacles(_) => None,
            Controller::GoToGoal(c) => Some(&c.pid),
            Controller::BlendedAvoidAndSeek(c) => Some(&c.pid),
        }
    }

    /// Checks that the robot carries the sensors this behavior reads.
    pub fn check_robot(&self, robot: &Robot) -> Result<(), ControllerError> {
        match self {
            Controller::GoToGoal(_) => Ok(()),
            Controller::AvoidObstacles(_) | Controller::BlendedAvoidAndSeek(_) => {
                check_sensor_count(robot)
            }
        }
    }

    pub fn execute(
        &mut self,
        robot: &Robot,
        estimate: &Pose,
        dt: Duration,
        inputs: &BehaviorInputs,
    ) -> Result<Unicycle, ControllerError> {
        match self {
            Controller::AvoidObstacles(c) => c.execute(robot, estimate, inputs),
            Controller::GoToGoal(c) => c.execute(estimate, dt, inputs),
            Controller::BlendedAvoidAndSeek(c) => c.execute(robot, estimate, dt, inputs),
        }
    }
}

/// Discrete PID with memory carried across calls.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pid {
    k_p: f64,
    k_i: f64,
    k_d: f64,
    integral: f64,
    previous_error: f64,
}

impl Pid {
    pub const fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            integral: 0.0,
            previous_error: 0.0,
        }
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn previous_error(&self) -> f64 {
        self.previous_error
    }

    pub fn step(&mut self, error: f64, dt: Duration) -> f64 {
        let dt = dt.as_secs_f64();
        let derivative = if dt > f64::EPSILON {
            (error - self.previous_error) / dt
        } else {
            0.0
        };

        let output =
            self.k_p * error + self.k_i * (self.integral + error * dt) + self.k_d * derivative;

        self.integral += error * dt;
        self.previous_error = error;

        output
    }
}

/// Steers away from whatever the front sensors see.
#[derive(Clone, Debug, PartialEq)]
pub struct AvoidObstacles {
    k_w: f64,
}

impl Default for AvoidObstacles {
    fn default() -> Self {
        Self { k_w: HEADING_GAIN }
    }
}

impl AvoidObstacles {
    /// Only the angular velocity is computed here. The linear velocity is taken from `inputs`.
    fn execute(
        &self,
        robot: &Robot,
        estimate: &Pose,
        inputs: &BehaviorInputs,
    ) -> Result<Unicycle, ControllerError> {
        let distances = sensed_distances(robot)?;
        let u = obstacle_vector(&distances, estimate);
        let theta_d = u.bearing();
        let w = self.k_w * u.norm() * (theta_d - estimate.heading()).sin();

        Ok(Unicycle::new(inputs.v, w))
    }
}

/// Heads for the goal with a PID on the heading error.
#[derive(Clone, Debug, PartialEq)]
pub struct GoToGoal {
    pid: Pid,
}

impl Default for GoToGoal {
    fn default() -> Self {
        Self {
            pid: Pid::new(10.0, 0.0, 0.0),
        }
    }
}

impl GoToGoal {
    fn execute(
        &mut self,
        estimate: &Pose,
        dt: Duration,
        inputs: &BehaviorInputs,
    ) -> Result<Unicycle, ControllerError> {
        let goal = inputs.goal.ok_or(ControllerError::MissingInput("goal"))?;
        let delta = goal - estimate.position();

        let error = heading_error(delta.bearing(), estimate.heading());
        let w = self.pid.step(error, dt);

        // Unreachable. The supervisor stops the robot at the goal.
        if delta.norm() < 0.0 {
            return Ok(Unicycle::default());
        }

        Ok(Unicycle::new(inputs.v, w))
    }
}

/// Blends the avoidance heading and the goal heading depending on how close the nearest
/// obstacle is.
#[derive(Clone, Debug, PartialEq)]
pub struct BlendedAvoidAndSeek {
    pid: Pid,
}

impl Default for BlendedAvoidAndSeek {
    fn default() -> Self {
        Self {
            pid: Pid::new(10.0, 0.0, 0.0),
        }
    }
}

impl BlendedAvoidAndSeek {
    fn execute(
        &mut self,
        robot: &Robot,
        estimate: &Pose,
        dt: Duration,
        inputs: &BehaviorInputs,
    ) -> Result<Unicycle, ControllerError> {
        let goal = inputs.goal.ok_or(ControllerError::MissingInput("goal"))?;
        if inputs.d_c >= inputs.d_s {
            return Err(ControllerError::InvalidThresholds {
                d_c: inputs.d_c,
                d_s: inputs.d_s,
            });
        }

        let mut distances = sensed_distances(robot)?;
        for i in REAR_SENSORS {
            distances[i] = REAR_SENSOR_DISTANCE;
        }
        let d_obs = distances.iter().copied().fold(f64::INFINITY, f64::min);

        let theta_ao = obstacle_vector(&distances, estimate).bearing();
        let theta_gtg = (goal - estimate.position()).bearing();
        let alpha = blend_weight(d_obs, inputs.d_c, inputs.d_s);
        let theta_d = theta_gtg + (theta_ao - theta_gtg).wrapped() * alpha;

        let error = heading_error(theta_d, estimate.heading());
        let w = self.pid.step(error, dt);

        Ok(Unicycle::new(inputs.v, w))
    }
}

/// Weight of the avoidance heading: 1 at or below `d_c`, 0 at or above `d_s`, linear between.
pub fn blend_weight(d_obs: f64, d_c: f64, d_s: f64) -> f64 {
    ((d_s - d_obs) / (d_s - d_c)).clamp(0.0, 1.0)
}

fn heading_error(desired: Angle, current: Angle) -> f64 {
    (desired - current).wrapped().into()
}

fn check_sensor_count(robot: &Robot) -> Result<(), ControllerError> {
    let found = robot.sensors().len();
    if found != SENSOR_GAINS.len() {
        return Err(ControllerError::SensorCount {
            expected: SENSOR_GAINS.len(),
            found,
        });
    }
    Ok(())
}

/// Distances recovered from the raw readings through the sensors' response curve.
fn sensed_distances(robot: &Robot) -> Result<Vec<f64>, ControllerError> {
    check_sensor_count(robot)?;
    Ok(robot
        .sensors()
        .iter()
        .map(|s| {
            s.mount()
                .curve
                .to_distance(s.raw_range().max(MIN_RAW_READING))
        })
        .collect())
}

/// Gain-weighted sum of the sensed distances as vectors in the world orientation. Points
/// towards free space.
fn obstacle_vector(distances: &[f64], estimate: &Pose) -> Position {
    SENSOR_HEADINGS
        .iter()
        .zip(distances)
        .zip(SENSOR_GAINS)
        .fold(Position::default(), |sum, ((heading, distance), gain)| {
            sum + Position::new(*distance, 0.0).rotate_vector(*heading + estimate.heading())
                * gain
        })
}
