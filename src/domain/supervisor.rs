//! Per-robot decision maker.
//!
//! The supervisor owns its robot. Each tick it plans a command with the active controller,
//! hands the resulting wheel speeds to the robot and, once the world has moved on, updates its
//! pose estimate from the encoder ticks. The true pose of the robot is never read.

use std::time::Duration;

use log::{debug, info};
use serde::Deserialize;

use super::{
    BehaviorInputs, Controller, ControllerError, ControllerKind, Pose, Position, Robot, WheelID,
    WheelSpeeds,
};

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Linear velocity handed to every behavior.
    pub nominal_velocity: f64,
    /// Obstacle distance below which only avoidance counts.
    pub too_close: f64,
    /// Obstacle distance above which only the goal counts.
    pub safe: f64,
    /// The goal counts as reached once the estimate is this close.
    pub stop_distance: f64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            nominal_velocity: 0.1,
            too_close: 0.08,
            safe: 0.1,
            stop_distance: 0.02,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct EncoderTicks {
    right: i64,
    left: i64,
}

impl EncoderTicks {
    fn read(robot: &Robot) -> Self {
        Self {
            right: robot.encoder_ticks(WheelID::Right),
            left: robot.encoder_ticks(WheelID::Left),
        }
    }
}

/// One controller of every kind, so that switching back resumes where a behavior left off.
#[derive(Clone, Debug, PartialEq)]
struct Controllers {
    avoid_obstacles: Controller,
    go_to_goal: Controller,
    blended_avoid_and_seek: Controller,
}

impl Controllers {
    fn new() -> Self {
        Self {
            avoid_obstacles: Controller::new(ControllerKind::AvoidObstacles),
            go_to_goal: Controller::new(ControllerKind::GoToGoal),
            blended_avoid_and_seek: Controller::new(ControllerKind::BlendedAvoidAndSeek),
        }
    }

    fn get(&self, kind: ControllerKind) -> &Controller {
        match kind {
            ControllerKind::AvoidObstacles => &self.avoid_obstacles,
            ControllerKind::GoToGoal => &self.go_to_goal,
            ControllerKind::BlendedAvoidAndSeek => &self.blended_avoid_and_seek,
        }
    }

    fn get_mut(&mut self, kind: ControllerKind) -> &mut Controller {
        match kind {
            ControllerKind::AvoidObstacles => &mut self.avoid_obstacles,
            ControllerKind::GoToGoal => &mut self.go_to_goal,
            ControllerKind::BlendedAvoidAndSeek => &mut self.blended_avoid_and_seek,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Supervisor {
    robot: Robot,
    controllers: Controllers,
    active: ControllerKind,
    goal: Position,
    estimate: Pose,
    previous_ticks: EncoderTicks,
    reached_goal: bool,
    config: SupervisorConfig,
}

impl Supervisor {
    /// Starts with the estimate at the robot's initial pose and the goal at the origin. Only the
    /// initially active behavior is checked against the robot's sensors.
    pub fn new(
        robot: Robot,
        active: ControllerKind,
        config: SupervisorConfig,
    ) -> Result<Self, ControllerError> {
        if config.too_close >= config.safe {
            return Err(ControllerError::InvalidThresholds {
                d_c: config.too_close,
                d_s: config.safe,
            });
        }

        let controllers = Controllers::new();
        controllers.get(active).check_robot(&robot)?;

        Ok(Self {
            estimate: robot.pose(),
            previous_ticks: EncoderTicks::read(&robot),
            robot,
            controllers,
            active,
            goal: Position::default(),
            reached_goal: false,
            config,
        })
    }

    pub fn with_goal(self, goal: Position) -> Self {
        Self { goal, ..self }
    }

    pub fn robot(&self) -> &Robot {
        &self.robot
    }

    pub(crate) fn robot_mut(&mut self) -> &mut Robot {
        &mut self.robot
    }

    /// Pose as reconstructed from the wheel encoders.
    pub fn estimate(&self) -> Pose {
        self.estimate
    }

    pub fn goal(&self) -> Position {
        self.goal
    }

    pub fn reached_goal(&self) -> bool {
        self.reached_goal
    }

    pub fn active_controller(&self) -> ControllerKind {
        self.active
    }

    pub fn controller(&self, kind: ControllerKind) -> &Controller {
        self.controllers.get(kind)
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn set_goal(&mut self, goal: Position) {
        info!("new goal ({:.3}, {:.3})", goal.x(), goal.y());
        self.goal = goal;
        self.reached_goal = false;
    }

    /// Switches behaviors. Every controller keeps its internal state while inactive.
    pub fn set_controller(&mut self, kind: ControllerKind) {
        if kind != self.active {
            info!("switching controller from {} to {}", self.active, kind);
            self.active = kind;
        }
    }

    /// Checks that the active behavior can run on this robot.
    pub fn check(&self) -> Result<(), ControllerError> {
        self.controllers.get(self.active).check_robot(&self.robot)
    }

    /// Computes the wheel speeds for the next tick. Once the goal is reached the robot is told to
    /// stand still and the controller is no longer consulted.
    pub fn plan(&mut self, dt: Duration) -> Result<WheelSpeeds, ControllerError> {
        if self.estimate.position().distance(self.goal) <= self.config.stop_distance {
            if !self.reached_goal {
                info!(
                    "goal ({:.3}, {:.3}) reached after {}",
                    self.goal.x(),
                    self.goal.y(),
                    self.active
                );
                self.reached_goal = true;
            }
            return Ok(WheelSpeeds::default());
        }

        let inputs = BehaviorInputs {
            goal: Some(self.goal),
            v: self.config.nominal_velocity,
            d_c: self.config.too_close,
            d_s: self.config.safe,
        };
        let kind = self.active;
        let controller = self.controllers.get_mut(kind);
        let command = controller.execute(&self.robot, &self.estimate, dt, &inputs)?;
        match controller.pid() {
            Some(pid) => debug!(
                "{}: v = {:.4}, w = {:.4}, heading error {:.4}",
                kind,
                command.v,
                command.w,
                pid.previous_error()
            ),
            None => debug!("{}: v = {:.4}, w = {:.4}", kind, command.v, command.w),
        }

        Ok(self.robot.drive().uni_to_diff(command))
    }

    pub(crate) fn actuate(&mut self, speeds: WheelSpeeds) {
        self.robot.set_wheel_speeds(speeds);
    }

    pub(crate) fn advance(&mut self, dt: Duration) {
        self.robot.execute(dt);
    }

    /// Dead reckoning from the tick deltas since the last update. The translation is applied
    /// along the heading held before this update.
    pub fn update_odometry(&mut self) {
        let ticks = EncoderTicks::read(&self.robot);
        let drive = self.robot.drive();
        let distance = |wheel_id: WheelID, delta: i64| {
            self.robot.encoder(wheel_id).ticks_to_distance(delta) * drive.wheel_radius()
        };

        let d_right = distance(WheelID::Right, ticks.right - self.previous_ticks.right);
        let d_left = distance(WheelID::Left, ticks.left - self.previous_ticks.left);
        let d_center = (d_right + d_left) / 2.0;
        let phi = (d_right - d_left) / drive.track_length();

        let theta = self.estimate.theta();
        self.estimate = Pose::new(
            self.estimate.x() + d_center * theta.cos(),
            self.estimate.y() + d_center * theta.sin(),
            theta + phi,
        );
        self.previous_ticks = ticks;
    }
}
