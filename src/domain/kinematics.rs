//! Differential-drive kinematics.
//!
//! Wheel speeds are angular velocities of the wheels (rad/s). The unicycle model describes the
//! same motion as a linear velocity `v` along the heading and an angular velocity `w`.

use std::time::Duration;

use nalgebra::{Matrix2, Vector2};

use super::Pose;

/// Linear and angular velocity of the robot body.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Unicycle {
    pub v: f64,
    pub w: f64,
}

impl Unicycle {
    pub const fn new(v: f64, w: f64) -> Self {
        Self { v, w }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct WheelSpeeds {
    pub right: f64,
    pub left: f64,
}

impl WheelSpeeds {
    pub const fn new(right: f64, left: f64) -> Self {
        Self { right, left }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct DifferentialDrive {
    wheel_radius: f64,
    track_length: f64,
}

impl DifferentialDrive {
    pub const fn new(wheel_radius: f64, track_length: f64) -> Self {
        Self {
            wheel_radius,
            track_length,
        }
    }

    pub fn wheel_radius(&self) -> f64 {
        self.wheel_radius
    }

    pub fn track_length(&self) -> f64 {
        self.track_length
    }

    /// Integrates the pose over `dt` with a single forward Euler step.
    pub fn apply_dynamics(&self, pose: Pose, dt: Duration, speeds: WheelSpeeds) -> Pose {
        let Unicycle { v, w } = self.diff_to_uni(speeds);
        let dt = dt.as_secs_f64();
        let theta = pose.theta();

        Pose::new(
            pose.x() + dt * v * theta.cos(),
            pose.y() + dt * v * theta.sin(),
            theta + dt * w,
        )
    }

    pub fn uni_to_diff(&self, command: Unicycle) -> WheelSpeeds {
        let speeds = self.unicycle_to_wheels() * Vector2::new(command.v, command.w);
        WheelSpeeds::new(speeds[0], speeds[1])
    }

    pub fn diff_to_uni(&self, speeds: WheelSpeeds) -> Unicycle {
        let command = self.wheels_to_unicycle() * Vector2::new(speeds.right, speeds.left);
        Unicycle::new(command[0], command[1])
    }

    /// v = R/2 (v_r + v_l), w = R/L (v_r - v_l)
    fn wheels_to_unicycle(&self) -> Matrix2<f64> {
        let r = self.wheel_radius;
        let l = self.track_length;
        Matrix2::new(r / 2.0, r / 2.0, r / l, -r / l)
    }

    /// Closed-form inverse of [`Self::wheels_to_unicycle`].
    fn unicycle_to_wheels(&self) -> Matrix2<f64> {
        let r = self.wheel_radius;
        let l = self.track_length;
        Matrix2::new(1.0 / r, l / (2.0 * r), 1.0 / r, -l / (2.0 * r))
    }
}
