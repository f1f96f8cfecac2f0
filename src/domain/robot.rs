//! Two-wheeled differential-drive robot with wheel encoders and a ring of proximity sensors.

use std::time::Duration;

use log::trace;
use once_cell::sync::Lazy;
use serde::Deserialize;
use thiserror::Error;

use super::{
    Angle, DifferentialDrive, GeometryError, HasCollision, Polygon, Pose, Position,
    ProximitySensor, ResponseCurve, SensorMount, Surface, Unicycle, WheelEncoder, WheelSpeeds,
};

#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub struct Robot {
    pose: Pose,
    body: Surface,
    right_wheel: Wheel,
    left_wheel: Wheel,
    sensors: Vec<ProximitySensor>,
    drive: DifferentialDrive,
    config: RobotConfig,
}

impl Robot {
    pub fn new(pose: Pose, config: RobotConfig) -> Result<Self, RobotError> {
        config.validate()?;
        let body = Surface::new(pose, Polygon::new(config.body.clone())?);
        Ok(Self {
            pose,
            body,
            right_wheel: Wheel::new(config.ticks_per_revolution),
            left_wheel: Wheel::new(config.ticks_per_revolution),
            sensors: config
                .sensors
                .iter()
                .map(|mount| ProximitySensor::new(*mount))
                .collect(),
            drive: DifferentialDrive::new(config.wheel_radius, config.track_length),
            config,
        })
    }

    /// True pose, as opposed to any estimate derived from the encoders.
    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn body(&self) -> &Surface {
        &self.body
    }

    pub fn sensors(&self) -> &[ProximitySensor] {
        &self.sensors
    }

    pub(crate) fn sensors_mut(&mut self) -> &mut [ProximitySensor] {
        &mut self.sensors
    }

    pub fn drive(&self) -> &DifferentialDrive {
        &self.drive
    }

    pub fn config(&self) -> &RobotConfig {
        &self.config
    }

    pub fn wheel(&self, wheel_id: WheelID) -> &Wheel {
        match wheel_id {
            WheelID::Right => &self.right_wheel,
            WheelID::Left => &self.left_wheel,
        }
    }

    pub fn encoder(&self, wheel_id: WheelID) -> &WheelEncoder {
        &self.wheel(wheel_id).encoder
    }

    pub fn encoder_ticks(&self, wheel_id: WheelID) -> i64 {
        self.encoder(wheel_id).ticks()
    }

    /// Wheel speeds (rad/s) the motors are currently running at.
    pub fn wheel_speeds(&self) -> WheelSpeeds {
        WheelSpeeds::new(
            self.motor_to_wheel_speed(self.right_wheel.motor_speed),
            self.motor_to_wheel_speed(self.left_wheel.motor_speed),
        )
    }

    /// Commands both wheels. The resulting body velocities are limited to what the actuators
    /// can deliver and the wheel speeds are truncated to whole motor units.
    pub fn set_wheel_speeds(&mut self, speeds: WheelSpeeds) {
        let speeds = self.limit_speeds(speeds);
        self.right_wheel.motor_speed = self.wheel_to_motor_speed(speeds.right);
        self.left_wheel.motor_speed = self.wheel_to_motor_speed(speeds.left);
    }

    /// Moves the robot for `dt` at the commanded wheel speeds and advances the encoders.
    pub fn execute(&mut self, dt: Duration) {
        let speeds = self.wheel_speeds();

        self.pose = self.drive.apply_dynamics(self.pose, dt, speeds);
        self.body.set_pose(self.pose);

        self.right_wheel.encoder.update_ticks(speeds.right, dt);
        self.left_wheel.encoder.update_ticks(speeds.left, dt);

        trace!(
            "robot at ({:.4}, {:.4}, {:.4}), ticks ({}, {})",
            self.pose.x(),
            self.pose.y(),
            self.pose.theta(),
            self.right_wheel.encoder.ticks(),
            self.left_wheel.encoder.ticks()
        );
    }

    fn limit_speeds(&self, speeds: WheelSpeeds) -> WheelSpeeds {
        let Unicycle { v, w } = self.drive.diff_to_uni(speeds);
        let v = v.clamp(
            self.config.min_linear_velocity,
            self.config.max_linear_velocity,
        );
        let w = w.clamp(
            self.config.min_angular_velocity,
            self.config.max_angular_velocity,
        );
        self.drive.uni_to_diff(Unicycle::new(v, w))
    }

    fn wheel_to_motor_speed(&self, speed: f64) -> i64 {
        (speed * self.config.wheel_radius / self.config.speed_factor).floor() as i64
    }

    fn motor_to_wheel_speed(&self, motor_speed: i64) -> f64 {
        motor_speed as f64 * self.config.speed_factor / self.config.wheel_radius
    }
}

impl HasCollision for Robot {
    fn surface(&self) -> &Surface {
        &self.body
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum RobotError {
    #[error("invalid robot configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("invalid robot body: {0}")]
    Geometry(#[from] GeometryError),
}

/// All positions are in the robot frame. The robot's front is facing along the positive x-axis.
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub struct RobotConfig {
    pub wheel_radius: f64,
    pub track_length: f64,
    pub ticks_per_revolution: u32,
    /// Wheel rim speed (m/s) of one motor unit.
    pub speed_factor: f64,
    pub min_linear_velocity: f64,
    pub max_linear_velocity: f64,
    pub min_angular_velocity: f64,
    pub max_angular_velocity: f64,
    pub body: Vec<Position>,
    pub sensors: Vec<SensorMount>,
}

static KHEPERA3: Lazy<RobotConfig> = Lazy::new(|| {
    let sensor = |x: f64, y: f64, deg: f64| SensorMount {
        pose: Pose::new(x, y, Angle::from_deg(deg).into()),
        min_range: 0.02,
        max_range: 0.2,
        spread: Angle::from_deg(20.0),
        curve: ResponseCurve::KHEPERA3_INFRARED,
    };

    RobotConfig {
        wheel_radius: 0.021,
        track_length: 0.0885,
        ticks_per_revolution: 2765,
        speed_factor: 6.2953e-6,
        min_linear_velocity: -0.3148,
        max_linear_velocity: 0.314,
        min_angular_velocity: -2.2763,
        max_angular_velocity: 2.276,
        body: vec![
            Position::new(-0.024, 0.064),
            Position::new(0.033, 0.064),
            Position::new(0.057, 0.043),
            Position::new(0.074, 0.010),
            Position::new(0.074, -0.010),
            Position::new(0.057, -0.043),
            Position::new(0.033, -0.064),
            Position::new(-0.025, -0.064),
            Position::new(-0.042, -0.043),
            Position::new(-0.048, -0.010),
            Position::new(-0.048, 0.010),
            Position::new(-0.042, 0.043),
        ],
        sensors: vec![
            sensor(-0.038, 0.048, 128.0),
            sensor(0.019, 0.064, 75.0),
            sensor(0.050, 0.050, 42.0),
            sensor(0.070, 0.017, 13.0),
            sensor(0.070, -0.017, -13.0),
            sensor(0.050, -0.050, -42.0),
            sensor(0.019, -0.064, -75.0),
            sensor(-0.038, -0.048, -128.0),
            sensor(-0.048, 0.000, 180.0),
        ],
    }
});

impl RobotConfig {
    /// K-Team Khepera III with nine infrared proximity sensors.
    pub fn khepera3() -> Self {
        KHEPERA3.clone()
    }

    fn validate(&self) -> Result<(), RobotError> {
        if self.wheel_radius <= 0.0 {
            return Err(RobotError::InvalidConfig("wheel radius must be positive"));
        }
        if self.track_length <= 0.0 {
            return Err(RobotError::InvalidConfig("track length must be positive"));
        }
        if self.ticks_per_revolution == 0 {
            return Err(RobotError::InvalidConfig(
                "ticks per revolution must be positive",
            ));
        }
        if self.speed_factor <= 0.0 {
            return Err(RobotError::InvalidConfig("speed factor must be positive"));
        }
        Ok(())
    }
}

/// Robot models a scenario can refer to by name.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Ord, PartialOrd)]
#[serde(rename_all = "snake_case")]
pub enum RobotModel {
    #[default]
    Khepera3,
}

impl RobotModel {
    pub fn config(self) -> RobotConfig {
        match self {
            RobotModel::Khepera3 => RobotConfig::khepera3(),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum WheelID {
    Right,
    Left,
}

#[derive(Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct Wheel {
    motor_speed: i64,
    encoder: WheelEncoder,
}

impl Wheel {
    fn new(ticks_per_revolution: u32) -> Self {
        Self {
            motor_speed: 0,
            encoder: WheelEncoder::new(ticks_per_revolution),
        }
    }

    /// Commanded speed in motor units.
    pub fn motor_speed(&self) -> i64 {
        self.motor_speed
    }
}
