//! Wheel encoders and proximity sensors.

use std::{f64::consts::PI, time::Duration};

use super::{Angle, Polygon, Pose, Position, Surface};

#[derive(Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct WheelEncoder {
    ticks_per_revolution: u32,
    ticks: i64,
}

impl WheelEncoder {
    pub fn new(ticks_per_revolution: u32) -> Self {
        Self {
            ticks_per_revolution,
            ticks: 0,
        }
    }

    pub fn ticks(&self) -> i64 {
        self.ticks
    }

    /// Accumulates the wheel rotation over `dt`. Each update is rounded up to whole ticks, which
    /// overstates positive rotations by up to one tick per update.
    pub fn update_ticks(&mut self, wheel_velocity: f64, dt: Duration) {
        self.ticks += self.distance_to_ticks(wheel_velocity * dt.as_secs_f64());
    }

    /// Wheel rotation in radians covered by `ticks`.
    pub fn ticks_to_distance(&self, ticks: i64) -> f64 {
        ticks as f64 * 2.0 * PI / self.ticks_per_revolution as f64
    }

    fn distance_to_ticks(&self, distance: f64) -> i64 {
        (distance * self.ticks_per_revolution as f64 / (2.0 * PI)).ceil() as i64
    }
}

/// Maps a physical distance to the reading a sensor reports.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub enum ResponseCurve {
    Linear,
    /// Saturates at `peak` below `saturation_distance` and decays exponentially beyond it.
    Infrared {
        saturation_distance: f64,
        peak: f64,
        decay: f64,
    },
}

impl ResponseCurve {
    pub const KHEPERA3_INFRARED: ResponseCurve = ResponseCurve::Infrared {
        saturation_distance: 0.02,
        peak: 3960.0,
        decay: 30.0,
    };

    pub fn to_raw(&self, distance: f64) -> f64 {
        match *self {
            ResponseCurve::Linear => distance,
            ResponseCurve::Infrared {
                saturation_distance,
                peak,
                decay,
            } => {
                if distance < saturation_distance {
                    peak
                } else {
                    (peak * (-decay * (distance - saturation_distance)).exp()).ceil()
                }
            }
        }
    }

    /// Inverse of [`Self::to_raw`] outside the saturated region.
    pub fn to_distance(&self, raw: f64) -> f64 {
        match *self {
            ResponseCurve::Linear => raw,
            ResponseCurve::Infrared {
                saturation_distance,
                peak,
                decay,
            } => (raw / peak).ln() / -decay + saturation_distance,
        }
    }
}

/// Placement and characteristics of a proximity sensor on a robot.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct SensorMount {
    pub pose: Pose,
    pub min_range: f64,
    pub max_range: f64,
    pub spread: Angle,
    pub curve: ResponseCurve,
}

#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub struct ProximitySensor {
    mount: SensorMount,
    range: f64,
}

impl ProximitySensor {
    pub fn new(mount: SensorMount) -> Self {
        Self {
            range: mount.max_range,
            mount,
        }
    }

    pub fn mount(&self) -> &SensorMount {
        &self.mount
    }

    pub fn min_range(&self) -> f64 {
        self.mount.min_range
    }

    pub fn max_range(&self) -> f64 {
        self.mount.max_range
    }

    /// Physical distance currently sensed.
    pub fn range(&self) -> f64 {
        self.range
    }

    /// Reading as the device reports it.
    pub fn raw_range(&self) -> f64 {
        self.mount.curve.to_raw(self.range)
    }

    pub fn has_detection(&self) -> bool {
        self.range < self.mount.max_range
    }

    pub fn reset_range(&mut self) {
        self.range = self.mount.max_range;
    }

    pub fn update_range(&mut self, distance: f64) {
        self.range = self.limit_to_sensor(distance);
    }

    pub fn limit_to_sensor(&self, distance: f64) -> f64 {
        distance.clamp(self.mount.min_range, self.mount.max_range)
    }

    /// World pose of the sensor on a robot at `robot_pose`.
    pub fn pose(&self, robot_pose: &Pose) -> Pose {
        robot_pose.compose(self.mount.pose)
    }

    /// Sensing cone in world coordinates. The apex sits at the sensor and the arc at the current
    /// range.
    pub fn bounds(&self, robot_pose: &Pose) -> Surface {
        Surface::new(self.pose(robot_pose), self.cone())
    }

    fn cone(&self) -> Polygon {
        let r = self.range;
        let spread: f64 = self.mount.spread.into();
        let r_1 = r * (spread / 4.0).tan();
        let r_2 = r * (spread / 2.0).tan();
        let x_1 = (r.powi(2) - r_1.powi(2)).sqrt();
        let x_2 = (r.powi(2) - r_2.powi(2)).sqrt();

        Polygon::new(vec![
            Position::new(0.0, 0.0),
            Position::new(x_2, r_2),
            Position::new(x_1, r_1),
            Position::new(r, 0.0),
            Position::new(x_1, -r_1),
            Position::new(x_2, -r_2),
        ])
        .unwrap_or_else(|_| unreachable!("cone has six vertices"))
    }
}
