//! Basic building blocks.

use std::{
    f64::consts::PI,
    ops::{Add, Mul, Neg, Sub},
};

use serde::Deserialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Position {
    x: f64,
    y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn distance(&self, position: Self) -> f64 {
        ((self.x - position.x).powi(2) + (self.y - position.y).powi(2)).sqrt()
    }

    pub fn norm(&self) -> f64 {
        self.distance(Position::default())
    }

    /// Direction of the vector from the origin to this position.
    pub fn bearing(&self) -> Angle {
        Angle::new(self.y.atan2(self.x))
    }

    pub fn rotate_vector(&self, angle: Angle) -> Position {
        Position::new(
            self.x * angle.0.cos() - self.y * angle.0.sin(),
            self.x * angle.0.sin() + self.y * angle.0.cos(),
        )
    }
}

impl From<Position> for (f32, f32) {
    fn from(value: Position) -> Self {
        (value.x as f32, value.y as f32)
    }
}

impl From<Position> for (f64, f64) {
    fn from(value: Position) -> Self {
        (value.x, value.y)
    }
}

impl From<(f64, f64)> for Position {
    fn from(value: (f64, f64)) -> Self {
        Position::new(value.0, value.1)
    }
}

impl From<[f64; 2]> for Position {
    fn from(value: [f64; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Mul<f64> for Position {
    type Output = Position;

    fn mul(self, rhs: f64) -> Self::Output {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Angle(f64);

impl Angle {
    pub const fn new(radians: f64) -> Self {
        Self(radians)
    }

    pub fn from_deg(degree: f64) -> Self {
        Self(degree * PI / 180.0)
    }

    pub fn sin(self) -> f64 {
        self.0.sin()
    }

    pub fn cos(self) -> f64 {
        self.0.cos()
    }

    /// Normalizes into (-π, π] via atan2(sin, cos). Heading errors must go through this instead of
    /// being used as a raw difference.
    pub fn wrapped(self) -> Self {
        let angle = self.0.sin().atan2(self.0.cos());
        if angle <= -PI {
            Self(angle + 2.0 * PI)
        } else {
            Self(angle)
        }
    }
}

impl Neg for Angle {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Angle(-self.0)
    }
}

impl Add for Angle {
    type Output = Angle;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

/// Raw difference, not wrapped.
impl Sub for Angle {
    type Output = Angle;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<f64> for Angle {
    type Output = Angle;

    fn mul(self, rhs: f64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl From<Angle> for f64 {
    fn from(value: Angle) -> Self {
        value.0
    }
}

/// Rigid 2D pose. Poses are values: integration and composition produce new ones.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, PartialOrd)]
#[serde(default, deny_unknown_fields)]
pub struct Pose {
    x: f64,
    y: f64,
    theta: f64,
}

impl Pose {
    pub const fn new(x: f64, y: f64, theta: f64) -> Self {
        Self { x, y, theta }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    pub fn heading(&self) -> Angle {
        Angle::new(self.theta)
    }

    /// Rotates by theta, then translates by (x, y).
    pub fn transform_point(&self, point: Position) -> Position {
        self.position() + point.rotate_vector(self.heading())
    }

    pub fn transform(&self, points: &[Position]) -> Vec<Position> {
        points.iter().map(|p| self.transform_point(*p)).collect()
    }

    /// Expresses `local`, given in this pose's frame, in the parent frame.
    pub fn compose(&self, local: Pose) -> Pose {
        let position = self.transform_point(local.position());
        Pose::new(position.x(), position.y(), self.theta + local.theta)
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::{assert_abs_diff_eq, AbsDiffEq};
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_position() {
        let position = Position::new(1.0, 2.0);
        assert_abs_diff_eq!(position.x(), 1.0);
        assert_abs_diff_eq!(position.y(), 2.0);
    }

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(90.0, 0.5 * PI)]
    #[case(180.0, PI)]
    #[case(-128.0, -128.0 / 180.0 * PI)]
    fn test_angle_from_deg(#[case] degree: f64, #[case] expected: f64) {
        assert_abs_diff_eq!(f64::from(Angle::from_deg(degree)), expected, epsilon = 1e-12);
    }

    #[rstest]
    #[case::zero(         0.0,        0.0       )]
    #[case::pi(           PI,         PI        )]
    #[case::minus_pi(    -PI,         PI        )]
    #[case::full_turn(    2.0 * PI,   0.0       )]
    #[case::three_halves( 1.5 * PI,  -0.5 * PI  )]
    #[case::small(       -0.25 * PI, -0.25 * PI )]
    fn test_angle_wrapped(#[case] angle: f64, #[case] expected: f64) {
        assert_abs_diff_eq!(
            f64::from(Angle::new(angle).wrapped()),
            expected,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_heading_error_stays_in_half_open_interval() {
        let headings = (-40..=40).map(|i| i as f64 * PI / 8.0).collect::<Vec<_>>();
        for theta_1 in &headings {
            for theta_2 in &headings {
                let error = f64::from((Angle::new(*theta_1) - Angle::new(*theta_2)).wrapped());
                assert!(error > -PI && error <= PI, "{theta_1} - {theta_2} -> {error}");
            }
        }
    }

    #[test]
    fn test_pose_transform_rotates_then_translates() {
        let pose = Pose::new(1.0, 0.0, 0.5 * PI);
        let points = pose.transform(&[Position::new(1.0, 0.0)]);
        assert_abs_diff_eq!(points[0], Position::new(1.0, 1.0), epsilon = 1e-12);
    }

    #[rstest]
    #[case(Angle::new(0.0), Position::new(1.2, 2.1))]
    #[case(Angle::new(0.5 * PI), Position::new(0.9, 2.2))]
    #[case(Angle::new(PI), Position::new(0.8, 1.9))]
    #[case(Angle::new(1.5 * PI), Position::new(1.1, 1.8))]
    fn test_pose_transform_point(#[case] heading: Angle, #[case] expected: Position) {
        let pose = Pose::new(1.0, 2.0, heading.into());
        assert_abs_diff_eq!(
            pose.transform_point(Position::new(0.2, 0.1)),
            expected,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_pose_compose() {
        let robot = Pose::new(1.0, 1.0, 0.5 * PI);
        let mount = Pose::new(0.1, 0.0, 0.25 * PI);
        let sensor = robot.compose(mount);
        assert_abs_diff_eq!(sensor.x(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sensor.y(), 1.1, epsilon = 1e-12);
        assert_abs_diff_eq!(sensor.theta(), 0.75 * PI, epsilon = 1e-12);
    }

    impl AbsDiffEq for Position {
        type Epsilon = f64;

        fn default_epsilon() -> f64 {
            f64::EPSILON
        }

        fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
            f64::abs_diff_eq(&self.x, &other.x, epsilon)
                && f64::abs_diff_eq(&self.y, &other.y, epsilon)
        }
    }

    impl AbsDiffEq for Angle {
        type Epsilon = f64;

        fn default_epsilon() -> f64 {
            f64::EPSILON
        }

        fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
            f64::abs_diff_eq(&self.0, &other.0, epsilon)
        }
    }

    impl AbsDiffEq for Pose {
        type Epsilon = f64;

        fn default_epsilon() -> f64 {
            f64::EPSILON
        }

        fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
            f64::abs_diff_eq(&self.x, &other.x, epsilon)
                && f64::abs_diff_eq(&self.y, &other.y, epsilon)
                && f64::abs_diff_eq(&self.theta, &other.theta, epsilon)
        }
    }
}
