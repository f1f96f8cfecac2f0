//! World with robots and static obstacles.

use super::{HasCollision, Polygon, Pose, Position, Robot, Supervisor, Surface};

#[derive(Clone, Debug, PartialEq)]
pub struct World {
    supervisors: Vec<Supervisor>,
    obstacles: Vec<Obstacle>,
    crashed: bool,
}

impl World {
    pub fn new(supervisors: Vec<Supervisor>, obstacles: Vec<Obstacle>) -> Self {
        Self {
            supervisors,
            obstacles,
            crashed: false,
        }
    }

    pub fn supervisors(&self) -> &[Supervisor] {
        &self.supervisors
    }

    pub(crate) fn supervisors_mut(&mut self) -> &mut [Supervisor] {
        &mut self.supervisors
    }

    pub(crate) fn supervisor_mut(&mut self, idx: usize) -> Option<&mut Supervisor> {
        self.supervisors.get_mut(idx)
    }

    pub fn robots(&self) -> impl Iterator<Item = &Robot> {
        self.supervisors.iter().map(|s| s.robot())
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Whether any collision happened so far. Once set, it stays set.
    pub fn has_crashed(&self) -> bool {
        self.crashed
    }

    pub(crate) fn mark_crashed(&mut self) {
        self.crashed = true;
    }

    pub fn x_min(&self) -> f64 {
        self.vertices()
            .map(|v| v.x())
            .min_by(|a, b| a.total_cmp(b))
            .unwrap_or_default()
    }

    pub fn x_max(&self) -> f64 {
        self.vertices()
            .map(|v| v.x())
            .max_by(|a, b| a.total_cmp(b))
            .unwrap_or_default()
    }

    pub fn y_min(&self) -> f64 {
        self.vertices()
            .map(|v| v.y())
            .min_by(|a, b| a.total_cmp(b))
            .unwrap_or_default()
    }

    pub fn y_max(&self) -> f64 {
        self.vertices()
            .map(|v| v.y())
            .max_by(|a, b| a.total_cmp(b))
            .unwrap_or_default()
    }

    fn vertices(&self) -> impl Iterator<Item = Position> + '_ {
        self.obstacles
            .iter()
            .map(|o| o.surface())
            .chain(self.robots().map(|r| r.body()))
            .flat_map(|s| s.vertices().iter().copied())
    }
}

/// Static polygonal obstacle.
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub struct Obstacle {
    pose: Pose,
    surface: Surface,
}

impl Obstacle {
    pub fn new(pose: Pose, geometry: Polygon) -> Self {
        Self {
            pose,
            surface: Surface::new(pose, geometry),
        }
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }
}

impl HasCollision for Obstacle {
    fn surface(&self) -> &Surface {
        &self.surface
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use rstest::rstest;

    use super::super::{ControllerKind, RobotConfig, SupervisorConfig};
    use super::*;

    fn square_obstacle(x: f64, y: f64, length: f64) -> Obstacle {
        let h = length / 2.0;
        Obstacle::new(
            Pose::new(x, y, 0.0),
            Polygon::new(vec![
                Position::new(-h, -h),
                Position::new(h, -h),
                Position::new(h, h),
                Position::new(-h, h),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn test_world_bounds() {
        let robot = Robot::new(Pose::new(2.0, 0.0, 0.0), RobotConfig::khepera3()).unwrap();
        let supervisor =
            Supervisor::new(robot, ControllerKind::GoToGoal, SupervisorConfig::default()).unwrap();
        let world = World::new(
            vec![supervisor],
            vec![
                square_obstacle(-1.0, 0.5, 0.2),
                square_obstacle(0.5, -1.0, 0.4),
            ],
        );
        assert_abs_diff_eq!(world.x_min(), -1.1, epsilon = 1e-12);
        // Front of the robot's base plate
        assert_abs_diff_eq!(world.x_max(), 2.074, epsilon = 1e-12);
        assert_abs_diff_eq!(world.y_min(), -1.2, epsilon = 1e-12);
        assert_abs_diff_eq!(world.y_max(), 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_world_bounds() {
        let world = World::new(vec![], vec![]);
        assert_abs_diff_eq!(world.x_min(), 0.0);
        assert_abs_diff_eq!(world.y_max(), 0.0);
        assert!(!world.has_crashed());
    }

    #[rstest]
    #[case::overlapping(0.05, true)]
    #[case::diagonal_gap(0.2, false)]
    #[case::apart(1.0, false)]
    fn test_obstacle_has_collision(#[case] offset: f64, #[case] expected: bool) {
        let a = square_obstacle(0.0, 0.0, 0.1);
        let b = square_obstacle(offset, offset, 0.1);
        assert_eq!(a.has_collision(&b), expected);
    }
}
