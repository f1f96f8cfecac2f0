//! Fixed-step simulation loop.
//!
//! One tick runs four phases in a fixed order:
//!
//! 1. every supervisor plans its wheel speeds from the sensor readings of the previous tick,
//! 2. every robot takes its wheel speeds and moves,
//! 3. collisions are checked and proximity sensors are updated for the new poses,
//! 4. every supervisor updates its estimate from the encoders.
//!
//! Every active controller is checked against its robot before anything is planned, so a tick
//! that fails leaves the world exactly as it was.

use std::time::Duration;

use thiserror::Error;

use super::{physics, ControllerError, ControllerKind, Position, World};

#[derive(Error, Debug, PartialEq)]
pub enum SimulationError {
    #[error(transparent)]
    Controller(#[from] ControllerError),
    #[error("no robot with index {0}")]
    UnknownRobot(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Simulation {
    world: World,
    elapsed: Duration,
    ticks: u64,
}

impl Simulation {
    /// Takes ownership of the world and fills in the initial sensor readings.
    pub fn new(mut world: World) -> Self {
        physics::update_proximity_sensors(&mut world);
        Self {
            world,
            elapsed: Duration::ZERO,
            ticks: 0,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn has_crashed(&self) -> bool {
        self.world.has_crashed()
    }

    /// Advances the world by `dt`. Returns whether a collision happened in this tick.
    pub fn step(&mut self, dt: Duration) -> Result<bool, SimulationError> {
        for supervisor in self.world.supervisors() {
            supervisor.check()?;
        }
        let plans = self
            .world
            .supervisors_mut()
            .iter_mut()
            .map(|s| s.plan(dt))
            .collect::<Result<Vec<_>, _>>()?;

        for (supervisor, speeds) in self.world.supervisors_mut().iter_mut().zip(plans) {
            supervisor.actuate(speeds);
            supervisor.advance(dt);
        }

        let collision = physics::apply(&mut self.world);

        for supervisor in self.world.supervisors_mut() {
            supervisor.update_odometry();
        }

        self.elapsed += dt;
        self.ticks += 1;

        Ok(collision)
    }

    pub fn set_goal(&mut self, idx: usize, goal: Position) -> Result<(), SimulationError> {
        self.world
            .supervisor_mut(idx)
            .ok_or(SimulationError::UnknownRobot(idx))?
            .set_goal(goal);
        Ok(())
    }

    pub fn set_controller(
        &mut self,
        idx: usize,
        kind: ControllerKind,
    ) -> Result<(), SimulationError> {
        self.world
            .supervisor_mut(idx)
            .ok_or(SimulationError::UnknownRobot(idx))?
            .set_controller(kind);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::domain::{
        Obstacle, Polygon, Pose, Robot, RobotConfig, Supervisor, SupervisorConfig, WheelSpeeds,
    };

    const DT: Duration = Duration::from_millis(50);

    fn supervisor(pose: Pose, kind: ControllerKind, goal: Position) -> Supervisor {
        let robot = Robot::new(pose, RobotConfig::khepera3()).unwrap();
        Supervisor::new(robot, kind, SupervisorConfig::default())
            .unwrap()
            .with_goal(goal)
    }

    fn wall(x: f64) -> Obstacle {
        Obstacle::new(
            Pose::new(x, 0.0, 0.0),
            Polygon::new(vec![
                Position::new(0.0, -0.5),
                Position::new(0.05, -0.5),
                Position::new(0.05, 0.5),
                Position::new(0.0, 0.5),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn test_new_simulation_senses_immediately() {
        let simulation = Simulation::new(World::new(
            vec![supervisor(
                Pose::default(),
                ControllerKind::GoToGoal,
                Position::new(1.0, 0.0),
            )],
            vec![wall(0.15)],
        ));
        assert!(simulation.world().supervisors()[0].robot().sensors()[3].has_detection());
        assert_eq!(simulation.ticks(), 0);
        assert_eq!(simulation.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_step_plans_from_previous_sensing() {
        let mut simulation = Simulation::new(World::new(
            vec![supervisor(
                Pose::default(),
                ControllerKind::BlendedAvoidAndSeek,
                Position::new(1.0, 0.2),
            )],
            vec![wall(0.2)],
        ));

        for _ in 0..5 {
            let mut expected = simulation.world().supervisors()[0].clone();
            let speeds = expected.plan(DT).unwrap();
            expected.actuate(speeds);

            assert!(!simulation.step(DT).unwrap());

            let supervisor = &simulation.world().supervisors()[0];
            assert_eq!(
                supervisor.robot().wheel_speeds(),
                expected.robot().wheel_speeds()
            );

            // Readings already belong to the new pose
            let mut resensed = World::new(vec![supervisor.clone()], vec![wall(0.2)]);
            physics::update_proximity_sensors(&mut resensed);
            assert_eq!(
                resensed.supervisors()[0].robot().sensors(),
                supervisor.robot().sensors()
            );
        }
        assert_eq!(simulation.ticks(), 5);
        assert_eq!(simulation.elapsed(), 5 * DT);
    }

    #[test]
    fn test_step_updates_estimate() {
        let mut simulation = Simulation::new(World::new(
            vec![supervisor(
                Pose::default(),
                ControllerKind::GoToGoal,
                Position::new(1.0, 0.0),
            )],
            vec![],
        ));
        simulation.step(DT).unwrap();
        let supervisor = &simulation.world().supervisors()[0];
        assert!(supervisor.estimate().x() > 0.0);
        assert!((supervisor.estimate().x() - supervisor.robot().pose().x()).abs() < 1e-3);
    }

    #[test]
    fn test_failing_controller_leaves_world_untouched() {
        let config = RobotConfig {
            sensors: RobotConfig::khepera3().sensors[..3].to_vec(),
            ..RobotConfig::khepera3()
        };
        let robot = Robot::new(Pose::new(0.0, 1.0, 0.0), config).unwrap();
        let partial = Supervisor::new(robot, ControllerKind::GoToGoal, SupervisorConfig::default())
            .unwrap()
            .with_goal(Position::new(1.0, 1.0));

        let mut simulation = Simulation::new(World::new(
            vec![
                supervisor(
                    Pose::default(),
                    ControllerKind::GoToGoal,
                    Position::new(1.0, 0.0),
                ),
                partial,
            ],
            vec![],
        ));
        simulation.step(DT).unwrap();
        simulation
            .set_controller(1, ControllerKind::AvoidObstacles)
            .unwrap();
        let snapshot = simulation.clone();

        assert_eq!(
            simulation.step(DT),
            Err(SimulationError::Controller(ControllerError::SensorCount {
                expected: 9,
                found: 3
            }))
        );
        assert_eq!(simulation, snapshot);
    }

    #[rstest]
    #[case::goal(0, true)]
    #[case::unknown(3, false)]
    fn test_set_goal(#[case] idx: usize, #[case] known: bool) {
        let mut simulation = Simulation::new(World::new(
            vec![supervisor(
                Pose::default(),
                ControllerKind::GoToGoal,
                Position::default(),
            )],
            vec![],
        ));
        let result = simulation.set_goal(idx, Position::new(0.5, 0.5));
        if known {
            assert_eq!(result, Ok(()));
            assert_eq!(
                simulation.world().supervisors()[0].goal(),
                Position::new(0.5, 0.5)
            );
        } else {
            assert_eq!(result, Err(SimulationError::UnknownRobot(idx)));
        }
        assert_eq!(
            simulation.set_controller(idx, ControllerKind::AvoidObstacles),
            if known {
                Ok(())
            } else {
                Err(SimulationError::UnknownRobot(idx))
            }
        );
    }

    #[test]
    fn test_reaches_goal_in_open_space() {
        let goal = Position::new(0.4, 0.3);
        let mut simulation = Simulation::new(World::new(
            vec![supervisor(Pose::default(), ControllerKind::GoToGoal, goal)],
            vec![],
        ));
        for _ in 0..400 {
            simulation.step(DT).unwrap();
        }
        let supervisor = &simulation.world().supervisors()[0];
        assert!(supervisor.reached_goal());
        assert!(supervisor.estimate().position().distance(goal) <= 0.02);
        assert_eq!(supervisor.robot().wheel_speeds(), WheelSpeeds::default());
        assert!(!simulation.has_crashed());
    }
}
