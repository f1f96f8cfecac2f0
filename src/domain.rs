//! The domain module encapsulates the core simulation logic. It defines the `Robot`, its
//! `Supervisor` and the `World` they move in, along with the rules governing one simulation tick.
//!
//! By minimizing hard dependencies, this module ensures the simulation remains adaptable and
//! independent of how it is run or displayed.

mod basis;
mod collision;
mod controller;
mod environment;
mod kinematics;
mod physics;
mod robot;
mod sensor;
mod simulation;
mod supervisor;

pub use basis::{Angle, Pose, Position};
pub use collision::{GeometryError, HasCollision, LineSegment, Polygon, Surface};
pub use controller::{
    blend_weight, AvoidObstacles, BehaviorInputs, BlendedAvoidAndSeek, Controller,
    ControllerError, ControllerKind, GoToGoal, Pid,
};
pub use environment::{Obstacle, World};
pub use kinematics::{DifferentialDrive, Unicycle, WheelSpeeds};
pub use robot::{Robot, RobotConfig, RobotError, RobotModel, Wheel, WheelID};
pub use sensor::{ProximitySensor, ResponseCurve, SensorMount, WheelEncoder};
pub use simulation::{Simulation, SimulationError};
pub use supervisor::{Supervisor, SupervisorConfig};
