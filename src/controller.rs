//! Operator input steering the simulation.
//!
//! A left click sends the first robot to the clicked position. The number keys select the
//! behavior of every robot, Space pauses and R rebuilds the world from the scenario.

use bevy::prelude::*;
use log::{info, warn};

use crate::{
    domain::{ControllerKind, Position},
    resource::{ScenarioRes, SimulationRes},
    simulator::SimulationControl,
};

pub struct Controller;

impl Plugin for Controller {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, (handle_goal_selection, handle_keyboard_input));
    }
}

fn handle_goal_selection(
    cameras: Query<(&Camera, &GlobalTransform)>,
    windows: Query<&Window>,
    buttons: Res<ButtonInput<MouseButton>>,
    mut simulation: ResMut<SimulationRes>,
) {
    if !buttons.just_pressed(MouseButton::Left) {
        return;
    }

    let Some(position) = get_pointer_position(&cameras, &windows) else {
        return;
    };

    if let Err(e) = simulation.set_goal(0, position) {
        warn!("cannot set goal: {e}");
    }
}

fn handle_keyboard_input(
    keys: Res<ButtonInput<KeyCode>>,
    scenario: Res<ScenarioRes>,
    mut simulation: ResMut<SimulationRes>,
    mut control: ResMut<SimulationControl>,
) {
    for (key, kind) in [
        (KeyCode::Digit1, ControllerKind::GoToGoal),
        (KeyCode::Digit2, ControllerKind::AvoidObstacles),
        (KeyCode::Digit3, ControllerKind::BlendedAvoidAndSeek),
    ] {
        if keys.just_pressed(key) {
            for idx in 0..simulation.world().supervisors().len() {
                if let Err(e) = simulation.set_controller(idx, kind) {
                    warn!("cannot switch controller: {e}");
                }
            }
        }
    }

    if keys.just_pressed(KeyCode::Space) {
        control.paused = !control.paused;
        info!("{}", if control.paused { "paused" } else { "resumed" });
    }

    if keys.just_pressed(KeyCode::KeyR) {
        match scenario.build() {
            Ok(rebuilt) => {
                *simulation = rebuilt.into();
                control.failure = None;
                info!("simulation reset");
            }
            Err(e) => warn!("cannot reset simulation: {e}"),
        }
    }
}

fn get_pointer_position(
    cameras: &Query<(&Camera, &GlobalTransform)>,
    windows: &Query<&Window>,
) -> Option<Position> {
    let (camera, camera_transform) = cameras.get_single().ok()?;
    let cursor_position = windows.get_single().ok()?.cursor_position()?;
    let point = camera.viewport_to_world_2d(camera_transform, cursor_position)?;
    Some(Position::new(point.x as f64, point.y as f64))
}
