//! Simulation of the robots in a world with obstacles.
//!
//! The world advances by one scenario time step per fixed update, independent of the frame rate.
//! Rendering and operator input only ever see the state between two ticks.

use bevy::prelude::*;
use log::error;

use crate::resource::{ScenarioRes, SimulationRes};

pub struct Simulator;

impl Plugin for Simulator {
    fn build(&self, app: &mut App) {
        app.init_resource::<SimulationControl>()
            .add_systems(FixedUpdate, simulate);
    }
}

#[derive(Resource, Default)]
pub struct SimulationControl {
    pub paused: bool,
    /// Set when a tick failed. The simulation stays halted until it is reset.
    pub failure: Option<String>,
}

fn simulate(
    mut simulation: ResMut<SimulationRes>,
    mut control: ResMut<SimulationControl>,
    scenario: Res<ScenarioRes>,
) {
    if control.paused || control.failure.is_some() {
        return;
    }

    if let Err(e) = simulation.step(scenario.time_step()) {
        error!("simulation halted: {e}");
        control.failure = Some(e.to_string());
    }
}
