//! The resource module encapsulates domain entities for use with Bevy.

use std::ops::{Deref, DerefMut};

use bevy::ecs::system::Resource;

use crate::{domain, scenario::Scenario};

#[derive(Resource)]
pub struct SimulationRes(domain::Simulation);

impl Deref for SimulationRes {
    type Target = domain::Simulation;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for SimulationRes {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<domain::Simulation> for SimulationRes {
    fn from(value: domain::Simulation) -> Self {
        Self(value)
    }
}

/// Scenario the running simulation was built from, kept for resets.
#[derive(Resource)]
pub struct ScenarioRes(Scenario);

impl Deref for ScenarioRes {
    type Target = Scenario;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Scenario> for ScenarioRes {
    fn from(value: Scenario) -> Self {
        Self(value)
    }
}
