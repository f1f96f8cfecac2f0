use std::path::PathBuf;

use bevy::prelude::*;
use clap::Parser;
use log::info;
use thiserror::Error;

mod controller;
mod domain;
mod plot;
mod resource;
mod scenario;
mod simulator;
mod visualizer;

use crate::{
    plot::Trajectory,
    resource::{ScenarioRes, SimulationRes},
    scenario::{Scenario, ScenarioError},
};

/// Simulator for differential-drive robots steered by reactive behaviors.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scenario YAML file, the built-in arena if omitted
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Run without a window
    #[arg(long)]
    headless: bool,

    /// Maximum number of ticks of a headless run
    #[arg(short = 'n', long, default_value = "2000")]
    steps: u64,

    /// Plot the true and estimated paths after a headless run
    #[arg(short, long)]
    plot: bool,
}

#[derive(Error, Debug)]
enum Error {
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error(transparent)]
    Simulation(#[from] domain::SimulationError),
}

fn main() -> Result<(), Error> {
    let args = Args::parse();

    if args.headless {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .init();
    }

    let scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::default(),
    };

    if args.headless {
        return run_headless(&scenario, args.steps, args.plot);
    }

    let simulation = scenario.build()?;

    App::new()
        .add_plugins(DefaultPlugins)
        .insert_resource(Time::<Fixed>::from_duration(scenario.time_step()))
        .insert_resource(SimulationRes::from(simulation))
        .insert_resource(ScenarioRes::from(scenario))
        .add_plugins(simulator::Simulator)
        .add_plugins(controller::Controller)
        .add_plugins(visualizer::Visualizer)
        .run();

    Ok(())
}

/// Steps until every robot reached its goal or `steps` ticks have passed.
fn run_headless(scenario: &Scenario, steps: u64, plot: bool) -> Result<(), Error> {
    let mut simulation = scenario.build()?;
    let dt = scenario.time_step();
    let mut trajectories = vec![Trajectory::default(); simulation.world().supervisors().len()];

    for _ in 0..steps {
        simulation.step(dt)?;
        for (trajectory, supervisor) in trajectories
            .iter_mut()
            .zip(simulation.world().supervisors())
        {
            trajectory.record(supervisor);
        }
        if simulation
            .world()
            .supervisors()
            .iter()
            .all(|s| s.reached_goal())
        {
            break;
        }
    }

    let world = simulation.world();
    info!(
        "stopped after {} ticks ({:.2} s), {} of {} goals reached{}",
        simulation.ticks(),
        simulation.elapsed().as_secs_f64(),
        world.supervisors().iter().filter(|s| s.reached_goal()).count(),
        world.supervisors().len(),
        if world.has_crashed() { ", crashed" } else { "" }
    );
    for (idx, supervisor) in world.supervisors().iter().enumerate() {
        let pose = supervisor.robot().pose();
        let estimate = supervisor.estimate();
        info!(
            "robot {idx}: pose ({:.3}, {:.3}, {:.3}), estimate ({:.3}, {:.3}, {:.3})",
            pose.x(),
            pose.y(),
            pose.theta(),
            estimate.x(),
            estimate.y(),
            estimate.theta()
        );
    }

    if plot {
        println!("{}", plot::plot_trajectories(world, &trajectories));
    }

    Ok(())
}
