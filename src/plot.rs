//! Terminal plots of headless runs.

use textplots::{Chart, Plot, Shape};

use crate::domain::{HasCollision, Supervisor, World};

const WIDTH: u32 = 160;
const HEIGHT: u32 = 160;

/// True and estimated path of one robot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Trajectory {
    truth: Vec<(f32, f32)>,
    estimate: Vec<(f32, f32)>,
}

impl Trajectory {
    pub fn record(&mut self, supervisor: &Supervisor) {
        self.truth.push(supervisor.robot().pose().position().into());
        self.estimate.push(supervisor.estimate().position().into());
    }

    pub fn truth(&self) -> &[(f32, f32)] {
        &self.truth
    }

    pub fn estimate(&self) -> &[(f32, f32)] {
        &self.estimate
    }
}

/// Draws the obstacle outlines and both paths of every trajectory, scaled to the world bounds.
pub fn plot_trajectories(world: &World, trajectories: &[Trajectory]) -> String {
    let outlines = world
        .obstacles()
        .iter()
        .map(|o| {
            let vertices = o.surface().vertices();
            vertices
                .iter()
                .chain(vertices.first())
                .map(|v| (*v).into())
                .collect::<Vec<(f32, f32)>>()
        })
        .collect::<Vec<_>>();
    let paths = trajectories
        .iter()
        .flat_map(|t| [t.truth().to_vec(), t.estimate().to_vec()])
        .collect::<Vec<_>>();

    let (x_min, x_max, y_min, y_max) = paths.iter().flatten().fold(
        (
            world.x_min() as f32,
            world.x_max() as f32,
            world.y_min() as f32,
            world.y_max() as f32,
        ),
        |(x_min, x_max, y_min, y_max), (x, y)| {
            (x_min.min(*x), x_max.max(*x), y_min.min(*y), y_max.max(*y))
        },
    );

    plot_line_chart(
        &outlines.into_iter().chain(paths).collect::<Vec<_>>(),
        (x_min, x_max),
        (y_min, y_max),
    )
}

fn plot_line_chart(points: &[Vec<(f32, f32)>], x_range: (f32, f32), y_range: (f32, f32)) -> String {
    // Degenerate ranges make the chart collapse
    let x_range = widen(x_range);
    let y_range = widen(y_range);

    let mut chart = Chart::new_with_y_range(
        WIDTH, HEIGHT, x_range.0, x_range.1, y_range.0, y_range.1,
    );
    let chart = chart.lineplot(&Shape::Lines(&[]));
    let lines = points.iter().map(|p| Shape::Lines(p)).collect::<Vec<_>>();
    let chart = lines.iter().fold(chart, |c, l| c.lineplot(l));
    chart.figures();
    chart.to_string()
}

fn widen((min, max): (f32, f32)) -> (f32, f32) {
    if max - min < 0.1 {
        let center = (min + max) / 2.0;
        (center - 0.05, center + 0.05)
    } else {
        (min, max)
    }
}
