//! 2D visualization.
//!
//! Everything is drawn with gizmos straight from the simulation state each frame, so nothing has
//! to be kept in sync with the world. One world unit is one meter.

use bevy::{input::mouse::MouseWheel, prelude::*};

use crate::{
    domain::{HasCollision, Pose, Position, Supervisor, Surface, World},
    resource::SimulationRes,
    simulator::SimulationControl,
};

pub struct Visualizer;

impl Plugin for Visualizer {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, set_up)
            .add_systems(
                Update,
                (
                    update_text,
                    handle_keyboard_input,
                    handle_zoom,
                    draw_world,
                ),
            )
            .insert_resource(Scene { show_text: true });
    }
}

#[derive(Resource, Default)]
pub struct Scene {
    show_text: bool,
}

const PIXELS_PER_METER: f32 = 400.0;
const MIN_SCALE: f32 = 0.1 / PIXELS_PER_METER;
const MAX_SCALE: f32 = 20.0 / PIXELS_PER_METER;

const OBSTACLE_COLOR: Color = Color::rgb(0.6, 0.6, 0.6);
const ROBOT_COLOR: Color = Color::rgb(0.2, 0.6, 1.0);
const CRASHED_COLOR: Color = Color::rgb(1.0, 0.2, 0.2);
const SENSOR_COLOR: Color = Color::rgba(1.0, 1.0, 1.0, 0.15);
const DETECTION_COLOR: Color = Color::rgb(1.0, 0.6, 0.0);
const GOAL_COLOR: Color = Color::rgb(0.2, 1.0, 0.3);
const ESTIMATE_COLOR: Color = Color::rgba(1.0, 1.0, 0.2, 0.8);

fn set_up(mut commands: Commands, simulation: Res<SimulationRes>) {
    create_camera(simulation.world(), &mut commands);
    create_text(&mut commands);
}

fn create_camera(world: &World, commands: &mut Commands) {
    let mut camera = Camera2dBundle::default();
    camera.projection.scale = 1.0 / PIXELS_PER_METER;
    camera.transform.translation = Vec3::new(
        ((world.x_min() + world.x_max()) / 2.0) as f32,
        ((world.y_min() + world.y_max()) / 2.0) as f32,
        camera.transform.translation.z,
    );
    commands.spawn(camera);
}

fn create_text(commands: &mut Commands) {
    let text_style = TextStyle {
        font_size: 20.0,
        ..default()
    };
    commands.spawn(
        TextBundle::from_sections(vec![TextSection::new("", text_style.clone())]).with_style(
            Style {
                position_type: PositionType::Absolute,
                bottom: Val::Px(12.0),
                left: Val::Px(12.0),
                ..default()
            },
        ),
    );
}

fn draw_world(mut gizmos: Gizmos, simulation: Res<SimulationRes>) {
    let world = simulation.world();

    for obstacle in world.obstacles() {
        draw_surface(&mut gizmos, obstacle.surface(), OBSTACLE_COLOR);
    }

    let robot_color = if world.has_crashed() {
        CRASHED_COLOR
    } else {
        ROBOT_COLOR
    };
    for supervisor in world.supervisors() {
        draw_supervisor(&mut gizmos, supervisor, robot_color);
    }
}

fn draw_supervisor(gizmos: &mut Gizmos, supervisor: &Supervisor, color: Color) {
    let robot = supervisor.robot();

    for sensor in robot.sensors() {
        let cone = sensor.bounds(&robot.pose());
        if sensor.has_detection() {
            draw_surface(gizmos, &cone, DETECTION_COLOR);
        } else {
            draw_surface(gizmos, &cone, SENSOR_COLOR);
        }
    }

    draw_surface(gizmos, robot.body(), color);
    draw_heading(gizmos, &robot.pose(), 0.05, color);

    let estimate = supervisor.estimate();
    gizmos.circle_2d(to_bevy_position(estimate.position()), 0.01, ESTIMATE_COLOR);
    draw_heading(gizmos, &estimate, 0.03, ESTIMATE_COLOR);

    let goal = to_bevy_position(supervisor.goal());
    gizmos.circle_2d(goal, 0.02, GOAL_COLOR);
    if supervisor.reached_goal() {
        gizmos.circle_2d(goal, 0.03, GOAL_COLOR);
    }
}

fn draw_surface(gizmos: &mut Gizmos, surface: &Surface, color: Color) {
    let vertices = surface.vertices();
    gizmos.linestrip_2d(
        vertices
            .iter()
            .chain(vertices.first())
            .map(|v| to_bevy_position(*v)),
        color,
    );
}

fn draw_heading(gizmos: &mut Gizmos, pose: &Pose, length: f64, color: Color) {
    let tip = pose.transform_point(Position::new(length, 0.0));
    gizmos.line_2d(
        to_bevy_position(pose.position()),
        to_bevy_position(tip),
        color,
    );
}

fn update_text(
    mut text: Query<&mut Text>,
    scene: Res<Scene>,
    simulation: Res<SimulationRes>,
    control: Res<SimulationControl>,
) {
    let mut text = text.single_mut();
    if !scene.show_text {
        text.sections[0].value = String::new();
        return;
    }

    let world = simulation.world();
    let mut status = format!("TIME: {:6.2} s", simulation.elapsed().as_secs_f64());
    if let Some(supervisor) = world.supervisors().first() {
        let goal = supervisor.goal();
        status += &format!(
            "   CTRL: {}   GOAL: ({:4.2}, {:4.2}){}",
            supervisor.active_controller(),
            goal.x(),
            goal.y(),
            if supervisor.reached_goal() {
                " reached"
            } else {
                ""
            }
        );
    }
    if world.has_crashed() {
        status += "   CRASHED";
    }
    if control.paused {
        status += "   PAUSED";
    }
    if let Some(failure) = &control.failure {
        status += &format!("   HALTED: {failure}");
    }
    text.sections[0].value = status;
}

fn handle_keyboard_input(keys: Res<ButtonInput<KeyCode>>, mut scene: ResMut<Scene>) {
    if keys.just_pressed(KeyCode::KeyT) {
        scene.show_text = !scene.show_text;
    }
}

fn handle_zoom(
    mut scroll: EventReader<MouseWheel>,
    mut projections: Query<&mut OrthographicProjection>,
) {
    let delta = scroll.read().map(|e| e.y).sum::<f32>();
    if delta == 0.0 {
        return;
    }

    for mut projection in projections.iter_mut() {
        projection.scale = (projection.scale * 1.1_f32.powf(-delta)).clamp(MIN_SCALE, MAX_SCALE);
    }
}

fn to_bevy_position(position: Position) -> Vec2 {
    Vec2::new(position.x() as f32, position.y() as f32)
}
