//! Collision and proximity updates, run once per tick after every robot moved.

use log::{info, trace};

use super::{HasCollision, ProximitySensor, Robot, Surface, World};

/// Runs the collision pass and then the proximity pass. Returns whether a collision was found in
/// this tick.
pub fn apply(world: &mut World) -> bool {
    let collision = detect_collisions(world);
    if collision {
        if !world.has_crashed() {
            info!("collision detected");
        }
        world.mark_crashed();
    }
    update_proximity_sensors(world);
    collision
}

/// Tests every robot against every obstacle and every other robot.
pub fn detect_collisions(world: &World) -> bool {
    let robots = world.robots().collect::<Vec<_>>();
    robots.iter().enumerate().any(|(i, robot)| {
        world.obstacles().iter().any(|o| robot.has_collision(o))
            || robots
                .iter()
                .enumerate()
                .any(|(j, other)| i != j && robot.has_collision(*other))
    })
}

/// Sets every sensor's range to the distance of the closest hit inside its cone, or to its
/// maximum range if nothing is in view.
pub fn update_proximity_sensors(world: &mut World) {
    let ranges = world
        .robots()
        .enumerate()
        .map(|(i, robot)| {
            robot
                .sensors()
                .iter()
                .map(|sensor| sense(world, i, robot, sensor))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    for (supervisor, ranges) in world.supervisors_mut().iter_mut().zip(ranges) {
        for (sensor, range) in supervisor.robot_mut().sensors_mut().iter_mut().zip(ranges) {
            sensor.reset_range();
            if let Some(range) = range {
                sensor.update_range(range);
            }
        }
    }
}

fn sense(world: &World, idx: usize, robot: &Robot, sensor: &ProximitySensor) -> Option<f64> {
    let mut probe = sensor.clone();
    probe.reset_range();
    let cone = probe.bounds(&robot.pose());
    let apex = probe.pose(&robot.pose()).position();

    let others = world
        .robots()
        .enumerate()
        .filter(|(j, _)| *j != idx)
        .map(|(_, r)| r.body());
    let closest = world
        .obstacles()
        .iter()
        .map(|o| o.surface())
        .chain(others)
        .filter(|surface: &&Surface| cone.precheck(surface))
        .flat_map(|surface| cone.intersect(surface))
        .map(|point| probe.limit_to_sensor(apex.distance(point)))
        .fold(f64::INFINITY, f64::min);

    if closest < probe.max_range() {
        trace!(
            "sensor at ({:.3}, {:.3}) sees obstacle at {:.4}",
            apex.x(),
            apex.y(),
            closest
        );
        Some(closest)
    } else {
        None
    }
}
