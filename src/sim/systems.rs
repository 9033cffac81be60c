use std::time::Duration;

use glam::IVec2;
use hecs::{Entity, World};

use super::components::{InputCmd, Position, Velocity};
use crate::fixed::{FRAC_BITS, to_fixed};
use crate::world::Camera;

pub const MOVE_SPEED: f32 = 3.0; // cells / second
pub const TURN_RATE: f32 = 2.0; // rad / second

/* ── Viewer control ───────────────────────────────────────────────── */

/// Turn the camera and walk the viewer along the view direction.
///
/// There is no collision: the viewer may walk into walls, which simply
/// makes every ray start inside a solid cell.
pub fn player_input(
    world: &mut World,
    viewer: Entity,
    camera: &mut Camera,
    tile: i32,
    cmd: InputCmd,
    dt: Duration,
) {
    let dt = dt.as_secs_f32();
    if cmd.turn != 0.0 {
        camera.turn(cmd.turn * TURN_RATE * dt);
    }
    if cmd.forward == 0.0 {
        return;
    }
    if let Ok(pos) = world.query_one_mut::<&mut Position>(viewer) {
        let step = to_fixed(cmd.forward * MOVE_SPEED * dt);
        // Q8 dir × Q8 cells → Q8 cells → Q8 world units
        let delta = (camera.dir() * step) >> FRAC_BITS as i32;
        pos.0 += delta * tile;
    }
}

/* ── Host movement ────────────────────────────────────────────────── */

/// `position += velocity · dt` for every tracked entity that moves.
pub fn movement(world: &mut World, tracked: &[Entity], dt: Duration) {
    let dt_us = dt.as_micros().min(i64::MAX as u128) as i64;
    for &e in tracked {
        if let Ok((pos, vel)) = world.query_one_mut::<(&mut Position, &Velocity)>(e) {
            if vel.0 == IVec2::ZERO {
                continue;
            }
            let dx = vel.0.x as i64 * dt_us / 1_000_000;
            let dy = vel.0.y as i64 * dt_us / 1_000_000;
            pos.0 += IVec2::new(dx as i32, dy as i32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::ONE;

    #[test]
    fn forward_walks_along_view_direction() {
        let mut world = World::new();
        let start = IVec2::new(64 << 8, 64 << 8);
        let viewer = world.spawn((Position(start),));
        let mut cam = Camera::new(0.0, 0.66, 160);

        let cmd = InputCmd {
            forward: 1.0,
            turn: 0.0,
        };
        player_input(&mut world, viewer, &mut cam, 16, cmd, Duration::from_millis(500));

        // 1.5 cells of 16 units along +x
        let pos = world.get::<&Position>(viewer).unwrap().0;
        assert_eq!(pos, start + IVec2::new(24 << 8, 0));
    }

    #[test]
    fn turn_rotates_camera_only() {
        let mut world = World::new();
        let viewer = world.spawn((Position(IVec2::ZERO),));
        let mut cam = Camera::new(0.0, 0.66, 160);

        let cmd = InputCmd {
            forward: 0.0,
            turn: 1.0,
        };
        player_input(&mut world, viewer, &mut cam, 16, cmd, Duration::from_millis(250));
        assert!((cam.view_angle() - 0.5).abs() < 1e-6);
        assert_eq!(world.get::<&Position>(viewer).unwrap().0, IVec2::ZERO);
    }

    #[test]
    fn movement_skips_untracked_entities() {
        let mut world = World::new();
        let v = Velocity(IVec2::new(2 * ONE, -ONE));
        let a = world.spawn((Position(IVec2::ZERO), v));
        let b = world.spawn((Position(IVec2::ZERO), v));

        movement(&mut world, &[a], Duration::from_secs(2));
        assert_eq!(world.get::<&Position>(a).unwrap().0, IVec2::new(4 * ONE, -2 * ONE));
        assert_eq!(world.get::<&Position>(b).unwrap().0, IVec2::ZERO);
    }
}
