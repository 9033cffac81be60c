use std::time::Duration;

use glam::IVec2;
use hecs::{Entity, World};

use super::components::{Appearance, Overlay, Position, Size, SpriteFlags, Velocity};
use super::motion::{DEFAULT_APPROACH_MS, MotionTable, MotionZ};
use super::systems;
use crate::world::TextureId;

/// Owns the ECS world, the set of entities the renderer tracks and their
/// vertical motion, and drives the per-frame host systems.
pub struct TicRunner {
    world: World,
    motion: MotionTable,
    tracked: Vec<Entity>,
    viewer: Entity,
    tile: i32,
    clock: Duration,
}

impl TicRunner {
    /// New simulation with the viewer standing at `viewer_pos` (world Q8).
    /// The viewer is half a cell wide and tall.
    pub fn new(viewer_pos: IVec2, tile: i32) -> Self {
        let mut world = World::new();
        let half = (tile / 2).max(1);
        let viewer = world.spawn((
            Position(viewer_pos),
            Velocity::default(),
            Size { w: half, h: half },
            SpriteFlags::empty(),
        ));
        let mut sim = Self {
            world,
            motion: MotionTable::new(),
            tracked: Vec::new(),
            viewer,
            tile,
            clock: Duration::ZERO,
        };
        sim.adopt(viewer);
        sim
    }

    #[inline]
    pub fn world(&self) -> &World {
        &self.world
    }

    #[inline]
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    #[inline]
    pub fn motion(&self) -> &MotionTable {
        &self.motion
    }

    #[inline]
    pub fn motion_mut(&mut self) -> &mut MotionTable {
        &mut self.motion
    }

    #[inline]
    pub fn viewer(&self) -> Entity {
        self.viewer
    }

    /// Entities the renderer considers, in adoption order.
    #[inline]
    pub fn tracked(&self) -> &[Entity] {
        &self.tracked
    }

    #[inline]
    pub fn tile_size(&self) -> i32 {
        self.tile
    }

    /// Simulation time in whole milliseconds.
    #[inline]
    pub fn clock_ms(&self) -> u64 {
        self.clock.as_millis() as u64
    }

    /// Spawn a billboard of `size` world units at `pos` and adopt it.
    pub fn spawn_sprite(&mut self, pos: IVec2, size: Size, texture: TextureId) -> Entity {
        let e = self.world.spawn((
            Position(pos),
            Velocity::default(),
            size,
            Appearance(texture),
            SpriteFlags::empty(),
        ));
        self.adopt(e);
        e
    }

    /// Take `e` into the tracked set.
    ///
    /// On first adoption the entity gets a motion entry resting at height
    /// 0. Returns `false` if it is already tracked or no longer alive.
    pub fn adopt(&mut self, e: Entity) -> bool {
        if !self.world.contains(e) || self.tracked.contains(&e) {
            return false;
        }
        self.tracked.push(e);
        if !self.motion.contains(e) {
            self.motion.entry(e, 0.0).set_z_offset(0.0, DEFAULT_APPROACH_MS);
        }
        log::debug!("adopted {e:?}, {} tracked", self.tracked.len());
        true
    }

    /// Attach or replace the overlay drawn above `e`.
    pub fn set_overlay(&mut self, e: Entity, overlay: Overlay) -> bool {
        self.world.insert_one(e, overlay).is_ok()
    }

    /// Destroy `e` and release everything held for it.
    pub fn despawn(&mut self, e: Entity) -> bool {
        if e == self.viewer || self.world.despawn(e).is_err() {
            return false;
        }
        self.tracked.retain(|&t| t != e);
        self.motion.remove(e);
        log::debug!("despawned {e:?}, {} tracked", self.tracked.len());
        true
    }

    /// One frame of host update: clock, XY movement, Z motion, overlay
    /// expiry.
    pub fn advance(&mut self, dt: Duration) {
        self.clock += dt;
        systems::movement(&mut self.world, &self.tracked, dt);
        self.motion.step(dt);
        self.expire_overlays();
    }

    fn expire_overlays(&mut self) {
        let now = self.clock_ms();
        let expired: Vec<Entity> = self
            .world
            .query_mut::<&Overlay>()
            .into_iter()
            .filter(|(_, o)| o.is_expired(now))
            .map(|(e, _)| e)
            .collect();
        for e in expired {
            let _ = self.world.remove_one::<Overlay>(e);
        }
    }

    /*──────────────────────── motion requests ───────────────────────*/

    /// Motion entry for a live entity, created at offset 0 on first use.
    fn motion_of(&mut self, e: Entity) -> Option<&mut MotionZ> {
        if !self.world.contains(e) {
            return None;
        }
        Some(self.motion.entry(e, 0.0))
    }

    /// Set vertical velocity (px/s) and acceleration (px/s²).
    pub fn move_z(&mut self, e: Entity, velocity: f32, acceleration: f32) {
        if let Some(m) = self.motion_of(e) {
            m.move_z(velocity, acceleration);
        }
    }

    /// Returns `true` if the jump started.
    pub fn jump(&mut self, e: Entity, velocity: f32, acceleration: f32) -> bool {
        self.motion_of(e)
            .is_some_and(|m| m.jump(velocity, acceleration))
    }

    pub fn jump_with_height_and_duration(&mut self, e: Entity, height: f32, duration_ms: u32) -> bool {
        self.motion_of(e)
            .is_some_and(|m| m.jump_with_height_and_duration(height, duration_ms))
    }

    pub fn set_z_offset(&mut self, e: Entity, offset: f32, duration_ms: u32) {
        if !self.world.contains(e) {
            return;
        }
        self.motion.entry(e, offset).set_z_offset(offset, duration_ms);
    }

    pub fn z_position(&self, e: Entity) -> f32 {
        self.motion.z_position(e)
    }

    pub fn z_offset(&self, e: Entity) -> f32 {
        self.motion.z_offset(e)
    }

    /// Whether the vertical extents of `a` and `b` intersect, using each
    /// entity's `Size::h` as its height.
    pub fn is_overlapping_z(&self, a: Entity, b: Entity) -> bool {
        let height = |e: Entity| self.world.get::<&Size>(e).map_or(0, |s| s.h);
        self.motion.is_overlapping_z(a, height(a), b, height(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TILE: i32 = 16;

    fn runner() -> TicRunner {
        TicRunner::new(IVec2::new(24 << 8, 24 << 8), TILE)
    }

    fn sprite(sim: &mut TicRunner) -> Entity {
        sim.spawn_sprite(IVec2::new(40 << 8, 24 << 8), Size { w: 8, h: 8 }, 3)
    }

    #[test]
    fn viewer_is_tracked_with_half_cell_size() {
        let sim = runner();
        let viewer = sim.viewer();
        assert_eq!(sim.tracked(), &[viewer]);
        assert_eq!(*sim.world().get::<&Size>(viewer).unwrap(), Size { w: 8, h: 8 });
        assert!(sim.motion().get(viewer).unwrap().is_settled());
    }

    #[test]
    fn adopt_is_one_shot() {
        let mut sim = runner();
        let e = sim.world_mut().spawn((Position(IVec2::ZERO),));
        assert!(sim.adopt(e));
        assert!(!sim.adopt(e));
        assert_eq!(sim.tracked().len(), 2);
        assert_eq!(sim.motion().len(), 2);
    }

    #[test]
    fn despawn_releases_motion_state() {
        let mut sim = runner();
        let e = sprite(&mut sim);
        sim.jump(e, 100.0, -100.0);
        assert!(sim.despawn(e));
        assert!(!sim.motion().contains(e));
        assert!(!sim.tracked().contains(&e));

        // requests on a dead handle do not resurrect it
        sim.set_z_offset(e, 5.0, 0);
        assert!(!sim.jump(e, 1.0, -1.0));
        assert!(!sim.motion().contains(e));
        assert!(!sim.despawn(sim.viewer()));
    }

    #[test]
    fn advance_moves_and_lands() {
        let mut sim = runner();
        let e = sprite(&mut sim);
        sim.world_mut()
            .insert_one(e, Velocity(IVec2::new(50 << 8, 0)))
            .unwrap();
        assert!(sim.jump_with_height_and_duration(e, 20.0, 300));

        for _ in 0..30 {
            sim.advance(Duration::from_millis(20));
        }
        assert_eq!(sim.clock_ms(), 600);
        assert_eq!(sim.z_position(e), 0.0);
        assert!(sim.motion().get(e).unwrap().is_settled());
        // 50 units/s for 0.6 s
        let x = sim.world().get::<&Position>(e).unwrap().0.x;
        assert_eq!(x, 70 << 8);
    }

    #[test]
    fn overlays_expire_on_the_sim_clock() {
        let mut sim = runner();
        let e = sprite(&mut sim);
        sim.set_overlay(
            e,
            Overlay {
                texture: 9,
                expires_at_ms: Some(50),
            },
        );
        sim.advance(Duration::from_millis(50));
        assert!(sim.world().get::<&Overlay>(e).is_ok());
        sim.advance(Duration::from_millis(1));
        assert!(sim.world().get::<&Overlay>(e).is_err());
    }

    #[test]
    fn overlap_uses_sprite_heights() {
        let mut sim = runner();
        let e = sprite(&mut sim);
        let viewer = sim.viewer();
        assert!(sim.is_overlapping_z(viewer, e));
        sim.set_z_offset(e, 8.0, 0);
        assert!(!sim.is_overlapping_z(viewer, e));
        sim.set_z_offset(e, 7.0, 0);
        assert!(sim.is_overlapping_z(viewer, e));
    }
}
