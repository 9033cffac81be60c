//! Vertical (Z) motion for tracked entities.
//!
//! Every tracked entity owns one [`MotionZ`]: a height above the floor
//! that rests on a *target offset* and is pushed off it by explicit
//! requests. Units are fixed point: position in Q8 pixels, velocity in
//! Q8 px/s, acceleration in Q8 px/s².
//!
//! ```text
//!            set_z_offset (v == 0)
//!   Settled ──────────────────────▶ Approaching { v }
//!      │  ▲                              │
//!      │  └──────── landing clamp ◀──────┘
//!      │ jump / move_z                   ▲
//!      ▼                                 │
//!   Ballistic { v, a } ──────────────────┘ (landing clamp → Settled)
//! ```

use std::collections::HashMap;
use std::time::Duration;

use hecs::Entity;

use crate::fixed::{Fixed, ONE, from_fixed, to_fixed};

/// Default time for `set_z_offset` to glide to a new resting height.
pub const DEFAULT_APPROACH_MS: u32 = 500;

const MICROS_PER_SEC: i64 = 1_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotionState {
    /// Resting on the target offset, nothing to integrate.
    Settled,
    /// Constant-velocity glide toward the target.
    Approaching { velocity: Fixed },
    /// Explicit velocity and acceleration.
    Ballistic {
        velocity: Fixed,
        acceleration: Fixed,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MotionZ {
    position: Fixed,
    target: Fixed,
    state: MotionState,
}

impl Default for MotionZ {
    fn default() -> Self {
        Self::resting_at(0)
    }
}

impl MotionZ {
    /// Settled at `offset` (Q8 px).
    pub fn resting_at(offset: Fixed) -> Self {
        Self {
            position: offset,
            target: offset,
            state: MotionState::Settled,
        }
    }

    #[inline]
    pub fn position(&self) -> Fixed {
        self.position
    }

    #[inline]
    pub fn target(&self) -> Fixed {
        self.target
    }

    #[inline]
    pub fn state(&self) -> MotionState {
        self.state
    }

    #[inline]
    pub fn is_settled(&self) -> bool {
        self.state == MotionState::Settled
    }

    pub fn velocity(&self) -> Fixed {
        match self.state {
            MotionState::Settled => 0,
            MotionState::Approaching { velocity } | MotionState::Ballistic { velocity, .. } => {
                velocity
            }
        }
    }

    pub fn acceleration(&self) -> Fixed {
        match self.state {
            MotionState::Ballistic { acceleration, .. } => acceleration,
            _ => 0,
        }
    }

    /*──────────────────────────── requests ─────────────────────────────*/

    /// Set velocity (px/s) and acceleration (px/s²). Always honoured.
    pub fn move_z(&mut self, velocity: f32, acceleration: f32) {
        self.set_ballistic(to_fixed(velocity), to_fixed(acceleration));
    }

    /// Like [`move_z`](Self::move_z) but ignored unless settled.
    pub fn jump(&mut self, velocity: f32, acceleration: f32) -> bool {
        if !self.is_settled() {
            return false;
        }
        self.move_z(velocity, acceleration);
        true
    }

    /// Parabolic hop peaking at `height` px after `duration_ms / 2`.
    ///
    /// `v = h·4000/d`, `a = -v·2000/d`, i.e. `h = -v²/2a` and `d = -2v/a`
    /// with `d` in milliseconds.
    pub fn jump_with_height_and_duration(&mut self, height: f32, duration_ms: u32) -> bool {
        if duration_ms == 0 || !self.is_settled() {
            return false;
        }
        let d = duration_ms as f32;
        let v = height * 4000.0 / d;
        let a = -v * 2000.0 / d;
        self.move_z(v, a);
        true
    }

    /// Move the resting height to `offset` px. A zero duration snaps, else
    /// a resting entity glides there at constant speed. An entity already
    /// in motion keeps its velocity and only the target changes.
    pub fn set_z_offset(&mut self, offset: f32, duration_ms: u32) {
        self.target = to_fixed(offset);
        if self.position == self.target {
            return;
        }
        if duration_ms == 0 {
            self.position = self.target;
            if self.velocity() == 0 {
                self.state = MotionState::Settled;
            }
        } else if self.velocity() == 0 {
            let delta = (self.target - self.position) as i64;
            let velocity = (delta * 1000 / duration_ms as i64) as Fixed;
            self.state = MotionState::Approaching { velocity };
        }
    }

    /*──────────────────────────── integrator ───────────────────────────*/

    /// Advance by `dt_us` microseconds.
    pub fn step(&mut self, dt_us: i64) {
        let (mut v, a) = match self.state {
            MotionState::Settled => return,
            MotionState::Approaching { velocity } => (velocity, 0),
            MotionState::Ballistic {
                velocity,
                acceleration,
            } => (velocity, acceleration),
        };
        if v == 0 && self.position == self.target {
            self.state = MotionState::Settled;
            return;
        }

        v += (a as i64 * dt_us / MICROS_PER_SEC) as Fixed;
        self.position += (v as i64 * dt_us / MICROS_PER_SEC) as Fixed;

        // landing: past the target in the direction of travel
        let t = self.target;
        let p = self.position;
        if (a >= 0 && v > 0 && p > t) || (a <= 0 && v < 0 && p < t) {
            self.position = t;
            self.state = MotionState::Settled;
            return;
        }

        self.state = match self.state {
            MotionState::Approaching { .. } => MotionState::Approaching { velocity: v },
            _ => MotionState::Ballistic {
                velocity: v,
                acceleration: a,
            },
        };
    }

    fn set_ballistic(&mut self, velocity: Fixed, acceleration: Fixed) {
        self.state = if velocity == 0 && self.position == self.target {
            MotionState::Settled
        } else {
            MotionState::Ballistic {
                velocity,
                acceleration,
            }
        };
    }
}

/*──────────────────────────────── Table ───────────────────────────────*/

/// Motion state of every tracked entity, keyed by identity.
///
/// Entries are removed explicitly when their entity is destroyed, so a
/// recycled handle never inherits someone else's height.
#[derive(Debug, Default)]
pub struct MotionTable {
    entries: HashMap<Entity, MotionZ>,
}

impl MotionTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, e: Entity) -> Option<&MotionZ> {
        self.entries.get(&e)
    }

    /// Entry for `e`, created settled at `initial_offset` px if missing.
    pub fn entry(&mut self, e: Entity, initial_offset: f32) -> &mut MotionZ {
        self.entries
            .entry(e)
            .or_insert_with(|| MotionZ::resting_at(to_fixed(initial_offset)))
    }

    pub fn contains(&self, e: Entity) -> bool {
        self.entries.contains_key(&e)
    }

    pub fn remove(&mut self, e: Entity) -> Option<MotionZ> {
        self.entries.remove(&e)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Step every entry by `dt`.
    pub fn step(&mut self, dt: Duration) {
        let dt_us = dt.as_micros().min(i64::MAX as u128) as i64;
        for m in self.entries.values_mut() {
            m.step(dt_us);
        }
    }

    /// Q8 position, `0` for entities without motion state.
    #[inline]
    pub fn z_fixed(&self, e: Entity) -> Fixed {
        self.entries.get(&e).map_or(0, MotionZ::position)
    }

    /// Current height in px.
    pub fn z_position(&self, e: Entity) -> f32 {
        from_fixed(self.z_fixed(e))
    }

    /// Resting height in px.
    pub fn z_offset(&self, e: Entity) -> f32 {
        from_fixed(self.entries.get(&e).map_or(0, MotionZ::target))
    }

    /// Whether `[z, z + height)` of the two entities intersect. Heights
    /// are whole pixels.
    pub fn is_overlapping_z(&self, a: Entity, height_a: i32, b: Entity, height_b: i32) -> bool {
        let pa = self.z_fixed(a);
        let pb = self.z_fixed(b);
        if pa < pb {
            pa + height_a * ONE > pb
        } else {
            pb + height_b * ONE > pa
        }
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;

    const FRAME_US: i64 = 16_600;

    #[test]
    fn parabolic_jump_peaks_and_lands() {
        let mut m = MotionZ::default();
        assert!(m.jump_with_height_and_duration(40.0, 500));

        let mut peak = 0;
        let mut landed_at = None;
        for i in 1..=40 {
            m.step(FRAME_US);
            peak = peak.max(m.position());
            if m.is_settled() {
                landed_at = Some(i);
                break;
            }
        }
        let peak = from_fixed(peak);
        assert!((36.0..=40.5).contains(&peak), "peak {peak}");
        let landed_at = landed_at.expect("jump never landed");
        assert!(landed_at <= 31, "landed after {landed_at} frames");
        assert_eq!(m.position(), 0);
        assert_eq!(m.velocity(), 0);
    }

    #[test]
    fn jump_ignored_while_airborne() {
        let mut m = MotionZ::default();
        assert!(m.jump(100.0, -400.0));
        m.step(FRAME_US);
        let before = m;
        assert!(!m.jump(500.0, -10.0));
        assert!(!m.jump_with_height_and_duration(10.0, 100));
        assert_eq!(m, before);
    }

    #[test]
    fn zero_duration_jump_is_a_no_op() {
        let mut m = MotionZ::default();
        assert!(!m.jump_with_height_and_duration(40.0, 0));
        assert!(m.is_settled());
    }

    #[test]
    fn move_zero_at_target_stays_settled() {
        let mut m = MotionZ::resting_at(3 * ONE);
        m.move_z(0.0, 0.0);
        assert_eq!(m.state(), MotionState::Settled);
        m.move_z(0.0, -50.0);
        assert_eq!(m.state(), MotionState::Settled);
    }

    #[test]
    fn z_offset_glides_at_constant_speed() {
        let mut m = MotionZ::default();
        m.set_z_offset(10.0, 500);
        // 10 px in 0.5 s
        assert_eq!(m.state(), MotionState::Approaching { velocity: 20 * ONE });
        assert_eq!(m.acceleration(), 0);

        m.step(250_000);
        assert_eq!(m.position(), 5 * ONE);
        m.step(300_000);
        assert!(m.is_settled());
        assert_eq!(m.position(), 10 * ONE);
    }

    #[test]
    fn z_offset_zero_duration_snaps() {
        let mut m = MotionZ::default();
        m.set_z_offset(-4.0, 0);
        assert_eq!(m.position(), -4 * ONE);
        assert!(m.is_settled());
    }

    #[test]
    fn retarget_mid_jump_keeps_velocity() {
        let mut m = MotionZ::default();
        m.jump(100.0, -400.0);
        let v = m.velocity();
        m.set_z_offset(8.0, 500);
        assert_eq!(m.target(), 8 * ONE);
        assert_eq!(m.velocity(), v);
    }

    #[test]
    fn table_creates_lazily_and_forgets_on_remove() {
        let mut world = hecs::World::new();
        let e = world.spawn(());
        let mut table = MotionTable::new();

        assert_eq!(table.z_position(e), 0.0);
        assert!(!table.contains(e));

        table.entry(e, 6.0);
        assert_eq!(table.z_offset(e), 6.0);
        assert_eq!(table.z_position(e), 6.0);

        // second access does not reset the offset
        table.entry(e, 0.0).set_z_offset(2.0, 0);
        assert_eq!(table.entry(e, 99.0).position(), 2 * ONE);

        assert!(table.remove(e).is_some());
        assert!(table.is_empty());
    }

    #[test]
    fn overlap_uses_height_of_the_lower_entity() {
        let mut world = hecs::World::new();
        let low = world.spawn(());
        let high = world.spawn(());
        let mut table = MotionTable::new();
        table.entry(low, 0.0);
        table.entry(high, 10.0);

        assert!(table.is_overlapping_z(low, 16, high, 4));
        assert!(!table.is_overlapping_z(low, 10, high, 4));
        assert!(table.is_overlapping_z(high, 4, low, 11));
    }

    #[test]
    fn table_step_advances_all_entries() {
        let mut world = hecs::World::new();
        let a = world.spawn(());
        let b = world.spawn(());
        let mut table = MotionTable::new();
        table.entry(a, 0.0).set_z_offset(128.0, 500);
        table.entry(b, 0.0);

        table.step(Duration::from_millis(250));
        assert_eq!(table.z_position(a), 64.0);
        assert_eq!(table.z_position(b), 0.0);
    }
}
