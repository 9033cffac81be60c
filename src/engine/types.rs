use glam::IVec2;
use hecs::Entity;

use crate::fixed::Fixed;

/// Constants that depend on the *frame-buffer*, not on the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Screen {
    pub w: usize,
    pub h: usize,
}

impl Default for Screen {
    fn default() -> Self {
        Self { w: 160, h: 120 }
    }
}

impl Screen {
    #[inline]
    pub fn half_w(&self) -> i32 {
        (self.w / 2) as i32
    }

    #[inline]
    pub fn half_h(&self) -> i32 {
        (self.h >> 1) as i32
    }
}

/// Viewer state reused by every raster unit, captured once per frame.
#[derive(Clone, Copy, Debug)]
pub struct Viewer {
    pub entity: Entity,
    /// Position in cells, Q8.
    pub pos: IVec2,
    /// Eye height in world units, Q8.
    pub view_z: Fixed,
}
