use bitflags::bitflags;
use glam::IVec2;
use smallvec::SmallVec;

use crate::world::TextureId;

/// Centre of the entity in world units, Q8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position(pub IVec2);

/// World units per second, Q8.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Velocity(pub IVec2);

/// Footprint in whole world units; `h` is also the billboard height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub w: i32,
    pub h: i32,
}

/// Static image used when no directional frames are attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appearance(pub TextureId);

/// One frame per heading bucket, counter-clockwise from the first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectionalFrames(pub SmallVec<[TextureId; 8]>);

impl DirectionalFrames {
    pub fn new(frames: &[TextureId]) -> Self {
        Self(SmallVec::from_slice(frames))
    }

    /// Frame for a heading `dir` measured in turns; any whole number of
    /// turns maps to the same bucket.
    pub fn frame_for(&self, dir: f32) -> Option<TextureId> {
        let n = self.0.len();
        if n == 0 {
            return None;
        }
        let idx = (dir * n as f32 + 0.5).floor() as i64;
        Some(self.0[idx.rem_euclid(n as i64) as usize])
    }
}

/// Image shown above an entity, e.g. a speech bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlay {
    pub texture: TextureId,
    /// Simulation clock (ms) after which the overlay is dropped.
    pub expires_at_ms: Option<u64>,
}

impl Overlay {
    #[inline]
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at_ms.is_some_and(|t| now_ms > t)
    }
}

bitflags! {
    #[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
    pub struct SpriteFlags: u32 {
        /// Drawn in screen space by the host (HUD); never projected.
        const RELATIVE_TO_CAMERA = 0x0000_0001;
        /// Not drawn at all.
        const INVISIBLE          = 0x0000_0002;
        /// Image drawn mirrored left to right.
        const MIRRORED           = 0x0000_0004;
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct InputCmd {
    pub forward: f32, // –1 … +1
    pub turn: f32,    // –1 … +1  (toward -angle / +angle)
}
