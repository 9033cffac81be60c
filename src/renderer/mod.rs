//! Rendering abstraction layer.
//!
//! *The ray caster never touches a pixel buffer directly.*
//! It produces a list of [`DrawCall`]s in paint order (walls, then sprites
//! far-to-near) and hands them to a type that implements [`Renderer`].
//!
//! * Back-ends only need two primitives: a scaled single-column blit and a
//!   scaled rectangular blit with a transparent key colour.
//! * A helper blanket-impl [`RendererExt`] adds `draw_frame` so call-sites
//!   stay short.

use crate::world::texture::{TextureBank, TextureId};

/// Pixel format of the finished frame (0x00RRGGBB).
pub type Rgba = u32;

/// One vertical wall strip: texture column `tex_x` stretched over
/// `height` screen rows starting at row `y` (which may be negative).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WallColumn {
    pub x: i32,
    pub y: i32,
    pub height: i32,
    pub tex_id: TextureId,
    pub tex_x: i32,
}

/// Scaled rectangular blit of a source region. Transparent texels are
/// skipped; destination pixels outside the screen are clipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpriteBlit {
    pub dst_x: i32,
    pub dst_y: i32,
    pub dst_w: i32,
    pub dst_h: i32,
    pub tex_id: TextureId,
    pub src_x: i32,
    pub src_y: i32,
    pub src_w: i32,
    pub src_h: i32,
    /// Mirror the source region horizontally.
    pub flip_x: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawCall {
    Wall(WallColumn),
    Sprite(SpriteBlit),
}

/// A renderer that owns an internal scratch buffer for the whole frame.
///
/// `end_frame` hands the finished buffer to a user-supplied closure.
pub trait Renderer {
    /// (Re)allocate internal scratch for the requested resolution and clear it.
    fn begin_frame(&mut self, width: usize, height: usize);

    /// Rasterise one textured wall strip.
    fn draw_wall(&mut self, col: &WallColumn, bank: &TextureBank);

    /// Rasterise one scaled sprite region.
    fn draw_sprite(&mut self, blit: &SpriteBlit, bank: &TextureBank);

    /// Finish the frame and **loan** the finished buffer to `submit`.
    ///
    /// * `submit(&[Rgba], w, h)` is run exactly once per frame.
    /// * Windowed callers pass `|fb, w, h| window.update_with_buffer(fb, w, h)`.
    fn end_frame<F>(&mut self, submit: F)
    where
        F: FnOnce(&[Rgba], usize, usize);
}

/// Convenience blanket-impl with a one-liner `draw_frame` adaptor.
pub trait RendererExt: Renderer {
    fn draw_frame<F>(
        &mut self,
        width: usize,
        height: usize,
        calls: &[DrawCall],
        bank: &TextureBank,
        submit: F,
    ) where
        F: FnOnce(&[Rgba], usize, usize),
    {
        self.begin_frame(width, height);
        for c in calls {
            match c {
                DrawCall::Wall(w) => self.draw_wall(w, bank),
                DrawCall::Sprite(s) => self.draw_sprite(s, bank),
            }
        }
        self.end_frame(submit);
    }
}
impl<T: Renderer + ?Sized> RendererExt for T {}

pub mod software;

pub use software::Software;
