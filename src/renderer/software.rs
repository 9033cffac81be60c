//! ---------------------------------------------------------------------------
//! Classic software (CPU) column renderer
//!
//! * Fills a `Vec<u32>` frame-buffer in **0x00RRGGBB** format, resolving
//!   texels through the bank's palette as they are written.
//! * Palette index 0 is the key colour and is never written.
//! * Relies on the engine to feed [`DrawCall`]s in painter's order, so no
//!   per-pixel depth test is needed.
//! ---------------------------------------------------------------------------

use crate::{
    renderer::{Renderer, Rgba, SpriteBlit, WallColumn},
    world::texture::{ColorIndex, Palette, TRANSPARENT, TextureBank},
};

/*───────────────────────────────────────────────────────────────────────*/
/*                              Backend                                 */
/*───────────────────────────────────────────────────────────────────────*/

/// Column renderer.
pub struct Software {
    scratch: Vec<Rgba>,
    ceiling: Rgba,
    floor: Rgba,
    width: usize,
    height: usize,
}

impl Default for Software {
    fn default() -> Self {
        let pal = Palette::default();
        Self::with_background(pal[11], pal[12])
    }
}

impl Software {
    /// Backend that clears the upper half to `ceiling` and the lower half
    /// to `floor` at the start of every frame.
    pub fn with_background(ceiling: Rgba, floor: Rgba) -> Self {
        Self {
            scratch: Vec::new(),
            ceiling,
            floor,
            width: 0,
            height: 0,
        }
    }

    /// The frame as drawn so far, row-major.
    #[inline]
    pub fn pixels(&self) -> &[Rgba] {
        &self.scratch
    }

    #[inline]
    fn put(&mut self, x: i32, y: i32, c: ColorIndex, pal: &Palette) {
        if c != TRANSPARENT {
            self.scratch[y as usize * self.width + x as usize] = pal[c];
        }
    }
}

/*──────────────────────── Renderer trait impl ────────────────────────*/
impl Renderer for Software {
    fn begin_frame(&mut self, w: usize, h: usize) {
        // (re)allocate if resolution changed
        if w != self.width || h != self.height {
            self.width = w;
            self.height = h;
            self.scratch.resize(w * h, 0);
        }

        let horizon = (h / 2) * w;
        self.scratch[..horizon].fill(self.ceiling);
        self.scratch[horizon..].fill(self.floor);
    }

    fn draw_wall(&mut self, col: &WallColumn, bank: &TextureBank) {
        let Some(tex) = bank.texture(col.tex_id) else {
            return;
        };
        if col.x < 0 || col.x >= self.width as i32 || col.height <= 0 {
            return;
        }
        let pal = bank.palette();

        /* clip to integer pixel rows */
        let first = (-col.y).max(0);
        let last = (self.height as i32 - col.y).min(col.height);
        let u = col.tex_x.clamp(0, tex.w as i32 - 1) as usize;

        for r in first..last {
            let v = (r as i64 * tex.h as i64 / col.height as i64) as usize;
            self.put(col.x, col.y + r, tex.pixel(u, v), pal);
        }
    }

    fn draw_sprite(&mut self, b: &SpriteBlit, bank: &TextureBank) {
        let Some(tex) = bank.texture(b.tex_id) else {
            return;
        };
        if b.dst_w <= 0 || b.dst_h <= 0 || b.src_w <= 0 || b.src_h <= 0 {
            return;
        }
        let pal = bank.palette();

        let x0 = b.dst_x.max(0);
        let x1 = (b.dst_x + b.dst_w).min(self.width as i32);
        let y0 = b.dst_y.max(0);
        let y1 = (b.dst_y + b.dst_h).min(self.height as i32);

        for x in x0..x1 {
            let dx = (x - b.dst_x) as i64;
            let mut u = (dx * b.src_w as i64 / b.dst_w as i64) as i32;
            if b.flip_x {
                u = b.src_w - 1 - u;
            }
            let u = b.src_x + u;
            if u < 0 {
                continue;
            }
            for y in y0..y1 {
                let dy = (y - b.dst_y) as i64;
                let v = b.src_y + (dy * b.src_h as i64 / b.dst_h as i64) as i32;
                if v < 0 {
                    continue;
                }
                self.put(x, y, tex.pixel(u as usize, v as usize), pal);
            }
        }
    }

    fn end_frame<F>(&mut self, submit: F)
    where
        F: FnOnce(&[Rgba], usize, usize),
    {
        submit(&self.scratch, self.width, self.height);
    }
}

/*──────────────────────────────── Tests ───────────────────────────────*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        renderer::{DrawCall, RendererExt},
        world::texture::{Texture, TextureBank},
    };

    /* tiny helpers ---------------------------------------------------*/
    fn tiny_bank() -> TextureBank {
        let mut bank = TextureBank::default();
        bank.insert_at(1, "BLUE", Texture::solid("BLUE", 4, 4, 8))
            .unwrap();
        bank.insert_at(
            2,
            "ARROW",
            Texture::from_rows("ARROW", &["2.", "22"]).unwrap(),
        )
        .unwrap();
        bank
    }

    const SKY: Rgba = 0x00_000001;
    const GROUND: Rgba = 0x00_000003;

    fn pal(idx: ColorIndex) -> Rgba {
        Palette::default()[idx]
    }

    fn frame_pixels(calls: &[DrawCall]) -> Vec<Rgba> {
        let bank = tiny_bank();
        let mut sw = Software::with_background(SKY, GROUND);
        let mut out = Vec::new();
        sw.draw_frame(8, 8, calls, &bank, |fb, w, h| {
            assert_eq!((w, h), (8, 8));
            out.extend_from_slice(fb);
        });
        out
    }

    #[test]
    fn background_split_at_horizon() {
        let px = frame_pixels(&[]);
        assert!(px[..32].iter().all(|&c| c == SKY));
        assert!(px[32..].iter().all(|&c| c == GROUND));
    }

    #[test]
    fn wall_column_clipped_to_screen() {
        let px = frame_pixels(&[DrawCall::Wall(WallColumn {
            x: 2,
            y: -4,
            height: 20,
            tex_id: 1,
            tex_x: 0,
        })]);
        for y in 0..8 {
            assert_eq!(px[y * 8 + 2], pal(8), "row {y}");
        }
        assert_eq!(px[3], SKY);
    }

    #[test]
    fn missing_texture_is_skipped() {
        let px = frame_pixels(&[DrawCall::Wall(WallColumn {
            x: 2,
            y: 0,
            height: 8,
            tex_id: 7,
            tex_x: 0,
        })]);
        assert_eq!(px, frame_pixels(&[]));
    }

    #[test]
    fn sprite_scales_and_keeps_transparency() {
        let px = frame_pixels(&[DrawCall::Sprite(SpriteBlit {
            dst_x: 0,
            dst_y: 0,
            dst_w: 4,
            dst_h: 4,
            tex_id: 2,
            src_x: 0,
            src_y: 0,
            src_w: 2,
            src_h: 2,
            flip_x: false,
        })]);
        // top-left quadrant opaque, top-right transparent
        assert_eq!(px[0], pal(2));
        assert_eq!(px[8 + 1], pal(2));
        assert_eq!(px[3], SKY);
        // bottom row of the source covers rows 2..4
        assert_eq!(px[3 * 8 + 3], pal(2));
    }

    #[test]
    fn flipped_sprite_mirrors_columns() {
        let px = frame_pixels(&[DrawCall::Sprite(SpriteBlit {
            dst_x: 0,
            dst_y: 0,
            dst_w: 2,
            dst_h: 2,
            tex_id: 2,
            src_x: 0,
            src_y: 0,
            src_w: 2,
            src_h: 2,
            flip_x: true,
        })]);
        assert_eq!(px[0], SKY);
        assert_eq!(px[1], pal(2));
        assert_eq!(px[8], pal(2));
    }
}
