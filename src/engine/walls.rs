//! Per-column wall ray caster (Lodev-style DDA, all Q8).
//!
//! For every screen column a ray `dir + plane·cameraX` walks the grid one
//! cell boundary at a time until it leaves the map (miss) or enters a
//! non-empty cell (hit). The hit yields a perpendicular distance, which
//! sizes the strip and is written to the [`DepthBuffer`] for the sprite
//! stage.

use glam::IVec2;

use crate::{
    engine::types::{Screen, Viewer},
    fixed::{FRAC_BITS, Fixed, ONE, ONE_SQ, ceil_int},
    renderer::{DrawCall, WallColumn},
    world::{camera::Camera, grid::Grid, texture::TextureBank},
};

/*──────────────────────────── Depth buffer ────────────────────────────*/

/// One perpendicular wall distance (Q8 cells) per screen column.
///
/// Starts at `0`, which occludes every sprite. Columns whose ray misses
/// the map, or hits a cell without a texture, keep the previous frame's
/// value.
#[derive(Clone, Debug, Default)]
pub struct DepthBuffer(Vec<Fixed>);

impl DepthBuffer {
    pub fn new(w: usize) -> Self {
        Self(vec![0; w])
    }

    /// Match the screen width; new columns start at `0`.
    pub fn resize(&mut self, w: usize) {
        self.0.resize(w, 0);
    }

    #[inline]
    pub fn as_slice(&self) -> &[Fixed] {
        &self.0
    }

    #[inline]
    pub fn get(&self, x: usize) -> Option<Fixed> {
        self.0.get(x).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/*──────────────────────────── Geometry memo ───────────────────────────*/

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct WallKey {
    perp: Fixed,
    tex_x: i32,
    cell: IVec2,
}

/// Screen placement of one strip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WallGeometry {
    pub start_row: i32,
    pub height: i32,
}

/// Last computed strip geometry. Neighbouring columns that hit the same
/// texel column of the same cell at the same distance reuse it.
#[derive(Clone, Debug)]
pub struct WallCache {
    enabled: bool,
    last: Option<(WallKey, WallGeometry)>,
    hits: u32,
}

impl Default for WallCache {
    fn default() -> Self {
        Self {
            enabled: true,
            last: None,
            hits: 0,
        }
    }
}

impl WallCache {
    pub fn set_enabled(&mut self, on: bool) {
        self.enabled = on;
        self.reset();
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Columns served from the memo since the last reset.
    #[inline]
    pub fn hits(&self) -> u32 {
        self.hits
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.hits = 0;
    }

    fn get_or_compute(&mut self, key: WallKey, f: impl FnOnce() -> WallGeometry) -> WallGeometry {
        if self.enabled {
            if let Some((k, g)) = self.last {
                if k == key {
                    self.hits += 1;
                    return g;
                }
            }
        }
        let g = f();
        self.last = Some((key, g));
        g
    }
}

/*───────────────────────────── Ray caster ─────────────────────────────*/

/// Where a single ray ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RayHit {
    pub cell: IVec2,
    pub id: u16,
    /// Hit a face perpendicular to Y.
    pub side: bool,
    /// Perpendicular distance, Q8 cells, at least 1.
    pub perp: Fixed,
    /// Position across the face, Q8 in `[0, 1)`.
    pub wall_x: Fixed,
}

/// Walk the grid from `pos` (Q8 cells) along `ray` (Q8). `None` if the ray
/// leaves the map first.
pub fn cast_ray<G: Grid + ?Sized>(grid: &G, pos: IVec2, ray: IVec2) -> Option<RayHit> {
    // avoid division by zero
    let ray = IVec2::new(
        if ray.x == 0 { 1 } else { ray.x },
        if ray.y == 0 { 1 } else { ray.y },
    );

    let mut map = pos >> FRAC_BITS as i32;
    let delta = IVec2::new((ONE_SQ / ray.x).abs(), (ONE_SQ / ray.y).abs());

    let (step_x, mut side_x) = if ray.x < 0 {
        (-1, ((pos.x - (map.x << FRAC_BITS)) as i64 * delta.x as i64) >> FRAC_BITS)
    } else {
        (1, (((map.x << FRAC_BITS) + ONE - pos.x) as i64 * delta.x as i64) >> FRAC_BITS)
    };
    let (step_y, mut side_y) = if ray.y < 0 {
        (-1, ((pos.y - (map.y << FRAC_BITS)) as i64 * delta.y as i64) >> FRAC_BITS)
    } else {
        (1, (((map.y << FRAC_BITS) + ONE - pos.y) as i64 * delta.y as i64) >> FRAC_BITS)
    };

    let mut side;
    let id = loop {
        if side_x < side_y {
            side_x += delta.x as i64;
            map.x += step_x;
            side = false;
        } else {
            side_y += delta.y as i64;
            map.y += step_y;
            side = true;
        }
        if grid.is_outside(map.x, map.y) {
            return None;
        }
        let id = grid.get(map.x, map.y);
        if id != 0 {
            break id;
        }
    };

    let (perp, wall_x) = if !side {
        let num = (((map.x << FRAC_BITS) - pos.x + ((1 - step_x) << (FRAC_BITS - 1))) as i64)
            << FRAC_BITS;
        let perp = num / ray.x as i64;
        (perp, pos.y as i64 + ((perp * ray.y as i64) >> FRAC_BITS))
    } else {
        let num = (((map.y << FRAC_BITS) - pos.y + ((1 - step_y) << (FRAC_BITS - 1))) as i64)
            << FRAC_BITS;
        let perp = num / ray.y as i64;
        (perp, pos.x as i64 + ((perp * ray.x as i64) >> FRAC_BITS))
    };

    Some(RayHit {
        cell: map,
        id,
        side,
        perp: perp.clamp(1, Fixed::MAX as i64) as Fixed,
        wall_x: (wall_x & (ONE as i64 - 1)) as Fixed,
    })
}

/// Vertical placement of a strip at distance `perp`.
pub fn wall_geometry(cam: &Camera, screen: &Screen, view: &Viewer, tile: i32, perp: Fixed) -> WallGeometry {
    let one = ONE as i64;
    let line_h = ((cam.wall_height_in_view() as i64) << FRAC_BITS) / perp.max(1) as i64;
    let draw_end = line_h * view.view_z as i64 / tile as i64 / one;
    let draw_start = draw_end - line_h * cam.wall_z_scale_fx() as i64 / one + one;
    WallGeometry {
        start_row: ((draw_start + ((screen.half_h() as i64) << FRAC_BITS)) >> FRAC_BITS) as i32,
        height: ceil_int(draw_end) - ceil_int(draw_start) + 1,
    }
}

/// Sweep every column: emit one [`DrawCall::Wall`] per hit and record its
/// distance. Returns the number of strips emitted.
#[allow(clippy::too_many_arguments)]
pub fn cast_walls<G: Grid + ?Sized>(
    grid: &G,
    cam: &Camera,
    screen: &Screen,
    view: &Viewer,
    bank: &TextureBank,
    depth: &mut DepthBuffer,
    cache: &mut WallCache,
    calls: &mut Vec<DrawCall>,
) -> usize {
    let w = screen.w as i32;
    let tile = grid.tile_size();
    let dir = cam.dir();
    let plane = cam.plane();
    depth.resize(screen.w);
    cache.reset();

    let mut drawn = 0;
    for x in 0..w {
        let camera_x = ONE - ((x << FRAC_BITS) << 1) / w;
        let ray = dir + ((plane * camera_x) >> FRAC_BITS as i32);

        let Some(hit) = cast_ray(grid, view.pos, ray) else {
            continue;
        };
        let Some(tex) = bank.texture(hit.id) else {
            continue;
        };
        let tex_x = (hit.wall_x as i64 * tex.w as i64 >> FRAC_BITS) as i32;

        let key = WallKey {
            perp: hit.perp,
            tex_x,
            cell: hit.cell,
        };
        let geo = cache.get_or_compute(key, || wall_geometry(cam, screen, view, tile, hit.perp));

        calls.push(DrawCall::Wall(WallColumn {
            x,
            y: geo.start_row,
            height: geo.height,
            tex_id: hit.id,
            tex_x,
        }));
        depth.0[x as usize] = hit.perp;
        drawn += 1;
    }
    drawn
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{TileMap, default_fov, texture::Texture};

    fn bank() -> TextureBank {
        let mut bank = TextureBank::default();
        bank.insert_at(1, "WALL", Texture::solid("WALL", 16, 16, 5))
            .unwrap();
        bank
    }

    fn viewer(x: Fixed, y: Fixed, view_z: Fixed) -> Viewer {
        Viewer {
            entity: hecs::World::new().spawn(()),
            pos: IVec2::new(x, y),
            view_z,
        }
    }

    #[test]
    fn ray_hits_facing_wall_at_exact_distance() {
        let map = TileMap::room(12, 12, 4, 1).unwrap();
        // 4.5 cells in, straight along +x towards the wall at x = 11
        let hit = cast_ray(&map, IVec2::new(1152, 1152), IVec2::new(ONE, 0)).unwrap();
        assert_eq!(hit.cell, IVec2::new(11, 4));
        assert!(!hit.side);
        assert_eq!(hit.perp, (11 << 8) - 1152);
        // ray.y is clamped to 1, which nudges the face position
        assert_eq!(hit.wall_x, 128 + (1664 >> 8));
    }

    #[test]
    fn ray_from_negative_side() {
        let map = TileMap::room(12, 12, 4, 1).unwrap();
        let hit = cast_ray(&map, IVec2::new(1152, 1152), IVec2::new(0, -ONE)).unwrap();
        assert_eq!(hit.cell, IVec2::new(4, 0));
        assert!(hit.side);
        // near face of cell 0 is at y = 1
        assert_eq!(hit.perp, 1152 - 256);
    }

    #[test]
    fn ray_leaving_the_map_misses() {
        let map = TileMap::new(6, 6, 4).unwrap();
        assert_eq!(cast_ray(&map, IVec2::new(768, 768), IVec2::new(ONE, 40)), None);
    }

    #[test]
    fn geometry_scales_with_distance() {
        let cam = Camera::new(0.0, 0.5, 160);
        let screen = Screen { w: 160, h: 120 };
        // eye at half a cell
        let view = viewer(0, 0, 8 << 8);
        let near = wall_geometry(&cam, &screen, &view, 16, 2 * ONE);
        let far = wall_geometry(&cam, &screen, &view, 16, 4 * ONE);
        assert!((near.height - 2 * far.height).abs() <= 2, "{near:?} {far:?}");
        // horizon splits the strip evenly
        let mid = near.start_row + near.height / 2;
        assert!((mid - 60).abs() <= 1, "{near:?}");
    }

    #[test]
    fn fractional_top_rounds_down_after_centring() {
        let cam = Camera::new(0.0, default_fov(160, 120), 160);
        let screen = Screen { w: 160, h: 120 };
        let view = viewer(0, 0, 6 << 8);
        // one cell away the strip covers the whole screen
        let g = wall_geometry(&cam, &screen, &view, 16, ONE);
        assert_eq!(g, WallGeometry { start_row: -14, height: 120 });
        // top at -56.66 px: row 60 - 56.66 = 3.34 starts on row 3
        let g = wall_geometry(&cam, &screen, &view, 16, 333);
        assert_eq!(g, WallGeometry { start_row: 3, height: 92 });
    }

    #[test]
    fn miss_and_missing_texture_keep_stale_depth() {
        // open field: the only wall has no texture
        let mut map = TileMap::new(8, 8, 4).unwrap();
        map.set(7, 4, 2);
        let cam = Camera::new(0.0, 0.66, 8);
        let screen = Screen { w: 8, h: 8 };
        let view = viewer(1152, 1152, 8 << 8);
        let mut depth = DepthBuffer(vec![77; 8]);
        let mut calls = Vec::new();
        let n = cast_walls(
            &map,
            &cam,
            &screen,
            &view,
            &bank(),
            &mut depth,
            &mut WallCache::default(),
            &mut calls,
        );
        assert_eq!(n, 0);
        assert!(calls.is_empty());
        assert!(depth.as_slice().iter().all(|&d| d == 77));
    }

    #[test]
    fn memo_never_changes_output() {
        let map = TileMap::room(10, 10, 4, 1).unwrap();
        let cam = Camera::new(0.3, 0.66, 64);
        let screen = Screen { w: 64, h: 48 };
        let view = viewer(1000, 1300, 6 << 8);
        let bank = bank();

        let run = |cache: &mut WallCache| {
            let mut calls = Vec::new();
            let mut depth = DepthBuffer::new(64);
            cast_walls(&map, &cam, &screen, &view, &bank, &mut depth, cache, &mut calls);
            (calls, depth.as_slice().to_vec())
        };
        let mut on = WallCache::default();
        let mut off = WallCache::default();
        off.set_enabled(false);
        assert!(on.is_enabled() && !off.is_enabled());
        assert_eq!(run(&mut on), run(&mut off));
        assert_eq!(off.hits(), 0);
    }
}
