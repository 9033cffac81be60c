//! Billboard sprites: camera-space transform, cone culling, painter's sort,
//! and clipping against the per-column depth buffer.

use std::collections::HashMap;
use std::f32::consts::TAU;

use glam::IVec2;
use hecs::{Entity, World};

use crate::{
    engine::{
        types::{Screen, Viewer},
        walls::DepthBuffer,
    },
    fixed::{FRAC_BITS, Fixed, ONE, div_ceil, from_fixed},
    renderer::{DrawCall, SpriteBlit},
    sim::{
        Appearance, DirectionalFrames, MotionTable, Overlay, Position, Size, SpriteFlags, Velocity,
    },
    world::{camera::Camera, texture::TextureBank},
};

/// Called with each drawn sprite and its heading relative to the viewer,
/// in turns.
pub type DirectionHandler = Box<dyn FnMut(Entity, f32)>;

/// Camera-space position of one sprite this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpriteTransform {
    /// Lateral offset, Q8 cells.
    pub x: Fixed,
    /// Depth into the screen, Q8 cells.
    pub y: Fixed,
    /// `atan2(dx, dy)` of the viewer → sprite offset.
    pub angle_to_viewer: f32,
}

/// Read-only inputs of the sprite stage.
pub struct SpriteScene<'a> {
    pub world: &'a World,
    pub motion: &'a MotionTable,
    pub tracked: &'a [Entity],
    pub cam: &'a Camera,
    pub screen: &'a Screen,
    pub view: &'a Viewer,
    pub bank: &'a TextureBank,
    pub depth: &'a DepthBuffer,
    pub tile: i32,
    pub now_ms: u64,
}

/// `1 / det[plane dir]` in Q8.
#[inline]
pub fn inverse_det(cam: &Camera) -> i64 {
    let (d, p) = (cam.dir(), cam.plane());
    let det = p.x as i64 * d.y as i64 - d.x as i64 * p.y as i64;
    (1i64 << 24) / det.max(1)
}

/// Camera-space transform of the Q8 cell offset `rel`.
pub fn transform(cam: &Camera, inv_det: i64, rel: IVec2) -> SpriteTransform {
    let (d, p) = (cam.dir(), cam.plane());
    let (sx, sy) = (rel.x as i64, rel.y as i64);
    let tx = inv_det * (d.y as i64 * sx - d.x as i64 * sy) >> 16;
    let ty = inv_det * (-(p.y as i64) * sx + p.x as i64 * sy) >> 16;
    SpriteTransform {
        x: tx as Fixed,
        y: ty as Fixed,
        angle_to_viewer: from_fixed(rel.x).atan2(from_fixed(rel.y)),
    }
}

/// Inside the view cone (inclusive) and in front of the viewer.
pub fn in_view_cone(cam: &Camera, t: &SpriteTransform) -> bool {
    if t.y <= 0 {
        return false;
    }
    let angle = (from_fixed(t.x) * cam.fov()).atan2(from_fixed(t.y));
    angle.abs() <= cam.cull_half_angle()
}

/// Heading of `vel` relative to the viewer → sprite line, in turns.
#[inline]
pub fn relative_direction(vel: IVec2, angle_to_viewer: f32) -> f32 {
    ((vel.x as f32).atan2(vel.y as f32) - angle_to_viewer) / TAU + 2.0 - 0.25
}

/// First run of columns nearer than the walls that overlaps
/// `[left, right]`; otherwise whatever run the scan ended on.
fn visible_run(depth: &[Fixed], ty: Fixed, left: i32, right: i32) -> (i32, i32) {
    let (mut bx, mut bw) = (0i32, 0i32);
    for (x, &d) in depth.iter().enumerate() {
        if d > ty {
            if bw == 0 {
                bx = x as i32;
            }
            bw += 1;
        } else if bw > 0 {
            if bx <= right && bx + bw >= left {
                break;
            }
            bx = 0;
            bw = 0;
        }
    }
    (bx, bw)
}

/// Transform, cull, sort and emit blits for every tracked sprite. Fills
/// `transforms` for every projected entity. Returns the number of sprites
/// with a visible slice.
pub fn project_sprites(
    scene: &SpriteScene<'_>,
    transforms: &mut HashMap<Entity, SpriteTransform>,
    mut on_direction: Option<&mut DirectionHandler>,
    calls: &mut Vec<DrawCall>,
) -> usize {
    transforms.clear();
    let inv_det = inverse_det(scene.cam);

    let mut order: Vec<(Entity, Fixed)> = Vec::with_capacity(scene.tracked.len());
    for &e in scene.tracked {
        if e == scene.view.entity {
            continue;
        }
        let Ok(pos) = scene.world.get::<&Position>(e) else {
            continue;
        };
        let flags = scene
            .world
            .get::<&SpriteFlags>(e)
            .map_or(SpriteFlags::empty(), |f| *f);
        if flags.intersects(SpriteFlags::RELATIVE_TO_CAMERA | SpriteFlags::INVISIBLE) {
            continue;
        }
        let rel = pos.0 / scene.tile - scene.view.pos;
        let t = transform(scene.cam, inv_det, rel);
        transforms.insert(e, t);
        if in_view_cone(scene.cam, &t) {
            order.push((e, t.y));
        }
    }

    // far → near; stable for equal depth
    order.sort_by(|a, b| b.1.cmp(&a.1));

    let mut drawn = 0;
    for (e, _) in order {
        let t = transforms[&e];
        if draw_sprite(scene, e, &t, on_direction.as_deref_mut(), calls) {
            drawn += 1;
        }
    }
    log::trace!("sprites: {} projected, {drawn} visible", transforms.len());
    drawn
}

fn draw_sprite(
    scene: &SpriteScene<'_>,
    e: Entity,
    t: &SpriteTransform,
    on_direction: Option<&mut DirectionHandler>,
    calls: &mut Vec<DrawCall>,
) -> bool {
    let world = scene.world;
    let Ok(size) = world.get::<&Size>(e).map(|s| *s) else {
        return false;
    };
    let tile = scene.tile as i64;
    let ty = t.y as i64;

    /* horizontal extent */
    let half_w = scene.screen.half_w() as i64;
    let screen_x = div_ceil(half_w * (ty - t.x as i64), ty) as i32;
    let half_px = ((((size.w as i64) << FRAC_BITS) / tile / 2)
        * scene.cam.wall_width_in_view() as i64
        / ty) as i32;
    if half_px <= 0 {
        return false;
    }
    let (left, right) = (screen_x - half_px, screen_x + half_px);

    let (blit_x, blit_w) = visible_run(scene.depth.as_slice(), t.y, left, right);
    let x0 = blit_x.max(left);
    let width = (blit_x + blit_w).min(right) - x0;
    if width <= 0 {
        return false;
    }

    /* vertical extent */
    let line_h = scene.cam.wall_height_in_view() as i64 / ty;
    let z = scene.motion.z_fixed(e) as i64;
    let above = (scene.view.view_z as i64 - z - ((size.h as i64) << FRAC_BITS)) / tile;
    let draw_start = scene.screen.half_h() + ((line_h * above) >> FRAC_BITS) as i32;
    let dst_h = (line_h * size.h as i64 / tile) as i32;

    /* image */
    let vel = world.get::<&Velocity>(e).map_or(IVec2::ZERO, |v| v.0);
    let dir = relative_direction(vel, t.angle_to_viewer);
    if let Some(cb) = on_direction {
        cb(e, dir);
    }
    let tex_id = world
        .get::<&DirectionalFrames>(e)
        .ok()
        .and_then(|f| f.frame_for(dir))
        .or_else(|| world.get::<&Appearance>(e).ok().map(|a| a.0));
    let Some((tex_id, tex)) = tex_id.and_then(|id| scene.bank.texture(id).map(|tex| (id, tex))) else {
        return false;
    };

    let span = 2 * half_px as i64;
    let tw = tex.w as i64;
    let src_w = ((width as i64 * tw / span) as i32).max(1);
    let mut src_x = ((x0 - left) as i64 * tw / span) as i32;
    let mirrored = world
        .get::<&SpriteFlags>(e)
        .is_ok_and(|f| f.contains(SpriteFlags::MIRRORED));
    if mirrored {
        // the clipped run counts from the image's right edge
        src_x = tex.w as i32 - src_x - src_w;
    }
    calls.push(DrawCall::Sprite(SpriteBlit {
        dst_x: x0,
        dst_y: draw_start,
        dst_w: width,
        dst_h,
        tex_id,
        src_x,
        src_y: 0,
        src_w,
        src_h: tex.h as i32,
        flip_x: mirrored,
    }));

    if let Ok(overlay) = world.get::<&Overlay>(e).map(|o| *o) {
        draw_overlay(scene, &overlay, t, screen_x, draw_start, (blit_x, blit_w), calls);
    }
    true
}

/// Overlay texture scaled by distance, bottom edge on the sprite's top,
/// clipped to the sprite's wall-free run.
fn draw_overlay(
    scene: &SpriteScene<'_>,
    overlay: &Overlay,
    t: &SpriteTransform,
    screen_x: i32,
    sprite_top: i32,
    (run_x, run_w): (i32, i32),
    calls: &mut Vec<DrawCall>,
) {
    if overlay.is_expired(scene.now_ms) {
        return;
    }
    let Some(tex) = scene.bank.texture(overlay.texture) else {
        log::warn!("overlay texture {} missing", overlay.texture);
        return;
    };
    let ty = t.y as i64;
    let full_w = (tex.w as i64 * ONE as i64 / ty) as i32;
    let dst_h = (tex.h as i64 * ONE as i64 / ty) as i32;
    if full_w <= 0 || dst_h <= 0 {
        return;
    }
    let left = screen_x - full_w / 2;
    let x0 = left.max(run_x);
    let x1 = (left + full_w).min(run_x + run_w);
    if x1 <= x0 {
        return;
    }
    let tw = tex.w as i64;
    calls.push(DrawCall::Sprite(SpriteBlit {
        dst_x: x0,
        dst_y: sprite_top - dst_h,
        dst_w: x1 - x0,
        dst_h,
        tex_id: overlay.texture,
        src_x: ((x0 - left) as i64 * tw / full_w as i64) as i32,
        src_y: 0,
        src_w: (((x1 - x0) as i64 * tw / full_w as i64) as i32).max(1),
        src_h: tex.h as i32,
        flip_x: false,
    }));
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
