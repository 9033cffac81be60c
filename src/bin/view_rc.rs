use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use glam::IVec2;
use hecs::World;
use minifb::{Key, KeyRepeat, Scale, Window, WindowOptions};

use gridcast_rs::{
    assets,
    engine::{Engine, Screen},
    renderer::{Rgba, Software},
    sim::{InputCmd, Position, Size, TicRunner, Velocity, player_input},
    world::{Camera, Grid, LoadedMap, TextureBank, TileMap, default_fov, load_map, parse_map},
};

/// Interactive ray-caster window.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// ASCII map file; the built-in demo level is used when omitted.
    map: Option<PathBuf>,

    /// log2 of world units per map cell.
    #[arg(long, default_value_t = assets::DEMO_SCALE)]
    cell_scale: u32,

    #[arg(long, default_value_t = 160)]
    width: usize,

    #[arg(long, default_value_t = 120)]
    height: usize,

    /// Window pixels per frame pixel (1, 2, 4 or 8).
    #[arg(long, default_value_t = 4)]
    scale: u32,

    /// Projection-plane half width; defaults to width / height / 2.
    #[arg(long)]
    fov: Option<f32>,

    #[arg(long, default_value_t = 1.0)]
    wall_z_scale: f32,

    /// Disable the wall geometry memo.
    #[arg(long)]
    no_wall_cache: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ViewMode {
    TileMap,
    Raycasting,
}

const JUMP_HEIGHT: f32 = 12.0;
const JUMP_MS: u32 = 400;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let loaded = match &args.map {
        Some(path) => load_map(path, args.cell_scale)?,
        None => parse_map(assets::DEMO_MAP, assets::DEMO_SCALE)?,
    };
    let bank = assets::demo_bank()?;
    let tile = loaded.map.tile_size();

    let mut sim = TicRunner::new(loaded.cell_centre(loaded.viewer), tile);
    let spawned = assets::populate(&mut sim, &loaded, &bank);
    println!("map {}x{}, {} sprites", loaded.map.width(), loaded.map.height(), spawned.len());

    let screen = Screen {
        w: args.width,
        h: args.height,
    };
    let fov = args.fov.unwrap_or_else(|| default_fov(screen.w, screen.h));
    let mut camera = Camera::new(0.0, fov, screen.w);
    camera.set_wall_z_scale(args.wall_z_scale);

    let LoadedMap { map, .. } = loaded;
    let mut engine = Engine::new(Software::default(), map, camera, bank, screen);
    engine.set_wall_cache(!args.no_wall_cache);
    engine.on_sprite_direction(|e, dir| log::trace!("{e:?} heading {dir:.2}"));

    let scale = match args.scale {
        1 => Scale::X1,
        2 => Scale::X2,
        8 => Scale::X8,
        _ => Scale::X4,
    };
    let mut win = Window::new(
        "gridcast - Tab: view mode, Space: jump, PgUp/PgDn: height",
        screen.w,
        screen.h,
        WindowOptions {
            scale,
            ..WindowOptions::default()
        },
    )?;
    win.set_target_fps(60);

    let mut mode = ViewMode::Raycasting;
    let mut top_down: Vec<Rgba> = vec![0; screen.w * screen.h];
    let mut eye_offset = 0.0;

    // ────────────────── benchmarking state ──────────────────────────────
    let mut acc_time = Duration::ZERO;
    let mut acc_frames = 0usize;
    let mut last_print = Instant::now();
    let mut last_tick = Instant::now();

    while win.is_open() && !win.is_key_down(Key::Escape) {
        let dt = last_tick.elapsed();
        last_tick = Instant::now();
        let t0 = Instant::now();

        /* --------------- input ------------------------------------------- */
        let mut cmd = InputCmd::default();
        if win.is_key_down(Key::Up) || win.is_key_down(Key::W) {
            cmd.forward += 1.0;
        }
        if win.is_key_down(Key::Down) || win.is_key_down(Key::S) {
            cmd.forward -= 1.0;
        }
        if win.is_key_down(Key::Left) || win.is_key_down(Key::A) {
            cmd.turn -= 1.0;
        }
        if win.is_key_down(Key::Right) || win.is_key_down(Key::D) {
            cmd.turn += 1.0;
        }
        if win.is_key_pressed(Key::Tab, KeyRepeat::No) {
            mode = match mode {
                ViewMode::TileMap => ViewMode::Raycasting,
                ViewMode::Raycasting => ViewMode::TileMap,
            };
            log::info!("view mode {mode:?}");
        }
        let viewer = sim.viewer();
        if win.is_key_pressed(Key::Space, KeyRepeat::No) {
            sim.jump_with_height_and_duration(viewer, JUMP_HEIGHT, JUMP_MS);
        }
        if win.is_key_pressed(Key::PageUp, KeyRepeat::No) {
            eye_offset += 4.0;
            sim.set_z_offset(viewer, eye_offset, 300);
        }
        if win.is_key_pressed(Key::PageDown, KeyRepeat::No) {
            eye_offset -= 4.0;
            sim.set_z_offset(viewer, eye_offset, 300);
        }

        /* --------------- update ------------------------------------------ */
        player_input(sim.world_mut(), viewer, &mut engine.camera, tile, cmd, dt);
        bounce_off_walls(sim.world_mut(), &spawned, &engine.map);
        sim.advance(dt);

        /* --------------- draw -------------------------------------------- */
        let mut present = |fb: &[Rgba], w: usize, h: usize| {
            acc_time += t0.elapsed();
            acc_frames += 1;
            if let Err(e) = win.update_with_buffer(fb, w, h) {
                log::error!("present failed: {e}");
            }
        };
        match mode {
            ViewMode::Raycasting => engine.render_frame(&sim, present),
            ViewMode::TileMap => {
                draw_tile_map(&mut top_down, &screen, &engine.map, &engine.texture_bank, &sim, &engine.camera);
                present(&top_down, screen.w, screen.h);
            }
        }

        if last_print.elapsed() >= Duration::from_secs(3) && acc_frames > 0 {
            let avg_ms = acc_time.as_secs_f64() * 1000.0 / acc_frames as f64;
            let fps = 1000.0 / avg_ms;
            println!("avg render: {:.2} ms  ({:.1} FPS)  {:?}", avg_ms, fps, engine.stats());
            acc_time = Duration::ZERO;
            acc_frames = 0;
            last_print = Instant::now();
        }
    }
    Ok(())
}

/// Reverse any walker about to step into a solid cell.
fn bounce_off_walls(world: &mut World, walkers: &[hecs::Entity], map: &TileMap) {
    let tile = map.tile_size();
    for &e in walkers {
        if let Ok((pos, vel)) = world.query_one_mut::<(&Position, &mut Velocity)>(e) {
            if vel.0 == IVec2::ZERO {
                continue;
            }
            // look half a cell ahead
            let ahead = pos.0 + vel.0.signum() * (tile << 7);
            let cell = map.cell_of(ahead);
            if map.is_outside(cell.x, cell.y) || map.get(cell.x, cell.y) != 0 {
                vel.0 = -vel.0;
            }
        }
    }
}

/// World position (Q8 units) to top-down pixel, `cell_px` pixels per cell.
fn map_px(p: IVec2, cell_px: i32, tile: i32) -> IVec2 {
    (p * cell_px / tile) >> 8i32
}

/// Top-down view: one box per cell coloured by its wall texture, sprites
/// as yellow boxes, the viewer as a box with a heading line.
fn draw_tile_map(
    fb: &mut [Rgba],
    screen: &Screen,
    map: &TileMap,
    bank: &TextureBank,
    sim: &TicRunner,
    cam: &Camera,
) {
    let pal = bank.palette();
    fb.fill(pal[15]);
    let cell_px = (screen.w / map.width()).min(screen.h / map.height()).max(1) as i32;
    let tile = map.tile_size();

    let mut rect = |x: i32, y: i32, w: i32, h: i32, c: Rgba| {
        for py in y.max(0)..(y + h).min(screen.h as i32) {
            for px in x.max(0)..(x + w).min(screen.w as i32) {
                fb[py as usize * screen.w + px as usize] = c;
            }
        }
    };

    for cy in 0..map.height() as i32 {
        for cx in 0..map.width() as i32 {
            let id = map.get(cx, cy);
            let c = match bank.texture(id) {
                Some(tex) => pal[tex.pixel(tex.w / 2, tex.h / 2)],
                None if id == 0 => pal[12],
                None => pal[10],
            };
            rect(cx * cell_px, cy * cell_px, cell_px, cell_px, c);
        }
    }

    for &e in sim.tracked() {
        let world = sim.world();
        let (Ok(pos), Ok(size)) = (world.get::<&Position>(e), world.get::<&Size>(e)) else {
            continue;
        };
        let c = map_px(pos.0, cell_px, tile);
        let half = (size.w * cell_px / tile / 2).max(1);
        let color = if e == sim.viewer() { pal[6] } else { pal[5] };
        rect(c.x - half, c.y - half, 2 * half, 2 * half, color);

        if e == sim.viewer() {
            let (sin, cos) = cam.view_angle().sin_cos();
            for step in 0..cell_px {
                let x = c.x + (cos * step as f32) as i32;
                let y = c.y + (sin * step as f32) as i32;
                rect(x, y, 1, 1, pal[2]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_px_scales_cells_to_boxes() {
        // centre of cell (2, 1) with 16-unit cells drawn 8 px wide
        let centre = IVec2::new(40 << 8, 24 << 8);
        assert_eq!(map_px(centre, 8, 16), IVec2::new(20, 12));
        assert_eq!(map_px(IVec2::ZERO, 8, 16), IVec2::ZERO);
    }
}
