//! Headless frame benchmark.
//!
//! ```bash
//! cargo run --release --bin headless -- [map.txt] --frames 600
//! ```
//!
//! Renders a slow turn on the spot and prints the average frame time and a
//! hash of the last frame, so two builds can be compared pixel for pixel.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;

use gridcast_rs::{
    assets,
    engine::{Engine, Screen},
    renderer::{Rgba, Software},
    sim::{InputCmd, TicRunner, player_input},
    world::{Camera, Grid, LoadedMap, default_fov, load_map, parse_map},
};

#[derive(Parser, Debug)]
#[command(version, about = "Render frames off-screen and report timings")]
struct Args {
    /// ASCII map file; the built-in demo level is used when omitted.
    map: Option<PathBuf>,

    #[arg(long, default_value_t = assets::DEMO_SCALE)]
    cell_scale: u32,

    #[arg(long, default_value_t = 320)]
    width: usize,

    #[arg(long, default_value_t = 200)]
    height: usize,

    #[arg(long)]
    fov: Option<f32>,

    #[arg(long, default_value_t = 1.0)]
    wall_z_scale: f32,

    #[arg(long, default_value_t = 300)]
    frames: usize,

    /// Simulated time per frame.
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,

    #[arg(long)]
    no_wall_cache: bool,
}

fn frame_hash(fb: &[Rgba]) -> u64 {
    fb.iter().fold(0xcbf2_9ce4_8422_2325, |h, &p| {
        (h ^ p as u64).wrapping_mul(0x0100_0000_01b3)
    })
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    // ─────────── load map & content ───────
    let loaded = match &args.map {
        Some(path) => load_map(path, args.cell_scale)?,
        None => parse_map(assets::DEMO_MAP, assets::DEMO_SCALE)?,
    };
    let bank = assets::demo_bank()?;
    let tile = loaded.map.tile_size();

    let mut sim = TicRunner::new(loaded.cell_centre(loaded.viewer), tile);
    let spawned = assets::populate(&mut sim, &loaded, &bank);
    log::info!(
        "map {}x{} cells, {} sprites, {} textures",
        loaded.map.width(),
        loaded.map.height(),
        spawned.len(),
        bank.len()
    );

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

    // ─────────── render loop ───────
    let tick = Duration::from_millis(args.tick_ms);
    let spin = InputCmd {
        forward: 0.0,
        turn: 0.25,
    };
    let mut render_time = Duration::ZERO;
    let mut cache_hits = 0u64;
    let mut last_hash = 0;

    for _ in 0..args.frames {
        let viewer = sim.viewer();
        player_input(sim.world_mut(), viewer, &mut engine.camera, tile, spin, tick);
        sim.advance(tick);

        let t0 = Instant::now();
        engine.render_frame(&sim, |fb, _, _| last_hash = frame_hash(fb));
        render_time += t0.elapsed();
        cache_hits += u64::from(engine.stats().cache_hits);
    }

    if args.frames > 0 {
        let avg_ms = render_time.as_secs_f64() * 1000.0 / args.frames as f64;
        let fps = 1000.0 / avg_ms;
        println!("avg render: {:.2} ms  ({:.1} FPS)", avg_ms, fps);
        println!("wall memo hits: {cache_hits}");
        println!("last frame: {last_hash:016x}");
    }
    Ok(())
}
