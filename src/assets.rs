//! Built-in demo content: a small level, procedural wall textures and a
//! handful of sprites, so the binaries run without any files on disk.

use glam::IVec2;
use hecs::Entity;

use crate::{
    sim::{DirectionalFrames, Overlay, Size, TicRunner, Velocity},
    world::{
        Grid, LoadedMap,
        texture::{ColorIndex, Palette, Texture, TextureBank, TextureError},
    },
};

/// log2 of world units per cell used by the demo (16 px cells).
pub const DEMO_SCALE: u32 = 4;

pub const DEMO_MAP: &str = "\
; demo level: `@` viewer, `E` sprite spawns
################
#@.....#.......#
#......#...E...#
#..2...3.......#
#......#...4...#
#..E...........#
#......######..#
#.............E#
#..E...........#
################
";

const WALL: usize = 16;

fn procedural<F>(name: &str, f: F) -> Texture
where
    F: Fn(usize, usize) -> ColorIndex,
{
    let mut pixels = Vec::with_capacity(WALL * WALL);
    for y in 0..WALL {
        for x in 0..WALL {
            pixels.push(f(x, y));
        }
    }
    Texture {
        name: name.to_owned(),
        w: WALL,
        h: WALL,
        pixels,
    }
}

const BARREL: [&str; 8] = [
    "..4444..", ".4eeee4.", ".444444.", ".4eeee4.", ".4eeee4.", ".444444.", ".4eeee4.",
    "..4444..",
];

// front, left, back, right
const GHOST: [[&str; 8]; 4] = [
    [
        "..1111..", ".111111.", "11811811", "11111111", "11111111", "11111111", "11111111",
        "1.11.11.",
    ],
    [
        "..1111..", ".111111.", "18118111", "11111111", "11111111", "11111111", "11111111",
        ".11.11.1",
    ],
    [
        "..1111..", ".111111.", "11111111", "11111111", "11111111", "11111111", "11111111",
        "1.11.11.",
    ],
    [
        "..1111..", ".111111.", "11181181", "11111111", "11111111", "11111111", "11111111",
        ".11.11.1",
    ],
];

const BUBBLE: [&str; 6] = [
    "111111111111",
    "1ff1f1ff1ff1",
    "111111111111",
    "1f1ff1f1ff11",
    "111111111111",
    "....11......",
];

/// Wall textures at the cell ids the demo map uses, plus sprite images.
pub fn demo_bank() -> Result<TextureBank, TextureError> {
    let mut bank = TextureBank::new(Palette::default());

    bank.insert_at(
        1,
        "BRICK",
        procedural("BRICK", |x, y| {
            let shift = (y / 4 % 2) * 4;
            if y % 4 == 3 || (x + shift) % 8 == 7 {
                13
            } else if (x * 7 + y * 3) % 5 == 0 {
                14
            } else {
                2
            }
        }),
    )?;
    bank.insert_at(
        2,
        "STONE",
        procedural("STONE", |x, y| if (x / 4 + y / 4) % 2 == 0 { 11 } else { 12 }),
    )?;
    bank.insert_at(
        3,
        "WOOD",
        procedural("WOOD", |x, _| if x % 5 == 0 { 14 } else { 4 }),
    )?;
    bank.insert_at(
        4,
        "TILE",
        procedural("TILE", |x, y| {
            if x == 0 || y == 0 || x == WALL - 1 || y == WALL - 1 {
                9
            } else {
                6
            }
        }),
    )?;

    bank.insert("BARREL", Texture::from_rows("BARREL", &BARREL)?)?;
    for (i, rows) in GHOST.iter().enumerate() {
        let name = format!("GHOST_{i}");
        bank.insert(name.clone(), Texture::from_rows(name, rows)?)?;
    }
    bank.insert("BUBBLE", Texture::from_rows("BUBBLE", &BUBBLE)?)?;
    Ok(bank)
}

/// Spawn the demo sprites on the map's spawn cells: barrels and walking
/// ghosts, alternating. The first ghost says something for five seconds.
pub fn populate(sim: &mut TicRunner, loaded: &LoadedMap, bank: &TextureBank) -> Vec<Entity> {
    let (Some(barrel), Some(bubble)) = (bank.id("BARREL"), bank.id("BUBBLE")) else {
        log::warn!("demo sprite textures missing, nothing spawned");
        return Vec::new();
    };
    let ghost: Vec<_> = (0..GHOST.len())
        .filter_map(|i| bank.id(&format!("GHOST_{i}")))
        .collect();

    let tile = loaded.map.tile_size();
    let mut spawned = Vec::with_capacity(loaded.spawns.len());
    let mut talked = false;
    for (i, &cell) in loaded.spawns.iter().enumerate() {
        let pos = loaded.cell_centre(cell);
        if i % 2 == 0 || ghost.is_empty() {
            spawned.push(sim.spawn_sprite(pos, Size { w: tile / 2, h: tile / 2 }, barrel));
            continue;
        }

        let e = sim.spawn_sprite(pos, Size { w: tile * 5 / 8, h: tile * 3 / 4 }, ghost[0]);
        let heading = if i % 4 == 1 { IVec2::X } else { IVec2::Y };
        let _ = sim
            .world_mut()
            .insert(e, (Velocity(heading * (tile << 8)), DirectionalFrames::new(&ghost)));
        sim.set_z_offset(e, 3.0, 800);
        if !talked {
            sim.set_overlay(
                e,
                Overlay {
                    texture: bubble,
                    expires_at_ms: Some(5_000),
                },
            );
            talked = true;
        }
        spawned.push(e);
    }
    spawned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::parse_map;

    #[test]
    fn demo_map_parses_and_textures_cover_it() {
        let loaded = parse_map(DEMO_MAP, DEMO_SCALE).unwrap();
        let bank = demo_bank().unwrap();
        for y in 0..loaded.map.height() as i32 {
            for x in 0..loaded.map.width() as i32 {
                let id = loaded.map.get(x, y);
                assert!(id == 0 || bank.texture(id).is_some(), "cell {x},{y} id {id}");
            }
        }
        assert_eq!(loaded.spawns.len(), 4);
    }

    #[test]
    fn populate_spawns_one_sprite_per_marker() {
        let loaded = parse_map(DEMO_MAP, DEMO_SCALE).unwrap();
        let bank = demo_bank().unwrap();
        let mut sim = TicRunner::new(loaded.cell_centre(loaded.viewer), loaded.map.tile_size());
        let spawned = populate(&mut sim, &loaded, &bank);
        assert_eq!(spawned.len(), loaded.spawns.len());
        assert_eq!(sim.tracked().len(), spawned.len() + 1);
        let overlays = sim.world().query::<&Overlay>().iter().count();
        assert_eq!(overlays, 1);
    }
}
