// ──────────────────────────────────────────────────────────────────────────
// world/loader.rs
//
//  *   ASCII map text  ──>  world::grid::TileMap
//                           + viewer start / entity spawn cells
//
//  Legend:  `.` or ` `  empty          `#`       cell id 1
//           `1`..`9`    cell id 1..9   `a`..`z`  cell id 10..35
//           `@`         viewer start   `E`       entity spawn
//           lines starting with `;` are comments
// ──────────────────────────────────────────────────────────────────────────

use std::collections::HashMap;
use std::path::Path;

use glam::IVec2;
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::world::grid::{CellId, EMPTY, Grid, MapError, TileMap};

/*──────────────────────────── Error type ───────────────────────────*/

#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Map(#[from] MapError),
}

/// What a map file describes besides its walls.
#[derive(Clone, Debug)]
pub struct LoadedMap {
    pub map: TileMap,
    /// Cell the viewer starts in.
    pub viewer: IVec2,
    /// Cells with an entity spawn marker, in reading order.
    pub spawns: Vec<IVec2>,
}

impl LoadedMap {
    /// World-space centre (Q8) of `cell`.
    pub fn cell_centre(&self, cell: IVec2) -> IVec2 {
        let tile = self.map.tile_size();
        (cell * tile + IVec2::splat(tile / 2)) << 8
    }
}

static LEGEND: Lazy<HashMap<char, CellId>> = Lazy::new(|| {
    let mut map = HashMap::with_capacity(40);
    map.insert('.', EMPTY);
    map.insert(' ', EMPTY);
    map.insert('@', EMPTY);
    map.insert('E', EMPTY);
    map.insert('#', 1);
    for (i, c) in ('1'..='9').enumerate() {
        map.insert(c, i as CellId + 1);
    }
    for (i, c) in ('a'..='z').enumerate() {
        map.insert(c, i as CellId + 10);
    }
    map
});

/*====================================================================*/
/*                       Public API                                   */
/*====================================================================*/

/// Read and parse a map file; `scale` is log2 of world units per cell.
pub fn load_map<P: AsRef<Path>>(path: P, scale: u32) -> Result<LoadedMap, LoadError> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_map(&text, scale)?)
}

/// Parse map text. Short rows are an error, and so is a row after a blank
/// line; leading and trailing blank lines are skipped.
pub fn parse_map(text: &str, scale: u32) -> Result<LoadedMap, MapError> {
    let mut rows: Vec<Vec<CellId>> = Vec::new();
    let mut viewer = None;
    let mut spawns = Vec::new();
    let mut after_blank = false;

    let lines = text
        .lines()
        .filter(|l| !l.starts_with(';'))
        .map(|l| l.trim_end_matches('\r'));

    for line in lines {
        if line.trim().is_empty() && rows.is_empty() {
            continue;
        }
        if line.is_empty() {
            after_blank = true;
            continue;
        }
        if after_blank {
            return Err(MapError::GapInRows { row: rows.len() });
        }
        let y = rows.len() as i32;
        let mut row = Vec::with_capacity(line.len());
        for (x, c) in line.chars().enumerate() {
            let id = *LEGEND.get(&c).ok_or(MapError::UnknownTile(c))?;
            match c {
                '@' => viewer = Some(IVec2::new(x as i32, y)),
                'E' => spawns.push(IVec2::new(x as i32, y)),
                _ => {}
            }
            row.push(id);
        }
        rows.push(row);
    }

    let map = TileMap::from_rows(&rows, scale)?;
    let viewer = viewer.ok_or(MapError::NoViewerStart)?;
    log::debug!(
        "parsed {}x{} map, {} spawn(s)",
        map.width(),
        map.height(),
        spawns.len()
    );
    Ok(LoadedMap {
        map,
        viewer,
        spawns,
    })
}
