use glam::IVec2;
use thiserror::Error;

/// Contents of one map cell. `0` is empty, anything else names a texture.
pub type CellId = u16;

pub const EMPTY: CellId = 0;

/// Host map storage as seen by the ray caster.
///
/// Coordinates are whole grid cells. `get` is only called for cells
/// where `is_outside` returned `false`.
pub trait Grid {
    fn is_outside(&self, x: i32, y: i32) -> bool;

    fn get(&self, x: i32, y: i32) -> CellId;

    /// log2 of world units per cell.
    fn scale(&self) -> u32;

    /// World units per cell.
    #[inline]
    fn tile_size(&self) -> i32 {
        1 << self.scale()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("map has no rows")]
    Empty,

    #[error("row {row} is {found} cells wide, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("unknown tile character `{0}`")]
    UnknownTile(char),

    #[error("map has no viewer start (`@`)")]
    NoViewerStart,

    #[error("map of {0}x{1} cells exceeds the supported size")]
    TooLarge(usize, usize),

    #[error("cell scale {0} exceeds the supported maximum")]
    ScaleTooLarge(u32),

    #[error("row {row} follows a blank line")]
    GapInRows { row: usize },
}

/// Largest side accepted, keeps every Q16 DDA accumulator inside `i32`.
pub const MAX_SIDE: usize = 1024;

/// Largest log2 cell size, keeps a Q8 position `MAX_SIDE` cells out inside `i32`.
pub const MAX_SCALE: u32 = 12;

/// Dense row-major grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileMap {
    width: usize,
    height: usize,
    scale: u32,
    cells: Vec<CellId>,
}

impl TileMap {
    /// Empty `width × height` map with `1 << scale` world units per cell.
    pub fn new(width: usize, height: usize, scale: u32) -> Result<Self, MapError> {
        if width == 0 || height == 0 {
            return Err(MapError::Empty);
        }
        if width > MAX_SIDE || height > MAX_SIDE {
            return Err(MapError::TooLarge(width, height));
        }
        if scale > MAX_SCALE {
            return Err(MapError::ScaleTooLarge(scale));
        }
        Ok(Self {
            width,
            height,
            scale,
            cells: vec![EMPTY; width * height],
        })
    }

    /// Build from rows of cell ids; every row must be equally wide.
    pub fn from_rows(rows: &[Vec<CellId>], scale: u32) -> Result<Self, MapError> {
        let expected = rows.first().map(Vec::len).ok_or(MapError::Empty)?;
        let mut map = Self::new(expected, rows.len(), scale)?;
        for (y, row) in rows.iter().enumerate() {
            if row.len() != expected {
                return Err(MapError::Ragged {
                    row: y,
                    expected,
                    found: row.len(),
                });
            }
            map.cells[y * expected..(y + 1) * expected].copy_from_slice(row);
        }
        Ok(map)
    }

    /// A closed `width × height` room: border cells set to `wall`.
    pub fn room(width: usize, height: usize, scale: u32, wall: CellId) -> Result<Self, MapError> {
        let mut map = Self::new(width, height, scale)?;
        for x in 0..width as i32 {
            map.set(x, 0, wall);
            map.set(x, height as i32 - 1, wall);
        }
        for y in 0..height as i32 {
            map.set(0, y, wall);
            map.set(width as i32 - 1, y, wall);
        }
        Ok(map)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Overwrite one cell; out-of-range writes are ignored.
    pub fn set(&mut self, x: i32, y: i32, id: CellId) {
        if !self.is_outside(x, y) {
            self.cells[y as usize * self.width + x as usize] = id;
        }
    }

    /// Cell containing the world-space point `p` (world units, Q8).
    #[inline]
    pub fn cell_of(&self, p: IVec2) -> IVec2 {
        IVec2::new(p.x >> (8 + self.scale), p.y >> (8 + self.scale))
    }
}

impl Grid for TileMap {
    #[inline]
    fn is_outside(&self, x: i32, y: i32) -> bool {
        x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32
    }

    #[inline]
    fn get(&self, x: i32, y: i32) -> CellId {
        if self.is_outside(x, y) {
            return EMPTY;
        }
        self.cells[y as usize * self.width + x as usize]
    }

    #[inline]
    fn scale(&self) -> u32 {
        self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_has_solid_border_and_empty_inside() {
        let map = TileMap::room(5, 4, 4, 2).unwrap();
        assert_eq!(map.get(0, 0), 2);
        assert_eq!(map.get(4, 3), 2);
        assert_eq!(map.get(2, 2), EMPTY);
        assert!(map.is_outside(5, 0));
        assert!(map.is_outside(-1, 2));
        assert_eq!(map.tile_size(), 16);
    }

    #[test]
    fn ragged_rows_rejected() {
        let rows = vec![vec![1, 1, 1], vec![1, 0]];
        assert_eq!(
            TileMap::from_rows(&rows, 4).unwrap_err(),
            MapError::Ragged {
                row: 1,
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn oversized_maps_rejected() {
        assert_eq!(TileMap::new(8, 8, 17).unwrap_err(), MapError::ScaleTooLarge(17));
        assert_eq!(
            TileMap::room(4, 4, MAX_SCALE + 1, 1).unwrap_err(),
            MapError::ScaleTooLarge(MAX_SCALE + 1)
        );
        assert_eq!(
            TileMap::new(MAX_SIDE + 1, 2, 4).unwrap_err(),
            MapError::TooLarge(MAX_SIDE + 1, 2)
        );
        assert_eq!(TileMap::new(2, 2, MAX_SCALE).unwrap().tile_size(), 1 << MAX_SCALE);
    }

    #[test]
    fn cell_of_uses_scale() {
        let map = TileMap::new(8, 8, 4).unwrap();
        // 40 world units = 2.5 cells of 16
        assert_eq!(map.cell_of(IVec2::new(40 << 8, 16 << 8)), IVec2::new(2, 1));
    }
}
