pub mod camera;
pub mod grid;
pub mod loader;
pub mod texture;

pub use camera::{Camera, default_fov};
pub use grid::{CellId, EMPTY, Grid, MAX_SCALE, MapError, TileMap};
pub use loader::{LoadError, LoadedMap, load_map, parse_map};
pub use texture::{ColorIndex, Palette, TRANSPARENT, Texture, TextureBank, TextureError, TextureId};
