#[allow(clippy::module_inception)]
mod engine;
pub mod sprites;
pub mod types;
pub mod walls;

pub use engine::{Engine, FrameStats};
pub use sprites::{DirectionHandler, SpriteTransform};
pub use types::{Screen, Viewer};
pub use walls::{DepthBuffer, WallCache};
