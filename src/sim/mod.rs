mod components;
mod motion;
mod systems;
mod tic;

pub use components::{
    Appearance, DirectionalFrames, InputCmd, Overlay, Position, Size, SpriteFlags, Velocity,
};
pub use motion::{DEFAULT_APPROACH_MS, MotionState, MotionTable, MotionZ};
pub use systems::{MOVE_SPEED, TURN_RATE, movement, player_input};
pub use tic::TicRunner;
