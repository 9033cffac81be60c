//! Fixed-point grid ray caster with billboard sprites and per-entity
//! vertical motion.
//!
//! * [`world`]: map, camera, textures and the ASCII map loader.
//! * [`sim`]: the hecs entity set, Z motion and per-frame host systems.
//! * [`engine`]: wall ray caster and sprite projector producing draw calls.
//! * [`renderer`]: back-ends that rasterise those draw calls.

pub mod assets;
pub mod engine;
pub mod fixed;
pub mod renderer;
pub mod sim;
pub mod world;
