use std::collections::HashMap;

use hecs::Entity;

use crate::{
    engine::{
        sprites::{self, DirectionHandler, SpriteScene, SpriteTransform},
        types::{Screen, Viewer},
        walls::{self, DepthBuffer, WallCache},
    },
    fixed::{FRAC_BITS, ONE},
    renderer::{DrawCall, Renderer, RendererExt, Rgba},
    sim::{Position, Size, TicRunner},
    world::{
        camera::Camera,
        grid::{Grid, TileMap},
        texture::TextureBank,
    },
};

/// Counters of the last built frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub wall_columns: usize,
    pub sprites: usize,
    pub cache_hits: u32,
}

pub struct Engine<R: Renderer, G: Grid = TileMap> {
    pub renderer: R,
    pub map: G,
    pub camera: Camera,
    pub texture_bank: TextureBank,
    pub screen: Screen,
    depth: DepthBuffer,
    wall_cache: WallCache,
    transforms: HashMap<Entity, SpriteTransform>,
    on_direction: Option<DirectionHandler>,
    calls: Vec<DrawCall>,
    stats: FrameStats,
}

impl<R: Renderer, G: Grid> Engine<R, G> {
    pub fn new(renderer: R, map: G, camera: Camera, texture_bank: TextureBank, screen: Screen) -> Self {
        Self {
            renderer,
            map,
            camera,
            texture_bank,
            screen,
            depth: DepthBuffer::new(screen.w),
            wall_cache: WallCache::default(),
            transforms: HashMap::new(),
            on_direction: None,
            calls: Vec::with_capacity(screen.w + 32),
            stats: FrameStats::default(),
        }
    }

    /// Build the draw list for the current simulation state and hand it to
    /// the renderer; `submit` receives the finished frame.
    pub fn render_frame(&mut self, sim: &TicRunner, submit: impl FnOnce(&[Rgba], usize, usize)) {
        self.build_frame(sim);
        self.renderer.draw_frame(
            self.screen.w,
            self.screen.h,
            &self.calls,
            &self.texture_bank,
            submit,
        );
    }

    /// Walls left to right, then sprites far to near.
    pub fn build_frame(&mut self, sim: &TicRunner) -> &[DrawCall] {
        self.calls.clear();
        let Some(view) = self.viewer(sim) else {
            log::warn!("viewer {:?} has no position, frame skipped", sim.viewer());
            return &self.calls;
        };

        let wall_columns = walls::cast_walls(
            &self.map,
            &self.camera,
            &self.screen,
            &view,
            &self.texture_bank,
            &mut self.depth,
            &mut self.wall_cache,
            &mut self.calls,
        );

        let scene = SpriteScene {
            world: sim.world(),
            motion: sim.motion(),
            tracked: sim.tracked(),
            cam: &self.camera,
            screen: &self.screen,
            view: &view,
            bank: &self.texture_bank,
            depth: &self.depth,
            tile: self.map.tile_size(),
            now_ms: sim.clock_ms(),
        };
        let sprites = sprites::project_sprites(
            &scene,
            &mut self.transforms,
            self.on_direction.as_mut(),
            &mut self.calls,
        );

        self.stats = FrameStats {
            wall_columns,
            sprites,
            cache_hits: self.wall_cache.hits(),
        };
        log::trace!("frame: {:?}", self.stats);
        &self.calls
    }

    /// Per-frame viewer constants: cell-space position and eye height
    /// (top of the viewer minus two pixels).
    pub fn viewer(&self, sim: &TicRunner) -> Option<Viewer> {
        let e = sim.viewer();
        let world = sim.world();
        let pos = world.get::<&Position>(e).ok()?.0;
        let h = world.get::<&Size>(e).map_or(0, |s| s.h);
        let tile = self.map.tile_size();
        debug_assert_eq!(tile, sim.tile_size(), "map and simulation disagree on tile size");
        Some(Viewer {
            entity: e,
            pos: pos / tile,
            view_z: sim.motion().z_fixed(e) + (h << FRAC_BITS) - 2 * ONE,
        })
    }

    /*──────────────────────────── accessors ───────────────────────────*/

    /// Subscribe to the per-sprite heading computed while drawing.
    pub fn on_sprite_direction(&mut self, handler: impl FnMut(Entity, f32) + 'static) {
        self.on_direction = Some(Box::new(handler));
    }

    /// Toggle the wall geometry memo. Output is identical either way.
    pub fn set_wall_cache(&mut self, on: bool) {
        self.wall_cache.set_enabled(on);
    }

    #[inline]
    pub fn depth(&self) -> &DepthBuffer {
        &self.depth
    }

    /// Camera-space transform of `e` from the last frame.
    pub fn transform(&self, e: Entity) -> Option<SpriteTransform> {
        self.transforms.get(&e).copied()
    }

    #[inline]
    pub fn draw_calls(&self) -> &[DrawCall] {
        &self.calls
    }

    #[inline]
    pub fn stats(&self) -> FrameStats {
        self.stats
    }
}
