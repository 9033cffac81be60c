use glam::IVec2;

use crate::fixed::{Fixed, to_fixed};

/// Field of view at which a wall one cell away exactly fills the screen
/// height: `fov = w / h / 2`.
#[inline]
pub fn default_fov(w: usize, h: usize) -> f32 {
    w as f32 / h as f32 / 2.0
}

/// Viewer heading and projection plane.
///
/// * Only **yaw** is simulated – there is no pitch or roll.
/// * `dir` and `plane` are fixed-point and are rebuilt together whenever
///   the angle or the FoV changes, so a stale pair is never observable.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    angle: f32,        // radians, 0 = +X, grows toward +Y
    fov: f32,          // half-width of the projection plane
    wall_z_scale: f32, // cosmetic wall stretch, 1.0 = one cell tall
    screen_w: i32,

    dir: IVec2,   // (cos, sin) in Q8
    plane: IVec2, // (sin, -cos) * fov in Q8

    wall_height_in_view: i32,
    wall_width_in_view: i32,
}

impl Camera {
    /// Create a camera for a `screen_w` wide viewport, facing `angle`.
    pub fn new(angle: f32, fov: f32, screen_w: usize) -> Self {
        let mut cam = Self {
            angle,
            fov,
            wall_z_scale: 1.0,
            screen_w: screen_w as i32,
            dir: IVec2::ZERO,
            plane: IVec2::ZERO,
            wall_height_in_view: 0,
            wall_width_in_view: 0,
        };
        cam.set_fov(fov);
        cam
    }

    #[inline]
    pub fn view_angle(&self) -> f32 {
        self.angle
    }

    pub fn set_view_angle(&mut self, angle: f32) {
        self.angle = angle;
        self.set_vectors();
    }

    /// Rotate by `delta` radians (positive = toward +Y).
    pub fn turn(&mut self, delta: f32) {
        self.set_view_angle(self.angle + delta);
    }

    #[inline]
    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn set_fov(&mut self, fov: f32) {
        debug_assert!(fov > 0.0, "fov must be positive");
        self.fov = fov;
        // (w << 7) / fov from the real fov; rounding absorbs the f32 error
        // of ratios like 2/3
        let whiv = (f64::from(self.screen_w << 7) / f64::from(fov)).round();
        self.wall_height_in_view = whiv.min(f64::from(i32::MAX)) as i32;
        self.wall_width_in_view = self.wall_height_in_view >> 8;
        self.set_vectors();
    }

    #[inline]
    pub fn wall_z_scale(&self) -> f32 {
        self.wall_z_scale
    }

    pub fn set_wall_z_scale(&mut self, v: f32) {
        self.wall_z_scale = v;
    }

    /*──────────────────────── derived vectors ───────────────────────*/

    /// Q8 unit vector along the view direction.
    #[inline(always)]
    pub fn dir(&self) -> IVec2 {
        self.dir
    }

    /// Q8 projection-plane vector, perpendicular to `dir`, length `fov`.
    #[inline(always)]
    pub fn plane(&self) -> IVec2 {
        self.plane
    }

    /// Projected height (in pixels × 256) of a one-cell wall at distance 1.0.
    #[inline]
    pub fn wall_height_in_view(&self) -> i32 {
        self.wall_height_in_view
    }

    /// Projected width in pixels of a one-cell object at distance 1.0.
    #[inline]
    pub fn wall_width_in_view(&self) -> i32 {
        self.wall_width_in_view
    }

    #[inline]
    pub fn wall_z_scale_fx(&self) -> Fixed {
        to_fixed(self.wall_z_scale)
    }

    /// Half-angle of the view cone plus a small tolerance so sprites whose
    /// centre is just outside still get drawn.
    #[inline]
    pub fn cull_half_angle(&self) -> f32 {
        self.fov.atan() + 0.1
    }

    fn set_vectors(&mut self) {
        let (sin, cos) = self.angle.sin_cos();
        self.dir = IVec2::new(to_fixed(cos), to_fixed(sin));
        self.plane = IVec2::new(to_fixed(sin * self.fov), to_fixed(cos * -self.fov));
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
