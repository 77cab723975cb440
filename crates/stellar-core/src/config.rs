//! Tunables for the simulation core.
//!
//! Defaults come from the game's tuning pass (stable orbits, no death spirals).
//! Keep these structures plain data; hosts override fields directly.

use crate::uniforms::Viewport;

/// Physics stepper parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Gravitational constant applied to black-hole attraction.
    ///
    /// Multiplied by each hole's lensing strength, so a strength-1 hole pulls
    /// with `gravity / (d² + softening²)`.
    pub gravity: f32,

    /// Softening length; keeps `1 / (d² + ε²)` finite as `d → 0`.
    pub softening: f32,

    /// Entities farther than this from a black hole feel no pull and grow no cracks.
    pub influence_radius: f32,

    /// Lensing strength contributed per world unit of black-hole radius.
    pub lensing_per_radius: f32,

    /// Upper bound for a single black hole's lensing strength.
    pub max_lensing: f32,

    /// Acceleration magnitude clamp (world units / s²).
    pub max_accel: f32,

    /// Speed clamp (world units / s).
    pub max_speed: f32,

    /// Entities farther than this from the stepper focus are destroyed.
    ///
    /// `None` disables the bounds check.
    pub despawn_distance: Option<f32>,

    /// Resolve overlaps between solid bodies.
    pub collisions: bool,

    /// Broad-phase cell size for collision queries.
    pub grid_cell_size: f32,

    /// Coefficient of restitution for body-body impacts.
    pub restitution: f32,

    /// Closing speed above which an impact breaks the lighter body instead of
    /// bouncing. `None` makes every impact a bounce.
    pub shatter_speed: Option<f32>,

    /// Seconds for a full-strength screen flash to fade out.
    pub flash_decay: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            gravity: 200_000.0,
            softening: 120.0,
            influence_radius: 1200.0,
            lensing_per_radius: 0.05,
            max_lensing: 4.0,
            max_accel: 4000.0,
            max_speed: 1200.0,
            despawn_distance: Some(3500.0),
            collisions: true,
            grid_cell_size: 180.0,
            restitution: 0.5,
            shatter_speed: Some(200.0),
            flash_decay: 0.5,
        }
    }
}

/// Instance packer parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PackConfig {
    /// Maximum number of instance records written per frame.
    pub capacity: usize,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self { capacity: 2048 }
    }
}

/// Projection family used by the frame uniform builder.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ProjectionMode {
    /// Screen-aligned ortho; half extents are `viewport / 2 / zoom`.
    Orthographic,

    /// Right-handed perspective looking down -Z at the play plane.
    Perspective {
        /// Vertical field of view in radians.
        fov_y: f32,
        near: f32,
        far: f32,
    },
}

impl Default for ProjectionMode {
    fn default() -> Self {
        Self::Orthographic
    }
}

/// Camera / projection parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    pub projection: ProjectionMode,

    /// Substituted when the live viewport is degenerate (e.g. minimized window).
    pub fallback_viewport: Viewport,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            projection: ProjectionMode::Orthographic,
            fallback_viewport: Viewport::new(1280.0, 720.0),
        }
    }
}

impl SimConfig {
    /// Lensing strength of a black hole with the given radius.
    #[inline]
    pub fn lensing_for_radius(&self, radius: f32) -> f32 {
        let s = radius * self.lensing_per_radius;
        if s.is_finite() { s.clamp(0.0, self.max_lensing) } else { 0.0 }
    }
}
