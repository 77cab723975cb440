//! Frame uniform builder: camera, projection and the per-frame scalars.

use glam::{Mat4, Vec2, Vec3};

use crate::config::{CameraConfig, ProjectionMode, SimConfig};
use crate::entity::{EntityStore, VisualType};
use crate::error::{Result, SimError};
use crate::layout::FrameUniforms;

/// Drawable area in logical pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Positive, finite area.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    #[inline]
    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }

    #[inline]
    pub fn to_array(self) -> [f32; 2] {
        [self.width, self.height]
    }
}

/// 2D camera looking at the play plane.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec2,
    /// Screen pixels per world unit.
    pub zoom: f32,
}

impl Camera {
    pub const fn new(position: Vec2, zoom: f32) -> Self {
        Self { position, zoom }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

/// Dominant lensing body for the frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BlackHoleInfo {
    pub position: Vec2,
    pub strength: f32,
}

/// The largest live black hole, if any.
pub fn dominant_black_hole(store: &EntityStore, config: &SimConfig) -> Option<BlackHoleInfo> {
    store
        .iter_live()
        .filter(|e| e.visual_type() == VisualType::BlackHole)
        .max_by(|a, b| a.radius().total_cmp(&b.radius()))
        .map(|e| BlackHoleInfo {
            position: e.position,
            strength: config.lensing_for_radius(e.radius()),
        })
}

/// Projection for the given camera and viewport.
///
/// Fails with [`SimError::DegenerateGeometry`] instead of returning a matrix with NaN/Inf.
pub fn projection_for(mode: ProjectionMode, camera: &Camera, viewport: Viewport) -> Result<Mat4> {
    let degenerate = || SimError::DegenerateGeometry {
        width: viewport.width,
        height: viewport.height,
        zoom: camera.zoom,
    };

    if !viewport.is_valid() || !(camera.zoom.is_finite() && camera.zoom > 0.0) {
        return Err(degenerate());
    }

    let m = match mode {
        ProjectionMode::Orthographic => {
            let hw = viewport.width * 0.5 / camera.zoom;
            let hh = viewport.height * 0.5 / camera.zoom;
            Mat4::orthographic_rh(-hw, hw, -hh, hh, -1.0, 1.0)
        }
        ProjectionMode::Perspective { fov_y, near, far } => {
            let ok = fov_y > 0.0 && fov_y < std::f32::consts::PI && near > 0.0 && far > near;
            if !ok {
                return Err(degenerate());
            }
            Mat4::perspective_rh(fov_y, viewport.aspect(), near, far)
        }
    };

    if !m.is_finite() {
        return Err(degenerate());
    }
    Ok(m)
}

/// View matrix. Perspective cameras back off so the play plane shows
/// `viewport.height / zoom` world units vertically.
pub fn view_for(mode: ProjectionMode, camera: &Camera, viewport: Viewport) -> Mat4 {
    let p = camera.position;
    match mode {
        ProjectionMode::Orthographic => Mat4::from_translation(Vec3::new(-p.x, -p.y, 0.0)),
        ProjectionMode::Perspective { fov_y, .. } => {
            let half_h = viewport.height * 0.5 / camera.zoom;
            let dist = half_h / (fov_y * 0.5).tan();
            Mat4::look_at_rh(Vec3::new(p.x, p.y, dist), Vec3::new(p.x, p.y, 0.0), Vec3::Y)
        }
    }
}

#[derive(Debug)]
pub struct FrameUniformBuilder {
    config: CameraConfig,
    warned_degenerate: bool,
}

impl FrameUniformBuilder {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            warned_degenerate: false,
        }
    }

    #[inline]
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Builds a fully populated uniforms record.
    ///
    /// A degenerate viewport/zoom falls back to the configured viewport at
    /// zoom 1 (logged once per episode); the result is always finite.
    pub fn build(
        &mut self,
        camera: &Camera,
        viewport: Viewport,
        time: f32,
        flash: f32,
        black_hole: Option<BlackHoleInfo>,
    ) -> FrameUniforms {
        let mode = self.config.projection;

        let (camera, viewport, projection) = match projection_for(mode, camera, viewport) {
            Ok(m) => {
                self.warned_degenerate = false;
                (*camera, viewport, m)
            }
            Err(err) => {
                if !self.warned_degenerate {
                    self.warned_degenerate = true;
                    log::warn!("{err}; using fallback projection");
                }
                let cam = Camera::new(finite_or_zero(camera.position), 1.0);
                let vp = self.config.fallback_viewport;
                let m = projection_for(mode, &cam, vp)
                    .or_else(|_| projection_for(ProjectionMode::Orthographic, &cam, vp))
                    .unwrap_or(Mat4::IDENTITY);
                (cam, vp, m)
            }
        };

        let mut view = view_for(mode, &camera, viewport);
        if !view.is_finite() {
            view = Mat4::IDENTITY;
        }

        let (black_hole_pos, lensing_strength) = match black_hole {
            Some(h) if h.position.is_finite() && h.strength.is_finite() && h.strength > 0.0 => {
                (h.position.to_array(), h.strength)
            }
            _ => ([0.0, 0.0], 0.0),
        };

        FrameUniforms {
            projection: projection.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            time: if time.is_finite() { time } else { 0.0 },
            screen_size: viewport.to_array(),
            flash_intensity: if flash.is_finite() { flash.clamp(0.0, 1.0) } else { 0.0 },
            black_hole_pos,
            lensing_strength,
            ..FrameUniforms::NEUTRAL
        }
    }
}

impl Default for FrameUniformBuilder {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}

#[inline]
fn finite_or_zero(v: Vec2) -> Vec2 {
    if v.is_finite() { v } else { Vec2::ZERO }
}
