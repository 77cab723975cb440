/// Linear straight-alpha RGBA color.
///
/// This is the CPU-side representation; it is flattened to `[f32; 4]` when
/// written into [`crate::layout::InstanceRecord`].
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    #[inline]
    pub fn with_alpha(self, a: f32) -> Self {
        Self::new(self.r, self.g, self.b, a.clamp(0.0, 1.0))
    }

    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite() && self.a.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_alpha_clamps_and_keeps_rgb() {
        let c = Rgba::rgb(0.6, 0.2, 0.0).with_alpha(3.0);
        assert_eq!(c, Rgba::new(0.6, 0.2, 0.0, 1.0));
        assert_eq!(c.with_alpha(-1.0).a, 0.0);
    }

    #[test]
    fn non_finite_channels_are_detected() {
        assert!(Rgba::rgb(0.1, 0.2, 0.3).is_finite());
        assert!(!Rgba::new(0.0, f32::NAN, 0.0, 1.0).is_finite());
    }
}
