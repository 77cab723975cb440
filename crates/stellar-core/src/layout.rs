//! GPU-facing record layouts.
//!
//! Field order, types and byte offsets here are the contract with the
//! shaders in the engine crate. Changing any of them means changing the WGSL too.

use bytemuck::{Pod, Zeroable};

/// Fixed binding slots shared by the producer and the rasterizer.
///
/// `Vertices` is a vertex-buffer slot; the rest are bind group 0 bindings.
#[repr(u32)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferIndex {
    Vertices = 0,
    Uniforms = 1,
    Viewport = 2,
    Instances = 3,
}

impl BufferIndex {
    #[inline]
    pub const fn slot(self) -> u32 {
        self as u32
    }
}

/// Background vertex (starfield point sprite).
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
    pub size: f32,
}

/// Per-entity instance record, tightly packed (76 bytes, 4-byte aligned).
///
/// Bound as a read-only storage buffer and unpacked in the shader by a
/// [`InstanceRecord::STRIDE_F32`]-word stride; `kind` is read back with `bitcast<i32>`.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct InstanceRecord {
    pub position: [f32; 2],
    pub velocity: [f32; 2],
    pub radius: f32,
    pub color: [f32; 4],
    pub glow_intensity: f32,
    pub seed: f32,
    pub crack_color: [f32; 4],
    pub crack_intensity: f32,
    pub rotation: f32,
    pub kind: i32,
    pub anim_time: f32,
}

impl InstanceRecord {
    pub const SIZE: usize = std::mem::size_of::<Self>();
    pub const STRIDE_F32: usize = Self::SIZE / 4;
}

/// Per-frame uniforms, padded to WGSL uniform-buffer rules (176 bytes).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub time: f32,
    pub _pad0: f32,
    pub screen_size: [f32; 2],
    pub flash_intensity: f32,
    pub _pad1: f32,
    pub black_hole_pos: [f32; 2],
    pub lensing_strength: f32,
    pub _pad2: [f32; 3],
}

impl FrameUniforms {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Identity transforms, zero time, no flash, no lensing.
    pub const NEUTRAL: Self = Self {
        projection: IDENTITY,
        view: IDENTITY,
        time: 0.0,
        _pad0: 0.0,
        screen_size: [0.0, 0.0],
        flash_intensity: 0.0,
        _pad1: 0.0,
        black_hole_pos: [0.0, 0.0],
        lensing_strength: 0.0,
        _pad2: [0.0; 3],
    };

    /// True if no field holds NaN or infinity.
    pub fn is_finite(&self) -> bool {
        bytemuck::cast_slice::<Self, f32>(std::slice::from_ref(self))
            .iter()
            .all(|v| v.is_finite())
    }
}

impl Default for FrameUniforms {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

const IDENTITY: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Viewport uniform at [`BufferIndex::Viewport`]; logical pixels.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct ViewportUniform {
    pub size: [f32; 2],
    pub _pad: [f32; 2],
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, offset_of, size_of};

    #[test]
    fn vertex_layout() {
        assert_eq!(size_of::<Vertex>(), 28);
        assert_eq!(offset_of!(Vertex, position), 0);
        assert_eq!(offset_of!(Vertex, color), 8);
        assert_eq!(offset_of!(Vertex, size), 24);
    }

    #[test]
    fn instance_layout() {
        assert_eq!(size_of::<InstanceRecord>(), 76);
        assert_eq!(align_of::<InstanceRecord>(), 4);
        assert_eq!(InstanceRecord::STRIDE_F32, 19);

        assert_eq!(offset_of!(InstanceRecord, position), 0);
        assert_eq!(offset_of!(InstanceRecord, velocity), 8);
        assert_eq!(offset_of!(InstanceRecord, radius), 16);
        assert_eq!(offset_of!(InstanceRecord, color), 20);
        assert_eq!(offset_of!(InstanceRecord, glow_intensity), 36);
        assert_eq!(offset_of!(InstanceRecord, seed), 40);
        assert_eq!(offset_of!(InstanceRecord, crack_color), 44);
        assert_eq!(offset_of!(InstanceRecord, crack_intensity), 60);
        assert_eq!(offset_of!(InstanceRecord, rotation), 64);
        assert_eq!(offset_of!(InstanceRecord, kind), 68);
        assert_eq!(offset_of!(InstanceRecord, anim_time), 72);
    }

    #[test]
    fn uniform_layout_matches_wgsl() {
        assert_eq!(size_of::<FrameUniforms>(), 176);
        assert_eq!(size_of::<FrameUniforms>() % 16, 0);
        assert_eq!(offset_of!(FrameUniforms, view), 64);
        assert_eq!(offset_of!(FrameUniforms, time), 128);
        assert_eq!(offset_of!(FrameUniforms, screen_size), 136);
        assert_eq!(offset_of!(FrameUniforms, flash_intensity), 144);
        assert_eq!(offset_of!(FrameUniforms, black_hole_pos), 152);
        assert_eq!(offset_of!(FrameUniforms, lensing_strength), 160);

        assert_eq!(size_of::<ViewportUniform>(), 16);
    }

    #[test]
    fn binding_indices_are_fixed() {
        assert_eq!(BufferIndex::Vertices.slot(), 0);
        assert_eq!(BufferIndex::Uniforms.slot(), 1);
        assert_eq!(BufferIndex::Viewport.slot(), 2);
        assert_eq!(BufferIndex::Instances.slot(), 3);
    }

    #[test]
    fn neutral_uniforms_are_finite() {
        assert!(FrameUniforms::NEUTRAL.is_finite());
        let mut u = FrameUniforms::NEUTRAL;
        u.time = f32::NAN;
        assert!(!u.is_finite());
    }
}
