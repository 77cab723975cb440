//! GPU rendering subsystem.
//!
//! Renderers consume the frames published by `stellar-core` and issue GPU
//! commands via wgpu. Each renderer owns its pipeline and static buffers; the
//! per-frame buffers (uniforms, viewport, instances) live in [`FrameBindings`]
//! and are shared by every pass of the frame.
//!
//! Convention:
//! - CPU data is in world units; the uniform projection/view map it to clip space.
//! - Binding slots follow `stellar_core::BufferIndex`.

mod bindings;
mod common;
mod ctx;
mod entities;
mod starfield;

pub use bindings::FrameBindings;
pub use ctx::{RenderCtx, RenderTarget};
pub use entities::EntityRenderer;
pub use starfield::{generate_starfield, StarfieldConfig, StarfieldRenderer};
