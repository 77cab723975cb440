//! Stellar core crate.
//!
//! Owns the simulation side of the frame pipeline:
//! entity state → physics step → visual derivation → instance packing →
//! frame uniforms → double-buffered hand-off to the rasterizer.
//!
//! Nothing in this crate touches the GPU. The types in [`layout`] are the
//! byte-level contract shared with the render side.

pub mod color;
pub mod config;
pub mod entity;
pub mod error;
pub mod frame;
pub mod grid;
pub mod layout;
pub mod pack;
pub mod physics;
pub mod simulation;
pub mod uniforms;
pub mod visual;

pub use color::Rgba;
pub use config::{CameraConfig, PackConfig, ProjectionMode, SimConfig};
pub use entity::{Entity, EntityId, EntityState, EntityStore, SpawnParams, VisualType};
pub use error::{Result, SimError};
pub use frame::{frame_exchange, FrameConsumer, FrameData, FrameProducer, FrameView};
pub use layout::{BufferIndex, FrameUniforms, InstanceRecord, Vertex, ViewportUniform};
pub use pack::{InstanceBuffer, InstancePacker, PackReport};
pub use physics::{PhysicsStepper, StepReport};
pub use simulation::{SimEvent, Simulation};
pub use uniforms::{dominant_black_hole, BlackHoleInfo, Camera, FrameUniformBuilder, Viewport};
pub use visual::{VisualAttributes, VisualDeriver, VisualParams};
