//! Error taxonomy of the simulation core.
//!
//! None of these are fatal: spawns are rejected locally, overflow is recovered
//! by truncation and degenerate geometry by a fallback projection.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// Spawn request rejected before it touched the store.
    #[error("invalid spawn parameters: {0}")]
    InvalidSpawnParameters(String),

    /// More live entities than instance slots; the packer truncated.
    #[error("instance capacity exceeded: {live} live entities, capacity {capacity}")]
    InstanceCapacityExceeded { live: usize, capacity: usize },

    /// Viewport or camera produced a zero-area / non-finite projection.
    #[error("degenerate geometry: viewport {width}x{height}, zoom {zoom}")]
    DegenerateGeometry { width: f32, height: f32, zoom: f32 },
}

pub type Result<T> = std::result::Result<T, SimError>;
