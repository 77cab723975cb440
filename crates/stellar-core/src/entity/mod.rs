//! Entity state.
//!
//! Responsibilities:
//! - own the authoritative per-entity simulation state
//! - hand out unique, generation-checked ids
//! - defer slot reclamation to the end of the frame so passes never see a
//!   slot change underneath them

mod id;
mod kind;
mod record;
mod store;

pub use id::EntityId;
pub use kind::VisualType;
pub use record::{Entity, EntityState, SpawnParams};
pub use store::EntityStore;

pub(crate) use store::raise_crack_of;
