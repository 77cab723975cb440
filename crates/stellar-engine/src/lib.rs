//! Stellar engine crate.
//!
//! Platform + GPU runtime for the stellar pipeline: window loop, surface,
//! frame timing, and the renderers that draw what `stellar-core` publishes.

pub mod core;
pub mod device;
pub mod time;
pub mod window;

pub mod logging;
pub mod render;
