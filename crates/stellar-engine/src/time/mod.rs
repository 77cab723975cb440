//! Time subsystem.
//!
//! - `FrameClock`: one per render loop; `tick()` once per presented frame
//! - `FixedStep`: accumulator that turns variable frame time into fixed simulation ticks

mod fixed_step;
mod frame_clock;

pub use fixed_step::FixedStep;
pub use frame_clock::{FrameClock, FrameTime};
