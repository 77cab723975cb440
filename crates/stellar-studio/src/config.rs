use stellar_core::{CameraConfig, PackConfig, SimConfig};
use stellar_engine::render::StarfieldConfig;

/// Demo configuration. Plain data; edit fields directly.
#[derive(Debug, Clone)]
pub struct StudioConfig {
    /// Seed for the field spawner; the same seed replays the same field.
    pub seed: u64,

    /// Number of solid bodies the spawner keeps alive.
    pub population: usize,

    pub black_holes: usize,

    /// New bodies appear in a ring `[spawn_inner, spawn_outer]` around the focus.
    pub spawn_inner: f32,
    pub spawn_outer: f32,

    /// Run the simulation on its own thread (otherwise inside the render loop).
    pub threaded: bool,

    /// Simulation ticks per second.
    pub tick_rate: f32,

    /// Screen pixels per world unit.
    pub zoom: f32,

    pub sim: SimConfig,
    pub pack: PackConfig,
    pub camera: CameraConfig,
    pub starfield: StarfieldConfig,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            seed: 0xA57E_401D,
            population: 160,
            black_holes: 2,
            spawn_inner: 500.0,
            spawn_outer: 2600.0,
            threaded: true,
            tick_rate: 120.0,
            zoom: 0.35,
            sim: SimConfig::default(),
            pack: PackConfig::default(),
            camera: CameraConfig::default(),
            starfield: StarfieldConfig::default(),
        }
    }
}
