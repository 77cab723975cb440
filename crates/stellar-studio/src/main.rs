mod app;
mod config;
mod driver;
mod spawner;

use anyhow::Result;
use stellar_engine::device::GpuInit;
use stellar_engine::logging::{init_logging, LoggingConfig};
use stellar_engine::window::{Runtime, RuntimeConfig};

use crate::app::StudioApp;
use crate::config::StudioConfig;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    println!();
    println!("  stellar studio");
    println!("  instanced entity field  ·  wgpu  ·  esc to quit");
    println!();

    let config = StudioConfig::default();
    log::info!(
        "seed {:#x}, population {}, {} black holes, {} sim thread",
        config.seed,
        config.population,
        config.black_holes,
        if config.threaded { "dedicated" } else { "inline" }
    );

    let app = StudioApp::new(config)?;
    Runtime::run(
        RuntimeConfig {
            title: "Stellar".to_string(),
            ..RuntimeConfig::default()
        },
        GpuInit::default(),
        app,
    )
}
