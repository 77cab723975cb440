use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use stellar_core::{FrameConsumer, Rgba};
use stellar_engine::core::{App, AppControl, FrameCtx};
use stellar_engine::render::{generate_starfield, EntityRenderer, FrameBindings, StarfieldRenderer};
use stellar_engine::time::FixedStep;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowId;

use crate::config::StudioConfig;
use crate::driver::{SharedView, SimDriver};

const CLEAR: Rgba = Rgba::rgb(0.004, 0.005, 0.016);

/// Inline simulation state when no worker thread is used.
struct Inline {
    driver: SimDriver,
    fixed: FixedStep,
}

pub struct StudioApp {
    consumer: FrameConsumer,
    shared: Arc<SharedView>,

    bindings: FrameBindings,
    entities: EntityRenderer,
    starfield: StarfieldRenderer,

    inline: Option<Inline>,
    worker: Option<JoinHandle<()>>,
}

impl StudioApp {
    pub fn new(config: StudioConfig) -> Result<Self> {
        let shared = Arc::new(SharedView::new(config.camera.fallback_viewport));
        let (driver, consumer) = SimDriver::new(&config, Arc::clone(&shared));
        log::debug!(
            "simulation ready: {} live entities, {:.0} Hz",
            driver.simulation().store().live_count(),
            driver.tick_rate()
        );

        let (inline, worker) = if config.threaded {
            let handle = thread::Builder::new()
                .name("stellar-sim".into())
                .spawn(move || driver.run())
                .context("failed to spawn simulation thread")?;
            (None, Some(handle))
        } else {
            let fixed = FixedStep::new(driver.tick_rate(), 8);
            (Some(Inline { driver, fixed }), None)
        };

        Ok(Self {
            consumer,
            shared,
            bindings: FrameBindings::new(),
            entities: EntityRenderer::new(),
            starfield: StarfieldRenderer::new(generate_starfield(&config.starfield)),
            inline,
            worker,
        })
    }

    fn stop_worker(&mut self) {
        self.shared.stop();
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::error!("simulation thread panicked");
            }
        }
    }
}

impl App for StudioApp {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => AppControl::Exit,
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                // The front frame was projected for the old size.
                self.consumer.invalidate();
                AppControl::Continue
            }
            _ => AppControl::Continue,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let viewport = ctx.window.viewport();
        if viewport.is_valid() {
            self.shared.set_viewport(viewport);
        }

        if let Some(inline) = self.inline.as_mut() {
            let due = inline.fixed.advance(ctx.time.dt);
            let step = inline.fixed.step();
            for _ in 0..due {
                inline.driver.step(step);
            }
            if due > 0 {
                inline.driver.publish();
            }
        }

        let Self {
            consumer,
            bindings,
            entities,
            starfield,
            ..
        } = self;

        ctx.render(CLEAR, |rctx, target| {
            let Some(frame) = consumer.latest() else { return };
            bindings.upload(rctx, &frame);
            drop(frame);

            starfield.render(rctx, target, bindings);
            entities.render(rctx, target, bindings);
        })
    }

    fn on_exit(&mut self) {
        self.stop_worker();
        log::info!("exiting after {} published frames", self.consumer.published());
    }
}

impl Drop for StudioApp {
    fn drop(&mut self) {
        self.stop_worker();
    }
}
