//! Simulation driver: fixed-rate ticking, event handling, frame publishing.
//!
//! Runs either inline (called from the render loop) or on its own thread
//! via [`SimDriver::run`]. Both paths go through `step` + `publish`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use anyhow::ensure;
use glam::Vec2;
use stellar_core::{
    frame_exchange, Camera, FrameConsumer, FrameProducer, SimEvent, Simulation, Viewport,
};
use stellar_engine::time::{FixedStep, FrameClock};

use crate::config::StudioConfig;
use crate::spawner::FieldSpawner;

/// Backlog cap for the fixed-step accumulator.
const MAX_STEPS_PER_FRAME: u32 = 8;

/// Camera follow rate toward the dominant black hole (1/s).
const CAMERA_FOLLOW: f32 = 0.6;

/// State shared between the render thread and the simulation thread.
#[derive(Debug)]
pub struct SharedView {
    viewport: Mutex<Viewport>,
    running: AtomicBool,
}

impl SharedView {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport: Mutex::new(viewport),
            running: AtomicBool::new(true),
        }
    }

    pub fn viewport(&self) -> Viewport {
        *self.viewport.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        *self.viewport.lock().unwrap_or_else(PoisonError::into_inner) = viewport;
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

pub struct SimDriver {
    sim: Simulation,
    spawner: FieldSpawner,
    producer: FrameProducer,
    shared: Arc<SharedView>,
    camera: Camera,
    tick_rate: f32,
    events: Vec<SimEvent>,
}

impl SimDriver {
    /// Builds a populated simulation and the consumer end of its frame exchange.
    pub fn new(config: &StudioConfig, shared: Arc<SharedView>) -> (Self, FrameConsumer) {
        let mut sim = Simulation::new(config.sim.clone(), config.pack.clone(), config.camera.clone());
        let mut spawner = FieldSpawner::new(config);
        spawner.populate(&mut sim);

        let (producer, consumer) = frame_exchange();
        let driver = Self {
            sim,
            spawner,
            producer,
            shared,
            camera: Camera::new(Vec2::ZERO, config.zoom),
            tick_rate: config.tick_rate,
            events: Vec::new(),
        };
        (driver, consumer)
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    pub fn tick_rate(&self) -> f32 {
        self.tick_rate
    }

    /// One simulation tick plus the host-side reactions to it.
    pub fn step(&mut self, dt: f32) {
        self.sim.tick(dt);

        self.events.clear();
        self.events.extend(self.sim.drain_events());
        for event in &self.events {
            self.spawner.on_event(&mut self.sim, event);
        }

        self.follow(dt);
        self.spawner.maintain(&mut self.sim, self.camera.position);
    }

    /// Packs the current state into the back buffer and flips it to the front.
    ///
    /// A failed build leaves the previous frame on display.
    pub fn publish(&mut self) {
        let viewport = self.shared.viewport();
        let sim = &mut self.sim;
        let camera = &self.camera;

        let result = self.producer.publish(|frame| {
            let report = sim.build_frame(camera, viewport, frame);
            if let Some(err) = report.overflow() {
                log::trace!("{err}");
            }
            ensure!(frame.uniforms.is_finite(), "non-finite frame uniforms");
            Ok(())
        });

        if let Err(err) = result {
            log::warn!("frame {} not published: {err:#}", self.producer.published() + 1);
        }
    }

    /// Thread body: ticks at the fixed rate until [`SharedView::stop`].
    pub fn run(mut self) {
        let mut clock = FrameClock::new();
        let mut fixed = FixedStep::new(self.tick_rate, MAX_STEPS_PER_FRAME);
        let step = fixed.step();

        log::info!("simulation thread started at {:.0} Hz", self.tick_rate);

        while self.shared.is_running() {
            let time = clock.tick();
            let due = fixed.advance(time.dt);
            for _ in 0..due {
                self.step(step);
            }
            if due > 0 {
                self.publish();
            }
            thread::sleep(fixed.step_duration().mul_f32(0.5));
        }

        log::info!(
            "simulation thread stopped after {} frames",
            self.producer.published()
        );
    }

    /// Eases the camera toward the dominant black hole and keeps the despawn
    /// area centered on it.
    fn follow(&mut self, dt: f32) {
        let target = stellar_core::dominant_black_hole(self.sim.store(), self.sim.config())
            .map(|h| h.position)
            .unwrap_or(self.camera.position);

        let t = (CAMERA_FOLLOW * dt).clamp(0.0, 1.0);
        self.camera.position = self.camera.position.lerp(target, t);
        self.sim.set_focus(self.camera.position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver() -> (SimDriver, FrameConsumer) {
        let config = StudioConfig {
            population: 24,
            ..StudioConfig::default()
        };
        SimDriver::new(&config, Arc::new(SharedView::new(Viewport::new(800.0, 600.0))))
    }

    #[test]
    fn publish_makes_frame_visible() {
        let (mut driver, consumer) = driver();
        assert!(consumer.latest().is_none());

        driver.step(1.0 / 120.0);
        driver.publish();

        let frame = consumer.latest().unwrap();
        assert_eq!(frame.frame_index, 1);
        assert!(!frame.instances.is_empty());
        assert_eq!(frame.uniforms.screen_size, [800.0, 600.0]);
    }

    #[test]
    fn stepping_keeps_population_alive() {
        let (mut driver, _consumer) = driver();
        for _ in 0..240 {
            driver.step(1.0 / 120.0);
        }
        assert!(driver.simulation().store().live_count() > 0);
        assert!(driver.simulation().time() > 1.9);
    }

    #[test]
    fn degenerate_viewport_still_publishes() {
        let (mut driver, consumer) = driver();
        driver.shared.set_viewport(Viewport::new(0.0, 0.0));
        driver.publish();

        let frame = consumer.latest().unwrap();
        assert!(frame.uniforms.is_finite());
    }

    #[test]
    fn thread_stops_on_request() {
        let (driver, consumer) = driver();
        let shared = Arc::clone(&driver.shared);
        let handle = thread::spawn(move || driver.run());

        thread::sleep(std::time::Duration::from_millis(100));
        shared.stop();
        handle.join().unwrap();
        assert!(consumer.published() > 0);
    }
}
