//! Simulation façade.
//!
//! Owns the store and every stage of the frame pipeline. The host drives it
//! with [`Simulation::tick`] and [`Simulation::build_frame`], usually from a
//! dedicated simulation thread that publishes into a
//! [`frame_exchange`](crate::frame::frame_exchange).

use glam::Vec2;

use crate::config::{CameraConfig, PackConfig, SimConfig};
use crate::entity::{EntityId, EntityStore, SpawnParams, VisualType};
use crate::error::Result;
use crate::frame::FrameData;
use crate::pack::{InstancePacker, PackReport};
use crate::physics::{PhysicsStepper, StepReport};
use crate::uniforms::{dominant_black_hole, Camera, FrameUniformBuilder, Viewport};
use crate::visual::VisualDeriver;

/// Something the host may want to react to (sounds, particles, score).
///
/// Events carry everything needed to react: the entity ids go stale after
/// the next [`Simulation::build_frame`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SimEvent {
    Consumed {
        id: EntityId,
        by: EntityId,
        visual_type: VisualType,
        position: Vec2,
        radius: f32,
    },
    Expired {
        id: EntityId,
    },
    OutOfBounds {
        id: EntityId,
    },
    Collided {
        a: EntityId,
        b: EntityId,
        position: Vec2,
    },
    /// A hard impact broke `id`; its state is captured so the host can
    /// scatter fragments.
    Shattered {
        id: EntityId,
        by: EntityId,
        visual_type: VisualType,
        position: Vec2,
        velocity: Vec2,
        radius: f32,
        /// Half the velocity of the body that hit it.
        impact: Vec2,
    },
}

#[derive(Debug)]
pub struct Simulation {
    store: EntityStore,
    stepper: PhysicsStepper,
    deriver: VisualDeriver,
    packer: InstancePacker,
    uniforms: FrameUniformBuilder,

    time: f64,
    flash: f32,
    events: Vec<SimEvent>,
}

impl Simulation {
    pub fn new(sim: SimConfig, pack: PackConfig, camera: CameraConfig) -> Self {
        log::debug!(
            "simulation: capacity={} gravity={} collisions={}",
            pack.capacity,
            sim.gravity,
            sim.collisions
        );
        Self {
            store: EntityStore::new(),
            stepper: PhysicsStepper::new(sim),
            deriver: VisualDeriver::new(),
            packer: InstancePacker::new(pack),
            uniforms: FrameUniformBuilder::new(camera),
            time: 0.0,
            flash: 0.0,
            events: Vec::new(),
        }
    }

    // ── accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    #[inline]
    pub fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    #[inline]
    pub fn config(&self) -> &SimConfig {
        self.stepper.config()
    }

    #[inline]
    pub fn deriver(&self) -> &VisualDeriver {
        &self.deriver
    }

    /// Seconds of simulated time (sum of accepted `dt`s).
    #[inline]
    pub fn time(&self) -> f32 {
        self.time as f32
    }

    #[inline]
    pub fn flash(&self) -> f32 {
        self.flash
    }

    /// Centers the despawn area on `focus` (usually the camera target).
    #[inline]
    pub fn set_focus(&mut self, focus: Vec2) {
        self.stepper.set_focus(focus);
    }

    // ── spawning ──────────────────────────────────────────────────────────

    pub fn spawn(
        &mut self,
        visual_type: VisualType,
        position: Vec2,
        velocity: Vec2,
        radius: f32,
        seed: f32,
    ) -> Result<EntityId> {
        self.store.spawn(visual_type, position, velocity, radius, seed)
    }

    pub fn spawn_with(&mut self, params: SpawnParams) -> Result<EntityId> {
        self.store.spawn_with(params)
    }

    // ── frame cadence ─────────────────────────────────────────────────────

    /// Starts a screen flash. Weaker flashes never cut a stronger one short.
    pub fn trigger_flash(&mut self, intensity: f32) {
        if intensity.is_finite() {
            self.flash = self.flash.max(intensity.clamp(0.0, 1.0));
        }
    }

    /// Advances the simulation by `dt` seconds. `dt <= 0` does nothing.
    pub fn tick(&mut self, dt: f32) -> StepReport {
        if !(dt.is_finite() && dt > 0.0) {
            return StepReport::default();
        }

        let report = self.stepper.step(&mut self.store, dt);
        self.time += f64::from(dt);

        let decay = self.stepper.config().flash_decay;
        self.flash = if decay > 0.0 {
            (self.flash - dt / decay).max(0.0)
        } else {
            0.0
        };

        self.record_events(&report);
        report
    }

    fn record_events(&mut self, report: &StepReport) {
        for &(id, by) in &report.consumed {
            if let Some(e) = self.store.get(id) {
                self.events.push(SimEvent::Consumed {
                    id,
                    by,
                    visual_type: e.visual_type(),
                    position: e.position,
                    radius: e.radius(),
                });
            }
        }
        self.events
            .extend(report.expired.iter().map(|&id| SimEvent::Expired { id }));
        self.events
            .extend(report.out_of_bounds.iter().map(|&id| SimEvent::OutOfBounds { id }));
        for &(a, b) in &report.collisions {
            let position = match (self.store.get(a), self.store.get(b)) {
                (Some(ea), Some(eb)) => (ea.position + eb.position) * 0.5,
                _ => continue,
            };
            self.events.push(SimEvent::Collided { a, b, position });
        }
        for &(id, by) in &report.shattered {
            let (Some(e), Some(hit)) = (self.store.get(id), self.store.get(by)) else {
                continue;
            };
            self.events.push(SimEvent::Shattered {
                id,
                by,
                visual_type: e.visual_type(),
                position: e.position,
                velocity: e.velocity,
                radius: e.radius(),
                impact: hit.velocity * 0.5,
            });
        }
    }

    /// Takes every event recorded since the last drain.
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, SimEvent> {
        self.events.drain(..)
    }

    /// Fills `frame` with the current instances and uniforms, then closes the
    /// store frame (retired slots are reclaimed).
    pub fn build_frame(&mut self, camera: &Camera, viewport: Viewport, frame: &mut FrameData) -> PackReport {
        let hole = dominant_black_hole(&self.store, self.stepper.config());

        let report = self
            .packer
            .pack(&self.store, &self.deriver, self.time, &mut frame.instances);
        frame.uniforms = self.uniforms.build(camera, viewport, self.time(), self.flash, hole);

        self.store.end_frame();
        report
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(SimConfig::default(), PackConfig::default(), CameraConfig::default())
    }
}
