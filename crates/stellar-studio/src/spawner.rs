//! Procedural field spawner (the external spawn logic of the demo).
//!
//! Bodies appear in a ring around the focus with a mass roll deciding type
//! and size; consumption bursts into short-lived trails and jets.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stellar_core::{SimEvent, Simulation, SpawnParams, VisualType};

use crate::config::StudioConfig;

/// Spawn attempts per body before giving up on finding free space.
const PLACEMENT_TRIES: usize = 10;

/// Cap on bodies spawned by one `maintain` call.
const SPAWNS_PER_TICK: usize = 4;

/// Clearance kept around existing entities when placing a new one.
const MIN_GAP: f32 = 80.0;

/// Shattered bodies whose pieces would be smaller than this leave only dust.
const MIN_FRAGMENT_RADIUS: f32 = 3.0;

pub struct FieldSpawner {
    rng: StdRng,
    population: usize,
    black_holes: usize,
    inner: f32,
    outer: f32,
}

impl FieldSpawner {
    pub fn new(config: &StudioConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            population: config.population,
            black_holes: config.black_holes,
            inner: config.spawn_inner.max(0.0),
            outer: config.spawn_outer.max(config.spawn_inner + 1.0),
        }
    }

    /// Seeds the initial field: black holes first, then bodies up to the target population.
    pub fn populate(&mut self, sim: &mut Simulation) {
        for i in 0..self.black_holes {
            let angle = TAU * i as f32 / self.black_holes.max(1) as f32 + self.rng.random_range(0.0..0.6);
            let dist = self.rng.random_range(350.0..900.0);
            let position = Vec2::from_angle(angle) * dist;
            // Slow orbit around the origin.
            let velocity = position.perp().normalize_or_zero() * self.rng.random_range(10.0..35.0);
            let radius = self.rng.random_range(60.0..110.0);
            let seed = self.rng.random_range(0.0..1.0);

            if let Err(e) = sim.spawn(VisualType::BlackHole, position, velocity, radius, seed) {
                log::warn!("black hole spawn failed: {e}");
            }
        }

        let mut spawned = 0;
        while self.solid_count(sim) < self.population && spawned < self.population * 2 {
            self.spawn_body(sim, Vec2::ZERO);
            spawned += 1;
        }
        log::info!(
            "field populated: {} entities ({} black holes)",
            sim.store().live_count(),
            self.black_holes
        );
    }

    /// Tops the population back up around `focus`.
    pub fn maintain(&mut self, sim: &mut Simulation, focus: Vec2) {
        for _ in 0..SPAWNS_PER_TICK {
            if self.solid_count(sim) >= self.population {
                break;
            }
            self.spawn_body(sim, focus);
        }
    }

    /// Reacts to simulation events: bursts on consumption, fragments on shatter.
    pub fn on_event(&mut self, sim: &mut Simulation, event: &SimEvent) {
        match *event {
            SimEvent::Consumed {
                position,
                radius,
                visual_type,
                ..
            } => self.on_consumed(sim, position, radius, visual_type),
            SimEvent::Shattered {
                visual_type,
                position,
                velocity,
                radius,
                impact,
                ..
            } => self.on_shattered(sim, visual_type, position, velocity, radius, impact),
            _ => {}
        }
    }

    fn on_consumed(
        &mut self,
        sim: &mut Simulation,
        position: Vec2,
        radius: f32,
        visual_type: VisualType,
    ) {
        let burst = self.rng.random_range(6..12);
        self.emit_trails(sim, position, radius, burst);

        // Big meals fire polar jets and flash the screen.
        if radius > 40.0 || visual_type == VisualType::Star {
            let axis = Vec2::from_angle(self.rng.random_range(0.0..TAU));
            for dir in [axis, -axis] {
                let params = SpawnParams::new(
                    VisualType::Jet,
                    position,
                    dir * 600.0,
                    (radius * 0.15).clamp(4.0, 20.0),
                    self.rng.random_range(0.0..1.0),
                )
                .with_lifetime(1.5);
                spawn_effect(sim, params);
            }
            sim.trigger_flash((radius / 200.0).clamp(0.2, 0.8));
        }
    }

    /// Splits a broken body into 2 to 4 pieces of the same type flying outward.
    fn on_shattered(
        &mut self,
        sim: &mut Simulation,
        visual_type: VisualType,
        position: Vec2,
        velocity: Vec2,
        radius: f32,
        impact: Vec2,
    ) {
        let pieces = self.rng.random_range(2..=4u32);
        // Area is split evenly between the pieces.
        let piece_radius = radius / (pieces as f32).sqrt();

        if piece_radius >= MIN_FRAGMENT_RADIUS {
            for _ in 0..pieces {
                let dir = Vec2::from_angle(self.rng.random_range(0.0..TAU));
                let speed = self.rng.random_range(50.0..200.0);
                let params = SpawnParams::new(
                    visual_type,
                    position + dir * radius * 0.5,
                    velocity + impact * 0.3 + dir * speed,
                    piece_radius,
                    self.rng.random_range(0.0..1.0),
                )
                .with_spin(self.rng.random_range(0.0..TAU), self.rng.random_range(-5.0..5.0));
                spawn_effect(sim, params);
            }
        }

        self.emit_trails(sim, position, radius, 3);
    }

    fn emit_trails(&mut self, sim: &mut Simulation, position: Vec2, radius: f32, count: u32) {
        for _ in 0..count {
            let dir = Vec2::from_angle(self.rng.random_range(0.0..TAU));
            let speed = self.rng.random_range(60.0..220.0);
            let params = SpawnParams::new(
                VisualType::Trail,
                position + dir * radius * 0.5,
                dir * speed,
                self.rng.random_range(2.0..5.0),
                self.rng.random_range(0.0..1.0),
            )
            .with_lifetime(self.rng.random_range(0.6..1.2));
            spawn_effect(sim, params);
        }
    }

    fn solid_count(&self, sim: &Simulation) -> usize {
        sim.store()
            .iter_live()
            .filter(|e| e.visual_type().is_solid())
            .count()
    }

    fn spawn_body(&mut self, sim: &mut Simulation, center: Vec2) {
        let Some(position) = self.free_position(sim, center) else {
            return;
        };

        let rogue = self.rng.random_range(0.0..1.0) < 0.03;
        let roll = self.rng.random_range(0.0..100.0);

        let (mass, dense): (f32, bool) = if rogue {
            (self.rng.random_range(400.0..1500.0), false)
        } else if roll < 70.0 {
            (self.rng.random_range(1.0..5.0), true)
        } else if roll < 90.0 {
            (self.rng.random_range(12.0..35.0), false)
        } else if roll < 98.0 {
            (self.rng.random_range(40.0..120.0), false)
        } else {
            (self.rng.random_range(300.0..800.0), false)
        };

        let visual_type = if mass > 800.0 {
            VisualType::Star
        } else if mass > 300.0 {
            VisualType::Gas
        } else if mass > 100.0 {
            VisualType::Ice
        } else if self.rng.random_range(0.0..1.0) < 0.005 {
            VisualType::Neutron
        } else if self.rng.random_range(0.0..1.0) > 0.7 {
            VisualType::Lava
        } else {
            VisualType::Rock
        };

        let velocity = if rogue {
            (center - position).normalize_or_zero() * self.rng.random_range(80.0..150.0)
        } else {
            let speed = self.rng.random_range(10.0..50.0) / mass.sqrt() * 5.0;
            Vec2::from_angle(self.rng.random_range(0.0..TAU)) * speed
        };

        let params = SpawnParams::new(
            visual_type,
            position,
            velocity,
            radius_for_mass(mass, dense),
            self.rng.random_range(0.0..1.0),
        )
        .with_spin(self.rng.random_range(0.0..TAU), self.rng.random_range(-2.0..2.0));

        if let Err(e) = sim.spawn_with(params) {
            log::debug!("body spawn skipped: {e}");
        }
    }

    /// Random ring position that does not crowd existing entities.
    fn free_position(&mut self, sim: &Simulation, center: Vec2) -> Option<Vec2> {
        for _ in 0..PLACEMENT_TRIES {
            let angle = self.rng.random_range(0.0..TAU);
            let dist = self.rng.random_range(self.inner..self.outer);
            let p = center + Vec2::from_angle(angle) * dist;

            let crowded = sim
                .store()
                .iter_live()
                .any(|e| e.position.distance(p) < e.radius() * 2.0 + MIN_GAP);
            if !crowded {
                return Some(p);
            }
        }
        None
    }
}

fn spawn_effect(sim: &mut Simulation, params: SpawnParams) {
    if let Err(e) = sim.spawn_with(params) {
        log::debug!("effect spawn skipped: {e}");
    }
}

/// Radius from mass: dense rocky bodies grow slowly, giants are fluffy.
pub fn radius_for_mass(mass: f32, dense: bool) -> f32 {
    let m = mass.max(0.001);
    if dense {
        9.0 * m.powf(0.38)
    } else if m > 250.0 {
        6.0 * m.powf(0.55)
    } else {
        9.0 * m.powf(0.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StudioConfig {
        StudioConfig {
            population: 40,
            ..StudioConfig::default()
        }
    }

    #[test]
    fn radius_grows_with_mass() {
        assert!(radius_for_mass(5.0, true) > radius_for_mass(1.0, true));
        assert!(radius_for_mass(1000.0, false) > radius_for_mass(200.0, false));
        assert!(radius_for_mass(0.0, true) > 0.0);
    }

    #[test]
    fn populate_spawns_black_holes_and_bodies() {
        let cfg = config();
        let mut sim = Simulation::default();
        FieldSpawner::new(&cfg).populate(&mut sim);

        let holes = sim
            .store()
            .iter_live()
            .filter(|e| e.visual_type() == VisualType::BlackHole)
            .count();
        assert_eq!(holes, cfg.black_holes);
        assert!(sim.store().live_count() > cfg.black_holes);
    }

    #[test]
    fn same_seed_same_field() {
        let cfg = config();
        let (mut a, mut b) = (Simulation::default(), Simulation::default());
        FieldSpawner::new(&cfg).populate(&mut a);
        FieldSpawner::new(&cfg).populate(&mut b);

        let pa: Vec<Vec2> = a.store().iter_live().map(|e| e.position).collect();
        let pb: Vec<Vec2> = b.store().iter_live().map(|e| e.position).collect();
        assert_eq!(pa, pb);
    }

    #[test]
    fn consumption_bursts_into_trails() {
        let mut sim = Simulation::default();
        let mut spawner = FieldSpawner::new(&config());
        let event = SimEvent::Consumed {
            id: sim.spawn(VisualType::Rock, Vec2::ZERO, Vec2::ZERO, 5.0, 0.5).unwrap(),
            by: sim.spawn(VisualType::BlackHole, Vec2::ZERO, Vec2::ZERO, 50.0, 0.5).unwrap(),
            visual_type: VisualType::Rock,
            position: Vec2::new(10.0, 0.0),
            radius: 5.0,
        };

        spawner.on_event(&mut sim, &event);
        let trails: Vec<_> = sim
            .store()
            .iter_live()
            .filter(|e| e.visual_type() == VisualType::Trail)
            .collect();
        assert!(trails.len() >= 6);
        assert!(trails.iter().all(|e| e.lifetime().is_some()));
        assert_eq!(sim.flash(), 0.0);
    }

    fn shattered(sim: &mut Simulation, visual_type: VisualType, radius: f32) -> SimEvent {
        SimEvent::Shattered {
            id: sim.spawn(visual_type, Vec2::ZERO, Vec2::ZERO, radius, 0.5).unwrap(),
            by: sim.spawn(VisualType::Rock, Vec2::new(50.0, 0.0), Vec2::ZERO, 30.0, 0.5).unwrap(),
            visual_type,
            position: Vec2::new(400.0, 0.0),
            velocity: Vec2::new(10.0, 0.0),
            radius,
            impact: Vec2::new(-150.0, 0.0),
        }
    }

    #[test]
    fn shatter_scatters_smaller_pieces_of_the_same_type() {
        let mut sim = Simulation::default();
        let mut spawner = FieldSpawner::new(&config());
        let event = shattered(&mut sim, VisualType::Ice, 16.0);

        spawner.on_event(&mut sim, &event);
        let pieces: Vec<_> = sim
            .store()
            .iter_live()
            .filter(|e| e.visual_type() == VisualType::Ice && e.position != Vec2::ZERO)
            .collect();
        assert!((2..=4).contains(&pieces.len()));
        assert!(pieces.iter().all(|e| e.radius() < 16.0 && e.lifetime().is_none()));
        assert!(pieces.iter().all(|e| e.position.distance(Vec2::new(400.0, 0.0)) <= 8.0 + 1e-3));
    }

    #[test]
    fn tiny_shatter_leaves_only_dust() {
        let mut sim = Simulation::default();
        let mut spawner = FieldSpawner::new(&config());
        let event = shattered(&mut sim, VisualType::Rock, 4.0);
        let before = sim.store().live_count();

        spawner.on_event(&mut sim, &event);
        let added: Vec<_> = sim.store().iter_live().skip(before).collect();
        assert_eq!(added.len(), 3);
        assert!(added.iter().all(|e| e.visual_type() == VisualType::Trail));
    }
}
