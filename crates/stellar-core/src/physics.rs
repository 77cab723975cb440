//! Physics stepper.
//!
//! Per step, in order:
//! 1. integrate every live entity (black-hole pull, clamps, rotation, age)
//! 2. consume bodies that fell inside a black hole's radius; raise cracks near one
//! 3. expire timed entities and drop bodies outside the play area
//! 4. resolve overlaps between solid bodies (optional); hard impacts shatter
//!    the lighter body
//!
//! The stepper only reads and writes simulation fields; GPU-facing values are
//! derived later from the resulting state.

use glam::Vec2;

use crate::config::SimConfig;
use crate::entity::{raise_crack_of, Entity, EntityId, EntityState, EntityStore, VisualType};
use crate::grid::SpatialGrid;

/// Outcome of a single [`PhysicsStepper::step`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// Entities swallowed by a black hole, with the hole that took them.
    pub consumed: Vec<(EntityId, EntityId)>,
    /// Entities whose lifetime ran out.
    pub expired: Vec<EntityId>,
    /// Entities that left the play area.
    pub out_of_bounds: Vec<EntityId>,
    /// Body pairs whose overlap was resolved by a bounce.
    pub collisions: Vec<(EntityId, EntityId)>,
    /// Bodies broken by a hard impact, with the body that hit them.
    pub shattered: Vec<(EntityId, EntityId)>,
}

impl StepReport {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty()
            && self.expired.is_empty()
            && self.out_of_bounds.is_empty()
            && self.collisions.is_empty()
            && self.shattered.is_empty()
    }

    /// Total number of entities that stopped being live during the step.
    #[inline]
    pub fn retired(&self) -> usize {
        self.consumed.len() + self.expired.len() + self.out_of_bounds.len() + self.shattered.len()
    }
}

/// Bodies wider than this many grid cells skip the grid and are tested
/// against every solid body directly.
const OVERSIZED_CELLS: f32 = 2.0;

/// Snapshot of a black hole taken at the start of a step.
#[derive(Debug, Copy, Clone)]
struct Hole {
    index: u32,
    id: EntityId,
    position: Vec2,
    radius: f32,
    strength: f32,
}

/// Advances an [`EntityStore`] by variable timesteps.
#[derive(Debug)]
pub struct PhysicsStepper {
    config: SimConfig,
    focus: Vec2,
    grid: SpatialGrid,

    // Scratch buffers reused across steps.
    live: Vec<u32>,
    holes: Vec<Hole>,
    solids: Vec<u32>,
    oversized: Vec<u32>,
    candidates: Vec<u32>,
}

impl PhysicsStepper {
    pub fn new(config: SimConfig) -> Self {
        let grid = SpatialGrid::new(config.grid_cell_size);
        Self {
            config,
            focus: Vec2::ZERO,
            grid,
            live: Vec::new(),
            holes: Vec::new(),
            solids: Vec::new(),
            oversized: Vec::new(),
            candidates: Vec::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Replaces the configuration. The broad-phase grid is rebuilt if the cell size changed.
    pub fn set_config(&mut self, config: SimConfig) {
        if config.grid_cell_size != self.config.grid_cell_size {
            self.grid = SpatialGrid::new(config.grid_cell_size);
        }
        self.config = config;
    }

    /// Center of the play area used by the despawn check.
    #[inline]
    pub fn focus(&self) -> Vec2 {
        self.focus
    }

    #[inline]
    pub fn set_focus(&mut self, focus: Vec2) {
        if focus.is_finite() {
            self.focus = focus;
        }
    }

    /// Acceleration felt at `position` from every hole except `skip`.
    fn hole_acceleration(&self, position: Vec2, skip: u32) -> Vec2 {
        let soft2 = self.config.softening * self.config.softening;
        let mut accel = Vec2::ZERO;

        for hole in &self.holes {
            if hole.index == skip {
                continue;
            }
            let d = hole.position - position;
            let dist = d.length();
            if dist <= f32::EPSILON || dist > self.config.influence_radius {
                continue;
            }
            let mag = self.config.gravity * hole.strength / (dist * dist + soft2);
            accel += d / dist * mag;
        }

        // Capped inverse-square: clamp the summed magnitude.
        accel.clamp_length_max(self.config.max_accel)
    }

    /// Advances the store by `dt` seconds.
    ///
    /// `dt <= 0` (or non-finite) is a no-op and returns an empty report.
    pub fn step(&mut self, store: &mut EntityStore, dt: f32) -> StepReport {
        let mut report = StepReport::default();
        if !(dt.is_finite() && dt > 0.0) {
            return report;
        }

        store.live_indices(&mut self.live);

        self.holes.clear();
        for &index in &self.live {
            let Some(e) = store.at(index) else { continue };
            if e.visual_type == VisualType::BlackHole {
                self.holes.push(Hole {
                    index,
                    id: e.id,
                    position: e.position,
                    radius: e.radius,
                    strength: self.config.lensing_for_radius(e.radius),
                });
            }
        }

        // 1) integrate
        for i in 0..self.live.len() {
            let index = self.live[i];
            let Some(position) = store.at(index).map(|e| e.position) else { continue };
            let accel = self.hole_acceleration(position, index);

            let Some(e) = store.at_mut(index) else { continue };
            e.velocity += accel * dt;
            e.velocity = e.velocity.clamp_length_max(self.config.max_speed);
            e.position += e.velocity * dt;
            e.advance_rotation(dt);
            e.age += dt;
        }

        // Holes moved too; consumption uses post-step positions.
        for hole in &mut self.holes {
            if let Some(e) = store.at(hole.index) {
                hole.position = e.position;
            }
        }

        // 2) consumption + proximity cracks
        self.consume(store, &mut report);

        // 3) expiry + bounds
        for &index in &self.live {
            let Some(e) = store.at(index) else { continue };
            if !e.is_live() {
                continue;
            }
            let id = e.id;

            if e.lifetime.is_some_and(|l| e.age >= l) {
                store.retire(id, EntityState::Destroyed);
                report.expired.push(id);
                continue;
            }

            if let Some(max) = self.config.despawn_distance {
                if e.position.distance(self.focus) > max {
                    store.retire(id, EntityState::Destroyed);
                    report.out_of_bounds.push(id);
                }
            }
        }

        // 4) body-body overlap
        if self.config.collisions {
            self.resolve_collisions(store, &mut report);
        }

        if !report.is_empty() {
            log::trace!(
                "step dt={dt:.4}: consumed={} expired={} out_of_bounds={} collisions={} shattered={}",
                report.consumed.len(),
                report.expired.len(),
                report.out_of_bounds.len(),
                report.collisions.len(),
                report.shattered.len(),
            );
        }

        report
    }

    fn consume(&self, store: &mut EntityStore, report: &mut StepReport) {
        if self.holes.is_empty() {
            return;
        }

        for &index in &self.live {
            let Some(e) = store.at_mut(index) else { continue };
            if !e.is_live() || e.visual_type == VisualType::BlackHole {
                continue;
            }

            let mut swallowed_by = None;
            let mut proximity = 0.0f32;

            for hole in &self.holes {
                let dist = e.position.distance(hole.position);
                if dist < hole.radius {
                    swallowed_by = Some(hole.id);
                    break;
                }
                let band = (self.config.influence_radius - hole.radius).max(1.0);
                let p = 1.0 - ((dist - hole.radius) / band).clamp(0.0, 1.0);
                proximity = proximity.max(p);
            }

            match swallowed_by {
                Some(hole_id) => {
                    let id = e.id;
                    store.retire(id, EntityState::Consumed);
                    report.consumed.push((id, hole_id));
                }
                None if proximity > 0.0 => raise_crack_of(e, proximity),
                None => {}
            }
        }
    }

    fn resolve_collisions(&mut self, store: &mut EntityStore, report: &mut StepReport) {
        self.grid.clear();
        self.solids.clear();
        self.oversized.clear();
        let max_indexed = self.grid.cell_size() * OVERSIZED_CELLS;

        for &index in &self.live {
            let Some(e) = store.at(index) else { continue };
            if !e.is_live() || !e.visual_type.is_solid() {
                continue;
            }
            self.solids.push(index);
            if e.radius > max_indexed {
                self.oversized.push(index);
            } else {
                self.grid.insert_circle(index, e.position, e.radius);
            }
        }

        let restitution = self.config.restitution.clamp(0.0, 1.0);
        let shatter_speed = self.config.shatter_speed.filter(|s| s.is_finite() && *s >= 0.0);

        // Grid bodies against grid bodies.
        for &a in &self.solids {
            let Some(ea) = store.at(a) else { continue };
            if !ea.is_live() || ea.radius > max_indexed {
                continue;
            }

            self.candidates.clear();
            self.grid.query(ea.position, ea.radius, &mut self.candidates);
            // A body spanning several cells shows up once per cell.
            self.candidates.sort_unstable();
            self.candidates.dedup();

            for &b in &self.candidates {
                // Each unordered pair once.
                if b > a {
                    contact(store, a, b, restitution, shatter_speed, report);
                }
            }
        }

        // Oversized bodies against every other solid body.
        for (i, &a) in self.oversized.iter().enumerate() {
            for &b in &self.solids {
                let indexed = store.at(b).is_some_and(|e| e.radius <= max_indexed);
                if indexed {
                    contact(store, a, b, restitution, shatter_speed, report);
                }
            }
            for &b in &self.oversized[i + 1..] {
                contact(store, a, b, restitution, shatter_speed, report);
            }
        }
    }
}

impl Default for PhysicsStepper {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

/// Result of two solid bodies touching.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Contact {
    Bounce,
    /// The lighter body breaks; `a_breaks` tells which one.
    Shatter { a_breaks: bool },
}

/// Resolves one candidate pair and records the outcome. Retired bodies are skipped.
fn contact(
    store: &mut EntityStore,
    a: u32,
    b: u32,
    restitution: f32,
    shatter_speed: Option<f32>,
    report: &mut StepReport,
) {
    let Some((ea, eb)) = store.pair_mut(a, b) else { return };
    if !ea.is_live() || !eb.is_live() {
        return;
    }
    let (id_a, id_b) = (ea.id, eb.id);

    match resolve_pair(ea, eb, restitution, shatter_speed) {
        None => {}
        Some(Contact::Bounce) => report.collisions.push((id_a, id_b)),
        Some(Contact::Shatter { a_breaks }) => {
            let (broken, by) = if a_breaks { (id_a, id_b) } else { (id_b, id_a) };
            store.retire(broken, EntityState::Destroyed);
            report.shattered.push((broken, by));
        }
    }
}

/// Contact response for one pair. Mass ∝ r².
///
/// Spin is exchanged on every contact. A closing speed above `shatter_speed`
/// breaks the lighter body (ties break `a`); otherwise the pair bounces with
/// an impulse and is pushed apart.
fn resolve_pair(
    a: &mut Entity,
    b: &mut Entity,
    restitution: f32,
    shatter_speed: Option<f32>,
) -> Option<Contact> {
    let d = a.position - b.position;
    let dist = d.length();
    let combined = a.radius + b.radius;
    if dist >= combined {
        return None;
    }

    let normal = if dist > f32::EPSILON { d / dist } else { Vec2::X };
    let ma = a.radius * a.radius;
    let mb = b.radius * b.radius;

    let rel = a.velocity - b.velocity;
    let vn = rel.dot(normal);

    // Tangential slip spins both bodies in opposite senses.
    let torque = rel.dot(normal.perp()) * 0.1;
    a.spin -= torque / ma;
    b.spin += torque / mb;

    if shatter_speed.is_some_and(|s| -vn > s) {
        return Some(Contact::Shatter { a_breaks: ma <= mb });
    }

    if vn < 0.0 {
        let j = -(1.0 + restitution) * vn / (1.0 / ma + 1.0 / mb);
        a.velocity += normal * (j / ma);
        b.velocity -= normal * (j / mb);
    }

    let separation = normal * ((combined - dist) * 0.5);
    a.position += separation;
    b.position -= separation;

    Some(Contact::Bounce)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stepper() -> PhysicsStepper {
        PhysicsStepper::new(SimConfig {
            despawn_distance: None,
            ..SimConfig::default()
        })
    }

    // ── kinematics ────────────────────────────────────────────────────────

    #[test]
    fn zero_or_negative_dt_is_noop() {
        let mut s = EntityStore::new();
        let id = s
            .spawn(VisualType::Rock, Vec2::ZERO, Vec2::new(10.0, 0.0), 1.0, 0.1)
            .unwrap();
        let mut p = stepper();

        for dt in [0.0, -1.0, f32::NAN] {
            let r = p.step(&mut s, dt);
            assert!(r.is_empty());
        }
        assert_eq!(s.get(id).unwrap().position, Vec2::ZERO);
        assert_eq!(s.get(id).unwrap().age(), 0.0);
    }

    #[test]
    fn free_body_moves_linearly() {
        let mut s = EntityStore::new();
        let id = s
            .spawn(VisualType::Rock, Vec2::new(1.0, 2.0), Vec2::new(3.0, -4.0), 1.0, 0.1)
            .unwrap();
        stepper().step(&mut s, 0.5);
        assert_eq!(s.get(id).unwrap().position, Vec2::new(2.5, 0.0));
    }

    #[test]
    fn speed_is_clamped() {
        let mut s = EntityStore::new();
        let id = s
            .spawn(VisualType::Rock, Vec2::ZERO, Vec2::new(1.0e6, 0.0), 1.0, 0.1)
            .unwrap();
        let mut p = stepper();
        p.step(&mut s, 0.01);
        let v = s.get(id).unwrap().velocity.length();
        assert!((v - p.config().max_speed).abs() < 1e-2);
    }

    #[test]
    fn rotation_accumulates_and_wraps() {
        let mut s = EntityStore::new();
        let id = s
            .spawn_with(
                crate::entity::SpawnParams::new(VisualType::Rock, Vec2::ZERO, Vec2::ZERO, 1.0, 0.1)
                    .with_spin(6.0, 1.0),
            )
            .unwrap();
        stepper().step(&mut s, 1.0);
        let r = s.get(id).unwrap().rotation();
        assert!((r - (7.0 - std::f32::consts::TAU)).abs() < 1e-4);
    }

    // ── black holes ───────────────────────────────────────────────────────

    #[test]
    fn body_is_pulled_toward_black_hole() {
        let mut s = EntityStore::new();
        s.spawn(VisualType::BlackHole, Vec2::ZERO, Vec2::ZERO, 40.0, 0.5).unwrap();
        let rock = s
            .spawn(VisualType::Rock, Vec2::new(300.0, 0.0), Vec2::ZERO, 2.0, 0.5)
            .unwrap();
        stepper().step(&mut s, 0.1);
        let e = s.get(rock).unwrap();
        assert!(e.velocity.x < 0.0);
        assert!(e.position.x < 300.0);
    }

    #[test]
    fn pull_from_two_holes_sums() {
        let mut s = EntityStore::new();
        s.spawn(VisualType::BlackHole, Vec2::new(-200.0, 0.0), Vec2::ZERO, 40.0, 0.5).unwrap();
        s.spawn(VisualType::BlackHole, Vec2::new(200.0, 0.0), Vec2::ZERO, 40.0, 0.5).unwrap();
        let rock = s
            .spawn(VisualType::Rock, Vec2::new(0.0, 10.0), Vec2::ZERO, 1.0, 0.5)
            .unwrap();
        stepper().step(&mut s, 0.1);
        let v = s.get(rock).unwrap().velocity;
        // Symmetric holes: horizontal components cancel, both pull down toward y = 0.
        assert!(v.x.abs() < 1e-3);
        assert!(v.y < 0.0);
    }

    #[test]
    fn body_inside_radius_is_consumed() {
        let mut s = EntityStore::new();
        let hole = s
            .spawn(VisualType::BlackHole, Vec2::ZERO, Vec2::ZERO, 80.0, 0.5)
            .unwrap();
        let rock = s
            .spawn(VisualType::Rock, Vec2::new(-200.0, 0.0), Vec2::new(200.0, 0.0), 5.0, 0.5)
            .unwrap();

        let report = stepper().step(&mut s, 1.0);
        assert_eq!(report.consumed, vec![(rock, hole)]);
        assert_eq!(s.get(rock).unwrap().state(), EntityState::Consumed);
        assert_eq!(s.live_count(), 1);
    }

    #[test]
    fn black_holes_do_not_consume_each_other() {
        let mut s = EntityStore::new();
        s.spawn(VisualType::BlackHole, Vec2::ZERO, Vec2::ZERO, 80.0, 0.5).unwrap();
        s.spawn(VisualType::BlackHole, Vec2::new(10.0, 0.0), Vec2::ZERO, 60.0, 0.5).unwrap();
        let report = stepper().step(&mut s, 0.1);
        assert!(report.consumed.is_empty());
        assert_eq!(s.live_count(), 2);
    }

    #[test]
    fn nearby_bodies_crack_and_cracks_never_drop() {
        let mut s = EntityStore::new();
        s.spawn(VisualType::BlackHole, Vec2::ZERO, Vec2::ZERO, 50.0, 0.5).unwrap();
        let rock = s
            .spawn(VisualType::Rock, Vec2::new(300.0, 0.0), Vec2::new(400.0, 0.0), 2.0, 0.5)
            .unwrap();
        let mut p = stepper();

        p.step(&mut s, 0.01);
        let c0 = s.get(rock).unwrap().crack_intensity();
        assert!(c0 > 0.0);

        // Moving away lowers proximity; the stored crack must not decrease.
        p.step(&mut s, 0.5);
        assert!(s.get(rock).unwrap().crack_intensity() >= c0);
    }

    // ── lifetime / bounds ─────────────────────────────────────────────────

    #[test]
    fn timed_entities_expire() {
        let mut s = EntityStore::new();
        let trail = s
            .spawn_with(
                crate::entity::SpawnParams::new(VisualType::Trail, Vec2::ZERO, Vec2::ZERO, 3.0, 0.5)
                    .with_lifetime(0.3),
            )
            .unwrap();
        let mut p = stepper();
        assert!(p.step(&mut s, 0.2).expired.is_empty());
        assert_eq!(p.step(&mut s, 0.2).expired, vec![trail]);
        assert!(!s.get(trail).unwrap().is_live());
    }

    #[test]
    fn far_bodies_are_despawned_relative_to_focus() {
        let mut s = EntityStore::new();
        let near = s.spawn(VisualType::Rock, Vec2::new(5000.0, 0.0), Vec2::ZERO, 1.0, 0.5).unwrap();
        let far = s.spawn(VisualType::Rock, Vec2::new(-5000.0, 0.0), Vec2::ZERO, 1.0, 0.5).unwrap();

        let mut p = PhysicsStepper::default();
        p.set_focus(Vec2::new(4000.0, 0.0));
        let report = p.step(&mut s, 0.01);

        assert_eq!(report.out_of_bounds, vec![far]);
        assert!(s.get(near).unwrap().is_live());
    }

    // ── collisions ────────────────────────────────────────────────────────

    #[test]
    fn overlapping_bodies_are_separated() {
        let mut s = EntityStore::new();
        let a = s.spawn(VisualType::Rock, Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), 10.0, 0.5).unwrap();
        let b = s.spawn(VisualType::Rock, Vec2::new(15.0, 0.0), Vec2::new(-10.0, 0.0), 10.0, 0.5).unwrap();

        let report = stepper().step(&mut s, 0.01);
        assert_eq!(report.collisions, vec![(a, b)]);

        let (ea, eb) = (s.get(a).unwrap(), s.get(b).unwrap());
        assert!(ea.position.distance(eb.position) >= 20.0 - 1e-3);
        // Head-on approach is reversed.
        assert!(ea.velocity.x < 0.0);
        assert!(eb.velocity.x > 0.0);
    }

    #[test]
    fn effects_pass_through_bodies() {
        let mut s = EntityStore::new();
        s.spawn(VisualType::Rock, Vec2::ZERO, Vec2::ZERO, 10.0, 0.5).unwrap();
        s.spawn(VisualType::Trail, Vec2::new(1.0, 0.0), Vec2::ZERO, 10.0, 0.5).unwrap();
        assert!(stepper().step(&mut s, 0.01).collisions.is_empty());
    }

    #[test]
    fn hard_impact_shatters_the_lighter_body() {
        let mut s = EntityStore::new();
        let big = s.spawn(VisualType::Rock, Vec2::ZERO, Vec2::new(300.0, 0.0), 20.0, 0.5).unwrap();
        let small = s
            .spawn(VisualType::Ice, Vec2::new(25.0, 0.0), Vec2::new(-300.0, 0.0), 8.0, 0.5)
            .unwrap();

        let report = stepper().step(&mut s, 0.001);
        assert_eq!(report.shattered, vec![(small, big)]);
        assert!(report.collisions.is_empty());
        assert_eq!(report.retired(), 1);
        assert!(!s.get(small).unwrap().is_live());
        assert!(s.get(big).unwrap().is_live());
    }

    #[test]
    fn separating_bodies_never_shatter() {
        let mut s = EntityStore::new();
        let a = s.spawn(VisualType::Rock, Vec2::ZERO, Vec2::new(-400.0, 0.0), 10.0, 0.5).unwrap();
        let b = s.spawn(VisualType::Rock, Vec2::new(5.0, 0.0), Vec2::new(400.0, 0.0), 10.0, 0.5).unwrap();

        let report = stepper().step(&mut s, 0.001);
        assert!(report.shattered.is_empty());
        assert_eq!(report.collisions, vec![(a, b)]);
    }

    #[test]
    fn shattering_can_be_disabled() {
        let mut s = EntityStore::new();
        s.spawn(VisualType::Rock, Vec2::ZERO, Vec2::new(300.0, 0.0), 20.0, 0.5).unwrap();
        s.spawn(VisualType::Rock, Vec2::new(25.0, 0.0), Vec2::new(-300.0, 0.0), 8.0, 0.5).unwrap();
        let mut p = PhysicsStepper::new(SimConfig {
            despawn_distance: None,
            shatter_speed: None,
            ..SimConfig::default()
        });

        let report = p.step(&mut s, 0.001);
        assert!(report.shattered.is_empty());
        assert_eq!(report.collisions.len(), 1);
        assert_eq!(s.live_count(), 2);
    }

    #[test]
    fn huge_body_collides_without_flooding_the_grid() {
        let mut s = EntityStore::new();
        let star = s.spawn(VisualType::Star, Vec2::ZERO, Vec2::ZERO, 2.0e5, 0.5).unwrap();
        let touching = s
            .spawn(VisualType::Rock, Vec2::new(2.0e5 + 5.0, 0.0), Vec2::ZERO, 10.0, 0.5)
            .unwrap();
        for i in 0..3 {
            let x = 2.5e5 + 100.0 * i as f32;
            s.spawn(VisualType::Rock, Vec2::new(x, 0.0), Vec2::ZERO, 10.0, 0.5).unwrap();
        }

        let mut p = stepper();
        let report = p.step(&mut s, 0.01);

        assert_eq!(report.collisions, vec![(star, touching)]);
        // Only the small rocks are indexed, a handful of cells each.
        assert!(p.grid.cell_count() <= 16);
        let gap = s.get(touching).unwrap().position.distance(s.get(star).unwrap().position);
        assert!(gap >= 2.0e5 + 10.0 - 0.1);
    }

    #[test]
    fn spanning_bodies_pair_once() {
        let mut s = EntityStore::new();
        // Both straddle several cells of the default grid.
        let a = s.spawn(VisualType::Gas, Vec2::new(170.0, 170.0), Vec2::ZERO, 100.0, 0.5).unwrap();
        let b = s.spawn(VisualType::Gas, Vec2::new(300.0, 190.0), Vec2::ZERO, 100.0, 0.5).unwrap();

        let report = stepper().step(&mut s, 0.01);
        assert_eq!(report.collisions, vec![(a, b)]);
    }

    #[test]
    fn collisions_can_be_disabled() {
        let mut s = EntityStore::new();
        s.spawn(VisualType::Rock, Vec2::ZERO, Vec2::ZERO, 10.0, 0.5).unwrap();
        s.spawn(VisualType::Rock, Vec2::new(1.0, 0.0), Vec2::ZERO, 10.0, 0.5).unwrap();
        let mut p = PhysicsStepper::new(SimConfig {
            collisions: false,
            ..SimConfig::default()
        });
        assert!(p.step(&mut s, 0.01).collisions.is_empty());
    }
}
