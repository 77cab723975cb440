use std::f32::consts::TAU;

use glam::Vec2;

use crate::error::{Result, SimError};

use super::{EntityId, VisualType};

/// Lifecycle of an entity. `Consumed` and `Destroyed` are terminal.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum EntityState {
    Alive,
    /// Swallowed by a black hole.
    Consumed,
    /// Removed, expired or left the play area.
    Destroyed,
}

impl EntityState {
    #[inline]
    pub const fn is_live(self) -> bool {
        matches!(self, EntityState::Alive)
    }
}

/// Spawn request.
///
/// `radius`, `position`, `velocity` and `seed` are validated by
/// [`EntityStore::spawn_with`](super::EntityStore::spawn_with).
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnParams {
    pub visual_type: VisualType,
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
    /// Procedural seed in `[0, 1)`.
    pub seed: f32,
    /// Initial rotation (radians); wrapped on spawn.
    pub rotation: f32,
    /// Angular velocity (rad/s). Zero means the body does not spin.
    pub spin: f32,
    /// Seconds until the entity expires. `None` lives until removed.
    pub lifetime: Option<f32>,
    pub tier: u8,
}

impl SpawnParams {
    pub fn new(visual_type: VisualType, position: Vec2, velocity: Vec2, radius: f32, seed: f32) -> Self {
        Self {
            visual_type,
            position,
            velocity,
            radius,
            seed,
            rotation: 0.0,
            spin: 0.0,
            lifetime: None,
            tier: 0,
        }
    }

    #[inline]
    pub fn with_spin(mut self, rotation: f32, spin: f32) -> Self {
        self.rotation = rotation;
        self.spin = spin;
        self
    }

    #[inline]
    pub fn with_lifetime(mut self, seconds: f32) -> Self {
        self.lifetime = Some(seconds);
        self
    }

    #[inline]
    pub fn with_tier(mut self, tier: u8) -> Self {
        self.tier = tier;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(SimError::InvalidSpawnParameters(format!(
                "radius must be finite and > 0 (got {})",
                self.radius
            )));
        }
        if !self.position.is_finite() || !self.velocity.is_finite() {
            return Err(SimError::InvalidSpawnParameters(
                "position and velocity must be finite".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.seed) {
            return Err(SimError::InvalidSpawnParameters(format!(
                "seed must lie in [0, 1) (got {})",
                self.seed
            )));
        }
        if !(self.rotation.is_finite() && self.spin.is_finite()) {
            return Err(SimError::InvalidSpawnParameters(
                "rotation and spin must be finite".to_string(),
            ));
        }
        if let Some(l) = self.lifetime {
            if !(l.is_finite() && l > 0.0) {
                return Err(SimError::InvalidSpawnParameters(format!(
                    "lifetime must be finite and > 0 (got {l})"
                )));
            }
        }
        Ok(())
    }
}

/// Authoritative simulation state of one entity.
///
/// Kinematic fields are public so hosts can steer bodies; identity, seed and
/// type are fixed at spawn. Crack/tier changes go through the store so the
/// monotonicity rule is enforced in one place.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Angular velocity (rad/s).
    pub spin: f32,

    pub(crate) id: EntityId,
    pub(crate) visual_type: VisualType,
    pub(crate) radius: f32,
    pub(crate) seed: f32,
    pub(crate) rotation: f32,
    pub(crate) crack_intensity: f32,
    pub(crate) tier: u8,
    pub(crate) age: f32,
    pub(crate) lifetime: Option<f32>,
    pub(crate) spawn_seq: u64,
    pub(crate) state: EntityState,
}

impl Entity {
    pub(crate) fn from_params(id: EntityId, spawn_seq: u64, p: SpawnParams) -> Self {
        Self {
            position: p.position,
            velocity: p.velocity,
            spin: p.spin,
            id,
            visual_type: p.visual_type,
            radius: p.radius,
            seed: p.seed,
            rotation: wrap_angle(p.rotation),
            crack_intensity: 0.0,
            tier: p.tier,
            age: 0.0,
            lifetime: p.lifetime,
            spawn_seq,
            state: EntityState::Alive,
        }
    }

    #[inline]
    pub fn id(&self) -> EntityId {
        self.id
    }

    #[inline]
    pub fn visual_type(&self) -> VisualType {
        self.visual_type
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    #[inline]
    pub fn seed(&self) -> f32 {
        self.seed
    }

    /// Accumulated rotation in `[0, 2π)`.
    #[inline]
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    #[inline]
    pub fn crack_intensity(&self) -> f32 {
        self.crack_intensity
    }

    #[inline]
    pub fn tier(&self) -> u8 {
        self.tier
    }

    /// Seconds since spawn.
    #[inline]
    pub fn age(&self) -> f32 {
        self.age
    }

    #[inline]
    pub fn lifetime(&self) -> Option<f32> {
        self.lifetime
    }

    /// Fraction of the lifetime left, `1.0` for entities without a lifetime.
    #[inline]
    pub fn life_remaining(&self) -> f32 {
        match self.lifetime {
            Some(l) => (1.0 - self.age / l).clamp(0.0, 1.0),
            None => 1.0,
        }
    }

    /// Monotonic spawn order; lower is older.
    #[inline]
    pub fn spawn_seq(&self) -> u64 {
        self.spawn_seq
    }

    #[inline]
    pub fn state(&self) -> EntityState {
        self.state
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        self.state.is_live()
    }

    #[inline]
    pub(crate) fn advance_rotation(&mut self, dt: f32) {
        if self.spin != 0.0 {
            self.rotation = wrap_angle(self.rotation + self.spin * dt);
        }
    }
}

/// Wraps an angle into `[0, 2π)`. Non-finite input maps to `0`.
#[inline]
pub(crate) fn wrap_angle(a: f32) -> f32 {
    if !a.is_finite() {
        return 0.0;
    }
    let w = a.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if w >= TAU { 0.0 } else { w }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rock(radius: f32, seed: f32) -> SpawnParams {
        SpawnParams::new(VisualType::Rock, Vec2::ZERO, Vec2::ZERO, radius, seed)
    }

    // ── validation ────────────────────────────────────────────────────────

    #[test]
    fn rejects_non_positive_radius() {
        assert!(rock(0.0, 0.5).validate().is_err());
        assert!(rock(-3.0, 0.5).validate().is_err());
        assert!(rock(f32::NAN, 0.5).validate().is_err());
    }

    #[test]
    fn rejects_seed_out_of_range() {
        assert!(rock(1.0, 1.0).validate().is_err());
        assert!(rock(1.0, -0.01).validate().is_err());
        assert!(rock(1.0, 0.0).validate().is_ok());
    }

    #[test]
    fn rejects_non_finite_kinematics() {
        let mut p = rock(1.0, 0.5);
        p.velocity = Vec2::new(f32::INFINITY, 0.0);
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_lifetime() {
        assert!(rock(1.0, 0.5).with_lifetime(0.0).validate().is_err());
        assert!(rock(1.0, 0.5).with_lifetime(0.25).validate().is_ok());
    }

    // ── angles ────────────────────────────────────────────────────────────

    #[test]
    fn wrap_angle_range() {
        assert_eq!(wrap_angle(0.0), 0.0);
        assert!((wrap_angle(TAU + 1.0) - 1.0).abs() < 1e-5);
        assert!((wrap_angle(-1.0) - (TAU - 1.0)).abs() < 1e-5);
        let tiny = wrap_angle(-1e-9);
        assert!((0.0..TAU).contains(&tiny));
        assert_eq!(wrap_angle(f32::NAN), 0.0);
    }

    #[test]
    fn life_remaining_fades_linearly() {
        let mut e = Entity::from_params(EntityId::new(0, 0), 0, rock(1.0, 0.5).with_lifetime(2.0));
        assert_eq!(e.life_remaining(), 1.0);
        e.age = 1.0;
        assert!((e.life_remaining() - 0.5).abs() < 1e-6);
        e.age = 5.0;
        assert_eq!(e.life_remaining(), 0.0);
    }
}
