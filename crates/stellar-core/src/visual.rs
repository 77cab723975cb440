//! Visual deriver: simulation state + time → GPU-facing attributes.
//!
//! Everything here is a pure function of the entity and the global clock.
//! Per-type behavior lives in a parameter table indexed by [`VisualType::index`].

use std::f32::consts::TAU;

use crate::color::Rgba;
use crate::entity::{Entity, VisualType};

/// Per-type visual parameters.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VisualParams {
    pub base_color: Rgba,
    pub crack_color: Rgba,
    /// Maximum per-channel seed offset applied to `base_color`.
    pub color_jitter: f32,
    pub glow_base: f32,
    pub glow_pulse: f32,
    /// Pulse frequency in Hz.
    pub glow_frequency: f32,
    /// Loop period for animated textures; `None` for static types.
    pub anim_period: Option<f32>,
    /// Higher survives instance-capacity truncation longer.
    pub priority: u8,
}

/// Crack intensity added per tier level.
pub const CRACK_PER_TIER: f32 = 0.15;

const fn params(
    base: (f32, f32, f32, f32),
    crack: (f32, f32, f32),
    color_jitter: f32,
    glow: (f32, f32, f32),
    anim_period: Option<f32>,
    priority: u8,
) -> VisualParams {
    VisualParams {
        base_color: Rgba::new(base.0, base.1, base.2, base.3),
        crack_color: Rgba::rgb(crack.0, crack.1, crack.2),
        color_jitter,
        glow_base: glow.0,
        glow_pulse: glow.1,
        glow_frequency: glow.2,
        anim_period,
        priority,
    }
}

/// Default table, in `VisualType` discriminant order.
pub const DEFAULT_PARAMS: [VisualParams; VisualType::COUNT] = [
    // Rock
    params((0.55, 0.50, 0.45, 1.0), (1.0, 0.6, 0.1), 0.08, (0.0, 0.0, 0.0), None, 2),
    // Ice
    params((0.30, 0.60, 0.80, 1.0), (0.4, 0.9, 1.0), 0.06, (0.15, 0.05, 0.3), None, 2),
    // Lava
    params((0.90, 0.40, 0.20, 1.0), (1.0, 0.4, 0.2), 0.05, (0.6, 0.2, 0.5), Some(4.0), 3),
    // Gas
    params((0.90, 0.60, 0.30, 0.85), (0.2, 1.0, 0.4), 0.07, (0.3, 0.1, 0.25), Some(6.0), 3),
    // Star
    params((1.00, 0.90, 0.60, 1.0), (1.0, 1.0, 0.7), 0.04, (1.2, 0.35, 0.8), Some(8.0), 5),
    // BlackHole
    params((0.02, 0.02, 0.03, 1.0), (0.8, 0.8, 1.0), 0.0, (0.8, 0.2, 0.2), Some(10.0), 7),
    // Trail
    params((1.00, 0.80, 0.20, 0.9), (1.0, 0.8, 0.2), 0.1, (0.9, 0.0, 0.0), None, 0),
    // Jet
    params((0.70, 0.90, 1.00, 0.9), (0.7, 0.9, 1.0), 0.05, (1.0, 0.5, 4.0), None, 1),
    // Neutron
    params((0.80, 0.85, 1.00, 1.0), (0.7, 0.9, 1.0), 0.03, (1.5, 0.6, 2.0), None, 6),
];

/// Derived visual state of one entity for one frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VisualAttributes {
    pub color: Rgba,
    pub crack_color: Rgba,
    pub glow_intensity: f32,
    pub crack_intensity: f32,
    pub rotation: f32,
    pub anim_time: f32,
}

/// Table-driven visual derivation.
#[derive(Debug, Clone)]
pub struct VisualDeriver {
    table: [VisualParams; VisualType::COUNT],
}

impl VisualDeriver {
    pub fn new() -> Self {
        Self { table: DEFAULT_PARAMS }
    }

    #[inline]
    pub fn params(&self, t: VisualType) -> &VisualParams {
        &self.table[t.index()]
    }

    #[inline]
    pub fn priority(&self, t: VisualType) -> u8 {
        self.table[t.index()].priority
    }

    /// Derives the visual attributes of `e` at global time `time` (seconds).
    ///
    /// Pure and idempotent: identical inputs always give identical output.
    /// Periodic terms are reduced in `f64` so long sessions do not drift.
    pub fn derive(&self, e: &Entity, time: f64) -> VisualAttributes {
        let p = self.params(e.visual_type());
        let seed = e.seed();
        let time = if time.is_finite() { time } else { 0.0 };

        let mut color = jitter(p.base_color, seed, p.color_jitter);
        if e.lifetime().is_some() {
            color = color.with_alpha(color.a * e.life_remaining());
        }

        let cycles = (f64::from(p.glow_frequency) * time).rem_euclid(1.0) as f32;
        let phase = TAU * (cycles + seed);
        let glow_intensity = (p.glow_base + p.glow_pulse * phase.sin()).max(0.0);

        let crack_intensity =
            (e.crack_intensity() + f32::from(e.tier()) * CRACK_PER_TIER).clamp(0.0, 1.0);

        let rotation = if e.spin != 0.0 { e.rotation() } else { seed * TAU };

        let anim_time = match p.anim_period {
            Some(period) if period > 0.0 => (time.rem_euclid(f64::from(period)) as f32).min(period),
            _ => 0.0,
        };

        VisualAttributes {
            color,
            crack_color: p.crack_color,
            glow_intensity,
            crack_intensity,
            rotation,
            anim_time,
        }
    }
}

impl Default for VisualDeriver {
    fn default() -> Self {
        Self::new()
    }
}

/// Integer mix of the seed's bits and a channel salt; maps to `[-1, 1]`.
#[inline]
fn seed_unit(seed: f32, salt: u32) -> f32 {
    let mut x = seed.to_bits() ^ salt.wrapping_mul(0x9E37_79B9);
    x = (x ^ (x >> 16)).wrapping_mul(0x7FEB_352D);
    x = (x ^ (x >> 15)).wrapping_mul(0x846C_A68B);
    x ^= x >> 16;
    (x as f32 / u32::MAX as f32) * 2.0 - 1.0
}

fn jitter(c: Rgba, seed: f32, amount: f32) -> Rgba {
    if amount <= 0.0 {
        return c;
    }
    Rgba::new(
        (c.r + seed_unit(seed, 1) * amount).clamp(0.0, 1.0),
        (c.g + seed_unit(seed, 2) * amount).clamp(0.0, 1.0),
        (c.b + seed_unit(seed, 3) * amount).clamp(0.0, 1.0),
        c.a,
    )
}
