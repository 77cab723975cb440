//! Instance packer.
//!
//! Serializes live entities plus their derived visuals into a contiguous
//! [`InstanceRecord`] buffer. Within capacity this is a single O(n) pass in
//! store order; past capacity the lowest-priority and then oldest entities are
//! dropped until exactly `capacity` records remain.

use crate::config::PackConfig;
use crate::entity::{Entity, EntityStore};
use crate::error::SimError;
use crate::layout::InstanceRecord;
use crate::visual::{VisualAttributes, VisualDeriver};

/// CPU-side instance buffer, ready for upload.
#[derive(Debug, Clone, Default)]
pub struct InstanceBuffer {
    records: Vec<InstanceRecord>,
}

impl InstanceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.records.clear();
    }

    #[inline]
    pub fn as_slice(&self) -> &[InstanceRecord] {
        &self.records
    }

    /// Raw bytes in upload order.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.records)
    }

    #[inline]
    pub(crate) fn push(&mut self, r: InstanceRecord) {
        self.records.push(r);
    }
}

/// Result of one [`InstancePacker::pack`] call.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PackReport {
    pub written: usize,
    pub dropped: usize,
}

impl PackReport {
    /// `Some(InstanceCapacityExceeded)` if entities were truncated.
    pub fn overflow(&self) -> Option<SimError> {
        (self.dropped > 0).then(|| SimError::InstanceCapacityExceeded {
            live: self.written + self.dropped,
            capacity: self.written,
        })
    }
}

/// Builds one instance record. Field order follows the layout contract.
pub fn instance_record(e: &Entity, v: &VisualAttributes) -> InstanceRecord {
    InstanceRecord {
        position: e.position.to_array(),
        velocity: e.velocity.to_array(),
        radius: e.radius(),
        color: v.color.to_array(),
        glow_intensity: v.glow_intensity,
        seed: e.seed(),
        crack_color: v.crack_color.to_array(),
        crack_intensity: v.crack_intensity,
        rotation: v.rotation,
        kind: e.visual_type().wire(),
        anim_time: v.anim_time,
    }
}

#[derive(Debug, Copy, Clone)]
struct Candidate {
    order: u32,
    priority: u8,
    spawn_seq: u64,
}

#[derive(Debug)]
pub struct InstancePacker {
    config: PackConfig,
    candidates: Vec<Candidate>,

    // Warn once per overflow episode, not every frame.
    warned_overflow: bool,
}

impl InstancePacker {
    pub fn new(config: PackConfig) -> Self {
        Self {
            config,
            candidates: Vec::new(),
            warned_overflow: false,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Packs every live entity of `store` into `out` (cleared first).
    pub fn pack(
        &mut self,
        store: &EntityStore,
        deriver: &VisualDeriver,
        time: f64,
        out: &mut InstanceBuffer,
    ) -> PackReport {
        out.clear();

        let live = store.live_count();
        let capacity = self.config.capacity;

        if live <= capacity {
            self.warned_overflow = false;
            for e in store.iter_live() {
                out.push(instance_record(e, &deriver.derive(e, time)));
            }
            return PackReport {
                written: out.len(),
                dropped: 0,
            };
        }

        // Overflow: rank by (priority desc, spawn_seq desc) and keep the top `capacity`.
        self.candidates.clear();
        self.candidates.extend(store.iter_live().enumerate().map(|(i, e)| Candidate {
            order: i as u32,
            priority: deriver.priority(e.visual_type()),
            spawn_seq: e.spawn_seq(),
        }));

        let rank = |a: &Candidate, b: &Candidate| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.spawn_seq.cmp(&a.spawn_seq))
        };
        if capacity > 0 {
            self.candidates.select_nth_unstable_by(capacity - 1, rank);
        }
        self.candidates.truncate(capacity);
        // Survivors keep store order.
        self.candidates.sort_unstable_by_key(|c| c.order);

        let mut keep = self.candidates.iter().map(|c| c.order).peekable();
        for (i, e) in store.iter_live().enumerate() {
            if keep.peek() == Some(&(i as u32)) {
                keep.next();
                out.push(instance_record(e, &deriver.derive(e, time)));
            }
        }

        let report = PackReport {
            written: out.len(),
            dropped: live - out.len(),
        };

        if !self.warned_overflow {
            self.warned_overflow = true;
            if let Some(err) = report.overflow() {
                log::warn!("{err}; dropped {} lowest-priority instances", report.dropped);
            }
        }

        report
    }
}

impl Default for InstancePacker {
    fn default() -> Self {
        Self::new(PackConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityId, VisualType};
    use glam::Vec2;

    fn spawn(s: &mut EntityStore, t: VisualType, x: f32) -> EntityId {
        s.spawn(t, Vec2::new(x, 0.0), Vec2::ZERO, 3.0, 0.5).unwrap()
    }

    fn packer(capacity: usize) -> InstancePacker {
        InstancePacker::new(PackConfig { capacity })
    }

    // ── within capacity ───────────────────────────────────────────────────

    #[test]
    fn length_equals_live_count() {
        let mut s = EntityStore::new();
        for i in 0..10 {
            spawn(&mut s, VisualType::Rock, i as f32);
        }
        let removed = spawn(&mut s, VisualType::Ice, 99.0);
        s.remove(removed);

        let mut out = InstanceBuffer::new();
        let r = packer(64).pack(&s, &VisualDeriver::new(), 0.0, &mut out);
        assert_eq!(out.len(), 10);
        assert_eq!(r, PackReport { written: 10, dropped: 0 });
        assert!(r.overflow().is_none());
    }

    #[test]
    fn records_follow_store_order_and_fields() {
        let mut s = EntityStore::new();
        spawn(&mut s, VisualType::Star, 1.0);
        spawn(&mut s, VisualType::BlackHole, 2.0);

        let mut out = InstanceBuffer::new();
        packer(8).pack(&s, &VisualDeriver::new(), 0.0, &mut out);

        let recs = out.as_slice();
        assert_eq!(recs[0].kind, VisualType::Star.wire());
        assert_eq!(recs[0].position, [1.0, 0.0]);
        assert_eq!(recs[1].kind, VisualType::BlackHole.wire());
        assert_eq!(recs[1].radius, 3.0);
        assert_eq!(out.as_bytes().len(), 2 * InstanceRecord::SIZE);
    }

    #[test]
    fn pack_clears_previous_contents() {
        let mut s = EntityStore::new();
        spawn(&mut s, VisualType::Rock, 0.0);
        let mut out = InstanceBuffer::new();
        let mut p = packer(8);
        p.pack(&s, &VisualDeriver::new(), 0.0, &mut out);
        p.pack(&s, &VisualDeriver::new(), 0.0, &mut out);
        assert_eq!(out.len(), 1);
    }

    // ── overflow ──────────────────────────────────────────────────────────

    #[test]
    fn overflow_truncates_to_capacity_exactly() {
        let mut s = EntityStore::new();
        for i in 0..20 {
            spawn(&mut s, VisualType::Rock, i as f32);
        }
        let mut out = InstanceBuffer::new();
        let r = packer(7).pack(&s, &VisualDeriver::new(), 0.0, &mut out);
        assert_eq!(out.len(), 7);
        assert_eq!(r.dropped, 13);
        assert_eq!(
            r.overflow(),
            Some(SimError::InstanceCapacityExceeded { live: 20, capacity: 7 })
        );
    }

    #[test]
    fn overflow_drops_low_priority_then_oldest() {
        let mut s = EntityStore::new();
        spawn(&mut s, VisualType::Rock, 0.0); // old rock: dropped
        spawn(&mut s, VisualType::Trail, 1.0); // lowest priority: dropped
        spawn(&mut s, VisualType::BlackHole, 2.0);
        spawn(&mut s, VisualType::Rock, 3.0); // newer rock: kept

        let mut out = InstanceBuffer::new();
        packer(2).pack(&s, &VisualDeriver::new(), 0.0, &mut out);

        let xs: Vec<f32> = out.as_slice().iter().map(|r| r.position[0]).collect();
        assert_eq!(xs, vec![2.0, 3.0]);
    }

    #[test]
    fn overflow_is_deterministic() {
        let mut s = EntityStore::new();
        for i in 0..50 {
            let t = VisualType::ALL[i % VisualType::COUNT];
            spawn(&mut s, t, i as f32);
        }
        let d = VisualDeriver::new();
        let (mut a, mut b) = (InstanceBuffer::new(), InstanceBuffer::new());
        packer(17).pack(&s, &d, 1.0, &mut a);
        packer(17).pack(&s, &d, 1.0, &mut b);
        assert_eq!(a.as_slice(), b.as_slice());
    }

    #[test]
    fn zero_capacity_writes_nothing() {
        let mut s = EntityStore::new();
        spawn(&mut s, VisualType::Rock, 0.0);
        let mut out = InstanceBuffer::new();
        let r = packer(0).pack(&s, &VisualDeriver::new(), 0.0, &mut out);
        assert!(out.is_empty());
        assert_eq!(r.dropped, 1);
    }
}
