use glam::Vec2;

use crate::error::Result;

use super::{Entity, EntityId, EntityState, SpawnParams, VisualType};

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    entity: Option<Entity>,
}

/// Owns every entity of the simulation.
///
/// Performance characteristics:
/// - `spawn()` is O(1) (free-list reuse)
/// - `remove()` is O(1); the slot is reclaimed by [`end_frame`](Self::end_frame)
/// - live iteration is a linear scan in slot order (stable within a frame)
///
/// Entities that leave the `Alive` state stop being live immediately but keep
/// their slot until `end_frame()`, so ids handed out this frame stay unique
/// and in-progress passes never observe a slot being reused.
#[derive(Debug, Default)]
pub struct EntityStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
    retired: Vec<u32>,
    live: usize,
    next_seq: u64,
    generation: u64,
}

impl EntityStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a plain entity (no spin, no lifetime, tier 0).
    pub fn spawn(
        &mut self,
        visual_type: VisualType,
        position: Vec2,
        velocity: Vec2,
        radius: f32,
        seed: f32,
    ) -> Result<EntityId> {
        self.spawn_with(SpawnParams::new(visual_type, position, velocity, radius, seed))
    }

    /// Spawns an entity from a full parameter set.
    ///
    /// Invalid parameters are rejected and the store is left untouched.
    pub fn spawn_with(&mut self, params: SpawnParams) -> Result<EntityId> {
        if let Err(e) = params.validate() {
            log::debug!("spawn rejected: {e}");
            return Err(e);
        }

        let index = match self.free.pop() {
            Some(i) => i,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };

        let slot = &mut self.slots[index as usize];
        let id = EntityId::new(index, slot.generation);
        let seq = self.next_seq;
        self.next_seq += 1;

        slot.entity = Some(Entity::from_params(id, seq, params));
        self.live += 1;

        Ok(id)
    }

    /// Marks an entity destroyed. Returns `false` for stale or already-retired ids.
    pub fn remove(&mut self, id: EntityId) -> bool {
        self.retire(id, EntityState::Destroyed)
    }

    /// Moves a live entity into a terminal state.
    pub(crate) fn retire(&mut self, id: EntityId, state: EntityState) -> bool {
        debug_assert!(!state.is_live(), "retire() needs a terminal state");
        let Some(e) = self.get_mut(id) else { return false };
        if !e.state.is_live() {
            return false;
        }
        e.state = state;
        self.live -= 1;
        self.retired.push(id.index);
        true
    }

    /// Reclaims slots retired during this frame and advances the store generation.
    ///
    /// Returns the number of reclaimed slots.
    pub fn end_frame(&mut self) -> usize {
        let n = self.retired.len();
        for index in self.retired.drain(..) {
            let slot = &mut self.slots[index as usize];
            slot.entity = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(index);
        }
        self.generation = self.generation.wrapping_add(1);
        n
    }

    /// Number of `end_frame()` calls so far.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn live_count(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Looks up an entity, live or retired-this-frame.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entity.as_ref()
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entity.as_mut()
    }

    /// Iterates live entities in slot order.
    ///
    /// The iterator is lazy and finite; calling again restarts from the first slot.
    pub fn iter_live(&self) -> impl Iterator<Item = &Entity> {
        self.slots
            .iter()
            .filter_map(|s| s.entity.as_ref())
            .filter(|e| e.state.is_live())
    }

    pub fn iter_live_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.slots
            .iter_mut()
            .filter_map(|s| s.entity.as_mut())
            .filter(|e| e.state.is_live())
    }

    /// Calls `f` for every live entity in slot order.
    #[inline]
    pub fn for_each_live<F>(&self, f: F)
    where
        F: FnMut(&Entity),
    {
        self.iter_live().for_each(f);
    }

    /// Signals an external tier change.
    ///
    /// Upgrades keep the accumulated crack intensity; a downgrade resets it.
    pub fn signal_tier(&mut self, id: EntityId, tier: u8) -> bool {
        let Some(e) = self.get_mut(id).filter(|e| e.state.is_live()) else {
            return false;
        };
        if tier < e.tier {
            e.crack_intensity = 0.0;
        }
        e.tier = tier;
        true
    }

    /// Raises crack intensity to `value` (clamped to `[0, 1]`). Never lowers it.
    pub fn raise_crack(&mut self, id: EntityId, value: f32) -> bool {
        let Some(e) = self.get_mut(id).filter(|e| e.state.is_live()) else {
            return false;
        };
        raise_crack_of(e, value);
        true
    }

    /// Drops every entity. Outstanding ids become stale.
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.entity.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }
        self.retired.clear();
        self.live = 0;
    }

    // ── crate-internal slot access for the physics passes ─────────────────

    /// Collects slot indices of live entities, in slot order.
    pub(crate) fn live_indices(&self, out: &mut Vec<u32>) {
        out.clear();
        out.extend(
            self.slots
                .iter()
                .enumerate()
                .filter(|(_, s)| s.entity.as_ref().is_some_and(|e| e.state.is_live()))
                .map(|(i, _)| i as u32),
        );
    }

    #[inline]
    pub(crate) fn at(&self, index: u32) -> Option<&Entity> {
        self.slots.get(index as usize)?.entity.as_ref()
    }

    #[inline]
    pub(crate) fn at_mut(&mut self, index: u32) -> Option<&mut Entity> {
        self.slots.get_mut(index as usize)?.entity.as_mut()
    }

    /// Mutable access to two distinct slots at once.
    pub(crate) fn pair_mut(&mut self, a: u32, b: u32) -> Option<(&mut Entity, &mut Entity)> {
        if a == b {
            return None;
        }
        let (lo, hi, swapped) = if a < b { (a, b, false) } else { (b, a, true) };
        let (left, right) = self.slots.split_at_mut(hi as usize);
        let first = left.get_mut(lo as usize)?.entity.as_mut()?;
        let second = right.first_mut()?.entity.as_mut()?;
        if swapped { Some((second, first)) } else { Some((first, second)) }
    }
}

#[inline]
pub(crate) fn raise_crack_of(e: &mut Entity, value: f32) {
    let v = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
    if v > e.crack_intensity {
        e.crack_intensity = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_rock(store: &mut EntityStore, x: f32) -> EntityId {
        store
            .spawn(VisualType::Rock, Vec2::new(x, 0.0), Vec2::ZERO, 5.0, 0.25)
            .unwrap()
    }

    // ── spawn ─────────────────────────────────────────────────────────────

    #[test]
    fn spawn_assigns_unique_ids() {
        let mut s = EntityStore::new();
        let a = spawn_rock(&mut s, 0.0);
        let b = spawn_rock(&mut s, 1.0);
        assert_ne!(a, b);
        assert_eq!(s.live_count(), 2);
    }

    #[test]
    fn spawn_rejects_bad_radius_without_side_effects() {
        let mut s = EntityStore::new();
        let err = s.spawn(VisualType::Rock, Vec2::ZERO, Vec2::ZERO, 0.0, 0.5);
        assert!(matches!(err, Err(crate::SimError::InvalidSpawnParameters(_))));
        assert_eq!(s.live_count(), 0);
        assert_eq!(s.iter_live().count(), 0);
    }

    #[test]
    fn spawn_seq_is_monotonic() {
        let mut s = EntityStore::new();
        let a = spawn_rock(&mut s, 0.0);
        let b = spawn_rock(&mut s, 1.0);
        assert!(s.get(a).unwrap().spawn_seq() < s.get(b).unwrap().spawn_seq());
    }

    // ── removal ───────────────────────────────────────────────────────────

    #[test]
    fn remove_is_visible_immediately_but_reclaimed_at_end_frame() {
        let mut s = EntityStore::new();
        let a = spawn_rock(&mut s, 0.0);
        let _b = spawn_rock(&mut s, 1.0);

        assert!(s.remove(a));
        assert_eq!(s.live_count(), 1);
        assert_eq!(s.iter_live().count(), 1);
        // Slot still resolvable until end of frame.
        assert_eq!(s.get(a).map(|e| e.state()), Some(EntityState::Destroyed));

        // Spawning this frame must not reuse the retired slot.
        let c = spawn_rock(&mut s, 2.0);
        assert_ne!(c.index(), a.index());

        assert_eq!(s.end_frame(), 1);
        assert!(s.get(a).is_none());
    }

    #[test]
    fn remove_twice_is_noop() {
        let mut s = EntityStore::new();
        let a = spawn_rock(&mut s, 0.0);
        assert!(s.remove(a));
        assert!(!s.remove(a));
        assert_eq!(s.live_count(), 0);
    }

    #[test]
    fn stale_id_never_resolves_after_reuse() {
        let mut s = EntityStore::new();
        let a = spawn_rock(&mut s, 0.0);
        s.remove(a);
        s.end_frame();

        let b = spawn_rock(&mut s, 3.0);
        assert_eq!(a.index(), b.index());
        assert_ne!(a, b);
        assert!(s.get(a).is_none());
        assert!(!s.remove(a));
        assert!(s.get(b).is_some());
    }

    #[test]
    fn end_frame_advances_generation() {
        let mut s = EntityStore::new();
        assert_eq!(s.generation(), 0);
        s.end_frame();
        s.end_frame();
        assert_eq!(s.generation(), 2);
    }

    // ── iteration ─────────────────────────────────────────────────────────

    #[test]
    fn iter_live_is_restartable_and_ordered() {
        let mut s = EntityStore::new();
        let ids: Vec<_> = (0..4).map(|i| spawn_rock(&mut s, i as f32)).collect();
        s.remove(ids[1]);

        let first: Vec<_> = s.iter_live().map(|e| e.id()).collect();
        let second: Vec<_> = s.iter_live().map(|e| e.id()).collect();
        assert_eq!(first, vec![ids[0], ids[2], ids[3]]);
        assert_eq!(first, second);

        let mut seen = 0;
        s.for_each_live(|_| seen += 1);
        assert_eq!(seen, 3);
    }

    #[test]
    fn pair_mut_returns_requested_order() {
        let mut s = EntityStore::new();
        let a = spawn_rock(&mut s, 10.0);
        let b = spawn_rock(&mut s, 20.0);
        let (eb, ea) = s.pair_mut(b.index(), a.index()).unwrap();
        assert_eq!(eb.position.x, 20.0);
        assert_eq!(ea.position.x, 10.0);
        assert!(s.pair_mut(a.index(), a.index()).is_none());
    }

    // ── tiers / cracks ────────────────────────────────────────────────────

    #[test]
    fn crack_never_decreases_within_tier() {
        let mut s = EntityStore::new();
        let a = spawn_rock(&mut s, 0.0);
        s.raise_crack(a, 0.6);
        s.raise_crack(a, 0.2);
        assert_eq!(s.get(a).unwrap().crack_intensity(), 0.6);
        s.raise_crack(a, 4.0);
        assert_eq!(s.get(a).unwrap().crack_intensity(), 1.0);
    }

    #[test]
    fn tier_upgrade_keeps_cracks_downgrade_resets() {
        let mut s = EntityStore::new();
        let a = spawn_rock(&mut s, 0.0);
        s.raise_crack(a, 0.5);

        s.signal_tier(a, 2);
        assert_eq!(s.get(a).unwrap().crack_intensity(), 0.5);

        s.signal_tier(a, 1);
        let e = s.get(a).unwrap();
        assert_eq!(e.crack_intensity(), 0.0);
        assert_eq!(e.tier(), 1);
    }

    #[test]
    fn clear_invalidates_everything() {
        let mut s = EntityStore::new();
        let a = spawn_rock(&mut s, 0.0);
        s.clear();
        assert!(s.is_empty());
        assert!(s.get(a).is_none());
    }
}
