//! Uniform-cell spatial hash used as the collision broad phase.

use glam::Vec2;
use rustc_hash::FxHashMap;

/// Buckets slot indices by grid cell.
///
/// Rebuilt every step: `clear()` drops every cell but keeps the table's
/// capacity, so the map only holds cells touched since the last clear.
#[derive(Debug)]
pub struct SpatialGrid {
    cell_size: f32,
    cells: FxHashMap<(i32, i32), Vec<u32>>,
}

impl SpatialGrid {
    /// `cell_size` is clamped to at least one world unit.
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() { cell_size.max(1.0) } else { 1.0 };
        Self {
            cell_size,
            cells: FxHashMap::default(),
        }
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    #[cfg(test)]
    pub(crate) fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Non-finite coordinates land in cell (0, 0) rather than poisoning the key.
    #[inline]
    pub fn cell_of(&self, p: Vec2) -> (i32, i32) {
        let x = if p.x.is_finite() { p.x } else { 0.0 };
        let y = if p.y.is_finite() { p.y } else { 0.0 };
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    /// Inserts `index` into every cell overlapped by the circle's bounding box.
    ///
    /// Queries with the querying body's own radius then find every body whose
    /// box touches it.
    pub fn insert_circle(&mut self, index: u32, center: Vec2, radius: f32) {
        let r = if radius.is_finite() { radius.max(0.0) } else { 0.0 };
        let (min_x, min_y) = self.cell_of(center - Vec2::splat(r));
        let (max_x, max_y) = self.cell_of(center + Vec2::splat(r));

        for cx in min_x..=max_x {
            for cy in min_y..=max_y {
                self.cells.entry((cx, cy)).or_default().push(index);
            }
        }
    }

    /// Appends to `out` every index stored in cells overlapping the query circle's
    /// bounding box. Callers filter by exact distance.
    pub fn query(&self, center: Vec2, radius: f32, out: &mut Vec<u32>) {
        let r = if radius.is_finite() { radius.max(0.0) } else { 0.0 };
        let (min_x, min_y) = self.cell_of(center - Vec2::splat(r));
        let (max_x, max_y) = self.cell_of(center + Vec2::splat(r));

        for cx in min_x..=max_x {
            for cy in min_y..=max_y {
                if let Some(bucket) = self.cells.get(&(cx, cy)) {
                    out.extend_from_slice(bucket);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_of_floors_negative_coordinates() {
        let g = SpatialGrid::new(10.0);
        assert_eq!(g.cell_of(Vec2::new(5.0, 5.0)), (0, 0));
        assert_eq!(g.cell_of(Vec2::new(-0.5, 15.0)), (-1, 1));
        assert_eq!(g.cell_of(Vec2::new(f32::NAN, 25.0)), (0, 2));
    }

    #[test]
    fn query_finds_neighbours_and_skips_far_cells() {
        let mut g = SpatialGrid::new(10.0);
        g.insert_circle(1, Vec2::new(1.0, 1.0), 0.0);
        g.insert_circle(2, Vec2::new(12.0, 1.0), 0.0);
        g.insert_circle(3, Vec2::new(100.0, 100.0), 0.0);

        let mut out = Vec::new();
        g.query(Vec2::new(5.0, 5.0), 8.0, &mut out);
        out.sort_unstable();
        assert_eq!(out, vec![1, 2]);
    }

    #[test]
    fn clear_empties_buckets() {
        let mut g = SpatialGrid::new(10.0);
        g.insert_circle(7, Vec2::ZERO, 0.0);
        g.clear();
        let mut out = Vec::new();
        g.query(Vec2::ZERO, 5.0, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn drifting_body_does_not_grow_the_map() {
        let mut g = SpatialGrid::new(10.0);
        for frame in 0..5000 {
            g.clear();
            g.insert_circle(0, Vec2::new(frame as f32 * 10.0, 0.0), 0.0);
        }
        assert_eq!(g.cell_count(), 1);
    }

    #[test]
    fn circle_covers_its_bounding_box() {
        let mut g = SpatialGrid::new(10.0);
        g.insert_circle(3, Vec2::new(10.0, 10.0), 4.0);
        assert_eq!(g.cell_count(), 4);

        // A point query in the far corner cell of the box still sees it.
        let mut out = Vec::new();
        g.query(Vec2::new(13.0, 13.0), 0.0, &mut out);
        assert_eq!(out, vec![3]);
    }
}
