use std::collections::HashMap;
use std::hash::Hash;

use bevy::prelude::*;
use snap_geometry::Bounds;

pub const DEFAULT_CELL_SIZE: f32 = 1.0;

/// Coarse spatial hash. Every object lives in exactly one bucket, the cell of
/// its bounds center; region queries widen by the largest half extent ever
/// inserted so objects straddling cells are still found.
#[derive(Debug, Clone)]
pub struct SpatialHash<T> {
    cell_size: f32,
    cells: HashMap<IVec3, Vec<T>>,
    locations: HashMap<T, (IVec3, Bounds)>,
    max_half_extent: f32,
}

impl<T: Copy + Eq + Hash> Default for SpatialHash<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}

impl<T: Copy + Eq + Hash> SpatialHash<T> {
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            DEFAULT_CELL_SIZE
        };
        Self {
            cell_size,
            cells: HashMap::new(),
            locations: HashMap::new(),
            max_half_extent: 0.0,
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    fn cell_of(&self, point: Vec3) -> IVec3 {
        (point / self.cell_size).floor().as_ivec3()
    }

    /// Inserts or moves `object`. Non-finite bounds are rejected.
    pub fn add_object(&mut self, object: T, bounds: Bounds) -> bool {
        if !bounds.is_finite() {
            return false;
        }
        self.remove_object(object);

        let cell = self.cell_of(bounds.center);
        self.cells.entry(cell).or_default().push(object);
        self.locations.insert(object, (cell, bounds));
        self.max_half_extent = self.max_half_extent.max(bounds.extents.max_element());
        true
    }

    pub fn remove_object(&mut self, object: T) -> bool {
        let Some((cell, bounds)) = self.locations.remove(&object) else {
            return false;
        };
        if let Some(bucket) = self.cells.get_mut(&cell) {
            bucket.retain(|o| *o != object);
            if bucket.is_empty() {
                self.cells.remove(&cell);
            }
        }
        if bounds.extents.max_element() >= self.max_half_extent {
            self.max_half_extent = self
                .locations
                .values()
                .map(|(_, b)| b.extents.max_element())
                .fold(0.0, f32::max);
        }
        true
    }

    /// Largest half extent among stored objects; queries widen by this much.
    pub fn max_half_extent(&self) -> f32 {
        self.max_half_extent
    }

    /// Re-buckets an object whose bounds changed.
    pub fn refresh(&mut self, object: T, bounds: Bounds) -> bool {
        self.add_object(object, bounds)
    }

    /// Objects whose stored bounds intersect `region`.
    pub fn query_region(&self, region: &Bounds) -> Vec<T> {
        let mut found = Vec::new();
        if !region.is_finite() || self.locations.is_empty() {
            return found;
        }

        let widen = Vec3::splat(self.max_half_extent);
        let lo = self.cell_of(region.min() - widen);
        let hi = self.cell_of(region.max() + widen);
        let span = hi.as_i64vec3() - lo.as_i64vec3() + 1;
        let cell_count = span.x.saturating_mul(span.y).saturating_mul(span.z);

        let mut visit = |bucket: &Vec<T>| {
            for object in bucket {
                if let Some((_, bounds)) = self.locations.get(object) {
                    if bounds.intersects(region) {
                        found.push(*object);
                    }
                }
            }
        };

        // Large regions walk the occupied buckets instead of every cell in range
        if cell_count > self.cells.len() as i64 {
            for (cell, bucket) in &self.cells {
                if cell.cmpge(lo).all() && cell.cmple(hi).all() {
                    visit(bucket);
                }
            }
        } else {
            for x in lo.x..=hi.x {
                for y in lo.y..=hi.y {
                    for z in lo.z..=hi.z {
                        if let Some(bucket) = self.cells.get(&IVec3::new(x, y, z)) {
                            visit(bucket);
                        }
                    }
                }
            }
        }
        found
    }

    pub fn contains(&self, object: T) -> bool {
        self.locations.contains_key(&object)
    }

    pub fn bucket_of(&self, object: T) -> Option<IVec3> {
        self.locations.get(&object).map(|(cell, _)| *cell)
    }

    pub fn bounds_of(&self, object: T) -> Option<Bounds> {
        self.locations.get(&object).map(|(_, bounds)| *bounds)
    }

    pub fn all_objects(&self) -> impl Iterator<Item = T> + '_ {
        self.locations.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.locations.clear();
        self.max_half_extent = 0.0;
    }
}
