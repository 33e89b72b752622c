use std::collections::HashMap;

use bevy::prelude::*;
use snap_geometry::{Bounds, ray_box_intersection, ray_plane_distance};

use crate::spatial_index::SpatialHash;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceHit {
    pub entity: Entity,
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
}

/// Closest-hit ray query used by the solver. Implementations never fail;
/// "nothing hit" is `None`.
pub trait SurfaceRaycast {
    fn raycast(&self, ray: Ray3d, max_distance: f32, ignore: &[Entity]) -> Option<SurfaceHit>;
}

/// Shape a scene entity presents to snapping ray casts, in its local space.
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub enum SnapSurface {
    Box { half_extents: Vec3 },
    /// Unbounded plane through the entity origin facing its local +Y.
    /// Only hit from the front.
    Plane,
}

#[derive(Clone, Copy, Debug)]
struct PlacedSurface {
    shape: SnapSurface,
    translation: Vec3,
    rotation: Quat,
    scale: Vec3,
}

impl PlacedSurface {
    fn world_bounds(&self) -> Option<Bounds> {
        match self.shape {
            SnapSurface::Box { half_extents } => Some(
                Bounds::new(Vec3::ZERO, half_extents).transformed(
                    self.translation,
                    self.rotation,
                    self.scale,
                ),
            ),
            SnapSurface::Plane => None,
        }
    }

    fn intersect(&self, ray: Ray3d, max_distance: f32) -> Option<(f32, Vec3)> {
        match self.shape {
            SnapSurface::Box { half_extents } => ray_box_intersection(
                ray,
                self.translation,
                half_extents * self.scale.abs(),
                self.rotation,
                max_distance,
            ),
            SnapSurface::Plane => {
                let normal = self.rotation * Vec3::Y;
                if normal.dot(*ray.direction) >= 0.0 {
                    return None;
                }
                ray_plane_distance(ray, normal, normal.dot(self.translation))
                    .filter(|t| *t <= max_distance)
                    .map(|t| (t, normal))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SceneSurfaces
// ---------------------------------------------------------------------------

/// Scene-backed ray cast provider. Boxes go through the spatial hash; planes
/// are unbounded and always tested.
#[derive(Resource, Default, Debug)]
pub struct SceneSurfaces {
    hash: SpatialHash<Entity>,
    surfaces: HashMap<Entity, PlacedSurface>,
}

impl SceneSurfaces {
    pub fn with_cell_size(cell_size: f32) -> Self {
        Self {
            hash: SpatialHash::new(cell_size),
            surfaces: HashMap::new(),
        }
    }

    /// Inserts or updates a surface from its world transform.
    pub fn insert(&mut self, entity: Entity, shape: SnapSurface, transform: &Transform) {
        let placed = PlacedSurface {
            shape,
            translation: transform.translation,
            rotation: transform.rotation,
            scale: transform.scale,
        };
        match placed.world_bounds() {
            Some(bounds) => {
                if !self.hash.add_object(entity, bounds) {
                    warn!("Ignoring snap surface {entity} with non-finite bounds");
                    self.remove(entity);
                    return;
                }
            }
            None => {
                self.hash.remove_object(entity);
            }
        }
        self.surfaces.insert(entity, placed);
    }

    pub fn remove(&mut self, entity: Entity) {
        self.hash.remove_object(entity);
        self.surfaces.remove(&entity);
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.surfaces.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn spatial_hash(&self) -> &SpatialHash<Entity> {
        &self.hash
    }

    /// Entities whose box bounds touch `region`. Planes are not included.
    pub fn query_region(&self, region: &Bounds) -> Vec<Entity> {
        self.hash.query_region(region)
    }

    fn candidates(&self, ray: Ray3d, max_distance: f32) -> Vec<Entity> {
        let segment = Bounds::from_min_max(ray.origin, ray.get_point(max_distance));
        if !segment.is_finite() {
            return self.surfaces.keys().copied().collect();
        }
        let mut candidates = self.hash.query_region(&segment);
        candidates.extend(
            self.surfaces
                .iter()
                .filter(|(_, s)| matches!(s.shape, SnapSurface::Plane))
                .map(|(e, _)| *e),
        );
        candidates
    }
}

impl SurfaceRaycast for SceneSurfaces {
    fn raycast(&self, ray: Ray3d, max_distance: f32, ignore: &[Entity]) -> Option<SurfaceHit> {
        if max_distance.is_nan() || max_distance <= 0.0 || !ray.origin.is_finite() {
            return None;
        }

        let mut best: Option<SurfaceHit> = None;
        for entity in self.candidates(ray, max_distance) {
            if ignore.contains(&entity) {
                continue;
            }
            let Some(surface) = self.surfaces.get(&entity) else {
                continue;
            };
            let Some((distance, normal)) = surface.intersect(ray, max_distance) else {
                continue;
            };
            if best.is_some_and(|b| b.distance <= distance) {
                continue;
            }
            best = Some(SurfaceHit {
                entity,
                point: ray.get_point(distance),
                normal,
                distance,
            });
        }
        best
    }
}

/// Keeps `SceneSurfaces` in step with the ECS: new or moved surfaces are
/// re-inserted, removed ones dropped.
pub(crate) fn track_snap_surfaces(
    mut surfaces: ResMut<SceneSurfaces>,
    changed: Query<
        (Entity, &GlobalTransform, &SnapSurface),
        Or<(Changed<GlobalTransform>, Changed<SnapSurface>)>,
    >,
    mut removed: RemovedComponents<SnapSurface>,
) {
    for entity in removed.read() {
        surfaces.remove(entity);
    }
    for (entity, global_tf, shape) in &changed {
        surfaces.insert(entity, *shape, &global_tf.compute_transform());
    }
}
