use std::collections::HashMap;

use bevy::prelude::*;
use snap_geometry::{Bounds, rotate_around};

/// An object taking part in a drag, with its mesh-space bounds.
#[derive(Clone, Copy, Debug)]
pub struct SnapObject {
    pub entity: Entity,
    /// World transform at the moment the object is handed to the solver.
    pub transform: Transform,
    pub local_bounds: Bounds,
}

impl SnapObject {
    pub fn new(entity: Entity, transform: Transform, local_bounds: Bounds) -> Self {
        Self {
            entity,
            transform,
            local_bounds,
        }
    }

    fn world_bounds(&self, translation: Vec3, rotation: Quat) -> Bounds {
        self.local_bounds
            .transformed(translation, rotation, self.transform.scale)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SnapPose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl SnapPose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite()
    }
}

impl From<Transform> for SnapPose {
    fn from(t: Transform) -> Self {
        Self::new(t.translation, t.rotation)
    }
}

// ---------------------------------------------------------------------------
// SnapContext
// ---------------------------------------------------------------------------

/// Per (pointer, object group) drag state. Ground and surface snapping are
/// mutually exclusive; the flags are only changed through the methods below.
#[derive(Clone, Debug)]
pub struct SnapContext {
    /// Where the drag wants to be, independent of any snapped position.
    pub current_position: Vec3,
    start_rotation: Quat,
    identity_bounds: Bounds,
    rotated_bounds: Bounds,
    ground_snapping: bool,
    surface_snapping: bool,
    members: Vec<Entity>,
}

impl SnapContext {
    /// Measures both bounds relative to `position`. A single object is
    /// measured with its rotation reset; a group is rotated backward around
    /// `position` by the inverse of `rotation`.
    pub fn new(objects: &[SnapObject], position: Vec3, rotation: Quat) -> Self {
        let mut rotated: Option<Bounds> = None;
        let mut identity: Option<Bounds> = None;

        if let [object] = objects {
            let t = object.transform;
            rotated = Some(object.world_bounds(t.translation, t.rotation));
            identity = Some(object.world_bounds(t.translation, Quat::IDENTITY));
        } else {
            let inverse = rotation.inverse();
            for object in objects {
                let t = object.transform;
                let world = object.world_bounds(t.translation, t.rotation);
                let unrotated = object.world_bounds(
                    rotate_around(t.translation, position, inverse),
                    inverse * t.rotation,
                );
                merge(&mut rotated, world);
                merge(&mut identity, unrotated);
            }
        }

        let relative = |b: Option<Bounds>| {
            b.filter(Bounds::is_finite)
                .map(|b| b.translated(-position))
                .unwrap_or_default()
        };

        Self {
            current_position: position,
            start_rotation: rotation,
            identity_bounds: relative(identity),
            rotated_bounds: relative(rotated),
            ground_snapping: false,
            surface_snapping: false,
            members: objects.iter().map(|o| o.entity).collect(),
        }
    }

    /// Whether `entity` is one of the dragged objects.
    pub fn holds(&self, entity: Entity) -> bool {
        self.members.contains(&entity)
    }

    pub fn start_rotation(&self) -> Quat {
        self.start_rotation
    }

    pub fn identity_bounds(&self) -> Bounds {
        self.identity_bounds
    }

    pub fn rotated_bounds(&self) -> Bounds {
        self.rotated_bounds
    }

    pub fn ground_snapping(&self) -> bool {
        self.ground_snapping
    }

    pub fn surface_snapping(&self) -> bool {
        self.surface_snapping
    }

    pub fn engage_ground(&mut self) {
        if !self.ground_snapping {
            debug!("Ground snap engaged");
        }
        self.ground_snapping = true;
        self.surface_snapping = false;
    }

    pub fn release_ground(&mut self) {
        if self.ground_snapping {
            debug!("Ground snap released");
        }
        self.ground_snapping = false;
    }

    /// Surface snapping takes priority and always clears ground snapping.
    pub fn engage_surface(&mut self) {
        if !self.surface_snapping {
            debug!("Surface snap engaged");
        }
        self.surface_snapping = true;
        self.ground_snapping = false;
    }

    pub fn release_surface(&mut self) {
        if self.surface_snapping {
            debug!("Surface snap released");
        }
        self.surface_snapping = false;
    }
}

fn merge(acc: &mut Option<Bounds>, bounds: Bounds) {
    match acc {
        Some(existing) => existing.encapsulate(&bounds),
        None => *acc = Some(bounds),
    }
}

// ---------------------------------------------------------------------------
// SnapStateStore
// ---------------------------------------------------------------------------

/// Contexts keyed by pointer, then by the primary (first) dragged object.
#[derive(Default, Debug)]
pub struct SnapStateStore {
    states: HashMap<Entity, HashMap<Entity, SnapContext>>,
}

impl SnapStateStore {
    /// Returns None for an empty object set.
    pub fn get_or_create(
        &mut self,
        pointer: Entity,
        objects: &[SnapObject],
        position: Vec3,
        rotation: Quat,
    ) -> Option<&mut SnapContext> {
        let primary = objects.first()?.entity;
        Some(
            self.states
                .entry(pointer)
                .or_default()
                .entry(primary)
                .or_insert_with(|| SnapContext::new(objects, position, rotation)),
        )
    }

    pub fn get(&self, pointer: Entity, primary: Entity) -> Option<&SnapContext> {
        self.states.get(&pointer)?.get(&primary)
    }

    /// Drops every context owned by `pointer` (drag ended or cancelled).
    pub fn clear(&mut self, pointer: Entity) {
        self.states.remove(&pointer);
    }

    pub fn reset_all(&mut self) {
        if !self.states.is_empty() {
            debug!("Resetting {} snapping pointer(s)", self.states.len());
        }
        self.states.clear();
    }

    pub fn contexts(&self) -> impl Iterator<Item = &SnapContext> {
        self.states.values().flat_map(|per_pointer| per_pointer.values())
    }

    pub fn len(&self) -> usize {
        self.states.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn any_ground_snapping(&self) -> bool {
        self.contexts().any(SnapContext::ground_snapping)
    }

    pub fn any_surface_snapping(&self) -> bool {
        self.contexts().any(SnapContext::surface_snapping)
    }

    /// Pointer currently dragging `entity`, alone or as part of a group.
    pub fn holder_of(&self, entity: Entity) -> Option<Entity> {
        self.states
            .iter()
            .find(|(_, per_pointer)| per_pointer.values().any(|ctx| ctx.holds(entity)))
            .map(|(pointer, _)| *pointer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn entities(n: usize) -> Vec<Entity> {
        let mut world = World::new();
        (0..n).map(|_| world.spawn_empty().id()).collect()
    }

    fn unit_object(entity: Entity, transform: Transform) -> SnapObject {
        SnapObject::new(entity, transform, Bounds::new(Vec3::ZERO, Vec3::splat(0.5)))
    }

    #[test]
    fn test_single_object_identity_bounds_ignore_rotation() {
        let e = entities(1);
        let rotation = Quat::from_rotation_y(FRAC_PI_2 * 0.5);
        let transform = Transform::from_xyz(1.0, 2.0, 3.0)
            .with_rotation(rotation)
            .with_scale(Vec3::new(1.0, 2.0, 1.0));
        let ctx = SnapContext::new(&[unit_object(e[0], transform)], transform.translation, rotation);

        let identity = ctx.identity_bounds();
        assert!(identity.center.length() < 1e-5);
        assert!((identity.extents - Vec3::new(0.5, 1.0, 0.5)).length() < 1e-5);

        let rotated = ctx.rotated_bounds();
        assert!(rotated.extents.x > 0.7);
        assert!((rotated.extents.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_group_bounds_unrotated_around_pivot() {
        let e = entities(2);
        let rotation = Quat::from_rotation_y(FRAC_PI_2);
        let pivot = Vec3::ZERO;
        // Two unit cubes side by side along X, then the whole group turned 90° about Y.
        let a = Transform::from_translation(rotation * Vec3::new(-1.0, 0.0, 0.0)).with_rotation(rotation);
        let b = Transform::from_translation(rotation * Vec3::new(1.0, 0.0, 0.0)).with_rotation(rotation);
        let objects = [unit_object(e[0], a), unit_object(e[1], b)];
        let ctx = SnapContext::new(&objects, pivot, rotation);

        let identity = ctx.identity_bounds();
        assert!((identity.extents - Vec3::new(1.5, 0.5, 0.5)).length() < 1e-4, "{identity:?}");
        let rotated = ctx.rotated_bounds();
        assert!((rotated.extents - Vec3::new(0.5, 0.5, 1.5)).length() < 1e-4, "{rotated:?}");
    }

    #[test]
    fn test_bounds_relative_to_pivot() {
        let e = entities(1);
        let t = Transform::from_xyz(0.0, 5.0, 0.0);
        let obj = SnapObject::new(e[0], t, Bounds::new(Vec3::new(0.0, 0.5, 0.0), Vec3::splat(0.5)));
        let ctx = SnapContext::new(&[obj], t.translation, Quat::IDENTITY);
        assert!((ctx.identity_bounds().center - Vec3::new(0.0, 0.5, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_modes_are_mutually_exclusive() {
        let e = entities(1);
        let mut ctx = SnapContext::new(&[unit_object(e[0], Transform::IDENTITY)], Vec3::ZERO, Quat::IDENTITY);
        ctx.engage_ground();
        assert!(ctx.ground_snapping() && !ctx.surface_snapping());
        ctx.engage_surface();
        assert!(ctx.surface_snapping() && !ctx.ground_snapping());
        ctx.engage_ground();
        assert!(ctx.ground_snapping() && !ctx.surface_snapping());
    }

    #[test]
    fn test_store_creates_once_per_pointer_and_primary() {
        let e = entities(3);
        let (pointer, obj) = (e[0], e[1]);
        let mut store = SnapStateStore::default();
        let objects = [unit_object(obj, Transform::IDENTITY)];

        store
            .get_or_create(pointer, &objects, Vec3::ZERO, Quat::IDENTITY)
            .unwrap()
            .current_position = Vec3::X;
        let again = store
            .get_or_create(pointer, &objects, Vec3::new(9.0, 9.0, 9.0), Quat::IDENTITY)
            .unwrap();
        assert_eq!(again.current_position, Vec3::X);
        assert_eq!(store.len(), 1);
        assert_eq!(store.holder_of(obj), Some(pointer));
        assert_eq!(store.holder_of(e[2]), None);
    }

    #[test]
    fn test_group_members_report_their_holder() {
        let e = entities(4);
        let (pointer, a, b, loose) = (e[0], e[1], e[2], e[3]);
        let mut store = SnapStateStore::default();
        let objects = [
            unit_object(a, Transform::IDENTITY),
            unit_object(b, Transform::from_xyz(2.0, 0.0, 0.0)),
        ];
        store.get_or_create(pointer, &objects, Vec3::ZERO, Quat::IDENTITY);

        assert_eq!(store.holder_of(a), Some(pointer));
        assert_eq!(store.holder_of(b), Some(pointer));
        assert_eq!(store.holder_of(loose), None);

        store.clear(pointer);
        assert_eq!(store.holder_of(b), None);
    }

    #[test]
    fn test_store_empty_objects_creates_nothing() {
        let e = entities(1);
        let mut store = SnapStateStore::default();
        assert!(store.get_or_create(e[0], &[], Vec3::ZERO, Quat::IDENTITY).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_clear_and_reset() {
        let e = entities(4);
        let mut store = SnapStateStore::default();
        store.get_or_create(e[0], &[unit_object(e[2], Transform::IDENTITY)], Vec3::ZERO, Quat::IDENTITY);
        store.get_or_create(e[1], &[unit_object(e[3], Transform::IDENTITY)], Vec3::ZERO, Quat::IDENTITY);
        assert_eq!(store.len(), 2);

        store.clear(e[0]);
        assert!(store.get(e[0], e[2]).is_none());
        assert!(store.get(e[1], e[3]).is_some());

        store.reset_all();
        assert!(store.is_empty());
    }
}
