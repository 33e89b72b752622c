use bevy::prelude::*;
use snap_geometry::{is_usable_scale, is_usable_scale_vec};

use crate::ground::{snap_to_ground, snap_to_ground_plane_ray};
use crate::raycast::SurfaceRaycast;
use crate::settings::{SnapSettings, SnapTuning};
use crate::state::{SnapObject, SnapPose, SnapStateStore};
use crate::surface::{
    SurfaceIndicator, SurfaceSnap, direct_snap_to_surface, manipulator_snap_to_surface,
};

/// Host-provided values for the current frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SnapFrame {
    pub viewer_scale: f32,
    pub camera_position: Vec3,
}

impl Default for SnapFrame {
    fn default() -> Self {
        Self {
            viewer_scale: 1.0,
            camera_position: Vec3::ZERO,
        }
    }
}

/// Per-pointer snapping entry points. Owns every drag context; callers drive
/// it once per pointer per frame and clear a pointer when its drag ends.
#[derive(Resource, Default, Debug)]
pub struct Snapper {
    settings: SnapSettings,
    tuning: SnapTuning,
    states: SnapStateStore,
    /// Entities every snap ray skips, e.g. the user's own controller models.
    always_ignore: Vec<Entity>,
    ignore_scratch: Vec<Entity>,
    indicator: Option<SurfaceIndicator>,
}

impl Snapper {
    pub fn new(settings: SnapSettings, tuning: SnapTuning) -> Self {
        Self {
            settings,
            tuning,
            ..default()
        }
    }

    pub fn settings(&self) -> &SnapSettings {
        &self.settings
    }

    pub fn tuning(&self) -> &SnapTuning {
        &self.tuning
    }

    pub fn states(&self) -> &SnapStateStore {
        &self.states
    }

    /// Last surface hit while some context is surface snapping.
    pub fn surface_indicator(&self) -> Option<SurfaceIndicator> {
        self.indicator.filter(|_| self.states.any_surface_snapping())
    }

    pub fn apply_settings(&mut self, settings: SnapSettings) {
        if self.settings.requires_reset(&settings) {
            self.reset();
        }
        self.settings = settings;
    }

    pub fn set_tuning(&mut self, tuning: SnapTuning) {
        self.tuning = tuning;
    }

    pub fn set_ignore_list(&mut self, entities: Vec<Entity>) {
        self.always_ignore = entities;
    }

    pub fn clear_snapping_state(&mut self, pointer: Entity) {
        self.states.clear(pointer);
    }

    pub fn reset(&mut self) {
        self.states.reset_all();
        self.indicator = None;
    }

    /// True when a pointer other than `pointer` is already dragging `entity`.
    pub fn is_held_by_other(&self, pointer: Entity, entity: Entity) -> bool {
        self.states
            .holder_of(entity)
            .is_some_and(|holder| holder != pointer)
    }

    fn build_ignore_list(&mut self, objects: &[SnapObject]) {
        self.ignore_scratch.clear();
        self.ignore_scratch.extend(objects.iter().map(|o| o.entity));
        self.ignore_scratch.extend_from_slice(&self.always_ignore);
    }

    /// Snaps a manipulator-handle drag. `delta` accumulates into the drag's
    /// virtual position; `pose` is the objects' current pose and receives the
    /// result. Returns true while a snap is active.
    pub fn manipulator_snap<R: SurfaceRaycast + ?Sized>(
        &mut self,
        raycaster: &R,
        pointer: Entity,
        pointer_ray: Ray3d,
        objects: &[SnapObject],
        pose: &mut SnapPose,
        delta: Vec3,
        frame: &SnapFrame,
    ) -> bool {
        if objects.is_empty() {
            return false;
        }
        let usable = is_usable_scale(frame.viewer_scale)
            && frame.camera_position.is_finite()
            && pose.is_finite()
            && delta.is_finite()
            && pointer_ray.origin.is_finite()
            && objects
                .iter()
                .all(|o| is_usable_scale_vec(o.transform.scale));
        if !(usable && self.settings.active() && self.settings.manipulator_snapping) {
            pose.position += delta;
            return false;
        }

        self.build_ignore_list(objects);
        let Self {
            settings,
            tuning,
            states,
            ignore_scratch,
            indicator,
            ..
        } = self;

        let Some(context) = states.get_or_create(pointer, objects, pose.position, pose.rotation)
        else {
            return false;
        };
        context.current_position += delta;
        let target = SnapPose::new(context.current_position, context.start_rotation());

        // Break distances grow with distance from the viewer
        let break_scale = frame.camera_position.distance(target.position);
        let viewer_scale = frame.viewer_scale;
        let ground_height = tuning.ground_height * viewer_scale;

        if settings.surface_snapping {
            match manipulator_snap_to_surface(
                raycaster,
                ignore_scratch,
                settings,
                context,
                pointer_ray,
                *pose,
                target,
                break_scale * tuning.manipulator_surface_break,
                tuning.surface_ray_length * viewer_scale,
            ) {
                SurfaceSnap::Snapped(snapped, hit) => {
                    *pose = snapped;
                    *indicator = Some(hit);
                    return true;
                }
                SurfaceSnap::Held => return true,
                SurfaceSnap::Released(free) => {
                    *pose = free;
                    return false;
                }
                SurfaceSnap::Miss => {}
            }
        }

        // Outside local-only mode the pointer ray locks to the ground plane
        // whenever it reaches it, whatever the ground toggle says
        let grounded = if settings.local_only {
            snap_to_ground(
                settings,
                ground_height,
                context,
                target,
                break_scale * tuning.manipulator_ground_min,
                break_scale * tuning.manipulator_ground_max,
            )
        } else {
            snap_to_ground_plane_ray(
                settings,
                ground_height,
                context,
                pointer_ray,
                target,
                tuning.ground_ray_length * viewer_scale,
            )
        };

        match grounded {
            Some(snapped) => {
                *pose = snapped;
                true
            }
            None => {
                *pose = target;
                false
            }
        }
    }

    /// Snaps an object held directly in the hand. `pose` is the object's
    /// current pose, `target` where the hand would put it.
    pub fn direct_snap<R: SurfaceRaycast + ?Sized>(
        &mut self,
        raycaster: &R,
        pointer: Entity,
        object: SnapObject,
        pose: &mut SnapPose,
        target: SnapPose,
        frame: &SnapFrame,
    ) -> bool {
        let usable = is_usable_scale(frame.viewer_scale)
            && is_usable_scale_vec(object.transform.scale)
            && pose.is_finite()
            && target.is_finite();
        if !(usable && self.settings.active() && self.settings.direct_snapping) {
            *pose = target;
            return false;
        }

        let objects = [object];
        self.build_ignore_list(&objects);
        let Self {
            settings,
            tuning,
            states,
            ignore_scratch,
            indicator,
            ..
        } = self;

        let Some(context) = states.get_or_create(pointer, &objects, pose.position, pose.rotation)
        else {
            return false;
        };
        context.current_position = target.position;

        let viewer_scale = frame.viewer_scale;
        let break_distance = viewer_scale * tuning.direct_surface_break;

        if settings.surface_snapping {
            match direct_snap_to_surface(
                raycaster,
                ignore_scratch,
                settings,
                context,
                *pose,
                target,
                break_distance,
                tuning.direct_search_scale,
            ) {
                SurfaceSnap::Snapped(snapped, hit) => {
                    *pose = snapped;
                    *indicator = Some(hit);
                    return true;
                }
                SurfaceSnap::Held => return true,
                SurfaceSnap::Released(free) => {
                    *pose = free;
                    return false;
                }
                SurfaceSnap::Miss => {}
            }
        }

        if let Some(snapped) = snap_to_ground(
            settings,
            tuning.ground_height * viewer_scale,
            context,
            target,
            viewer_scale * tuning.direct_ground_min,
            viewer_scale * tuning.direct_ground_max,
        ) {
            *pose = snapped;
            return true;
        }

        *pose = target;
        false
    }
}
