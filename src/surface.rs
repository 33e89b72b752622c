use std::f32::consts::{FRAC_PI_2, PI};

use bevy::prelude::*;
use snap_geometry::{look_rotation, project_onto};

use crate::raycast::SurfaceRaycast;
use crate::settings::SnapSettings;
use crate::state::{SnapContext, SnapPose};

/// Last successful surface hit, kept for the snapping widget.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceIndicator {
    pub hit_point: Vec3,
    pub normal: Vec3,
    pub position: Vec3,
    /// Rotation the object would take with rotation snapping on.
    pub rotation: Quat,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SurfaceSnap {
    /// A probe found a surface this frame.
    Snapped(SnapPose, SurfaceIndicator),
    /// No new hit, but the previous snap is within break distance.
    Held,
    /// The previous snap broke; the pose is the free target.
    Released(SnapPose),
    Miss,
}

/// One ray cast attempt and how to place the object if it hits.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceProbe {
    pub ray: Ray3d,
    /// Pivot offset from the contact point, in the object's local frame.
    pub bounds_offset: Vec3,
    /// Aligns the object's canonical orientation to the probed face.
    pub rotation_offset: Quat,
    pub up_vector: Vec3,
    pub max_distance: f32,
}

struct ProbeDirection {
    direction: Vec3,
    up: Vec3,
    rotation_offset: Quat,
}

/// The six bounding box faces in probe order. The first hit wins, so a face
/// earlier in the list beats one later in it.
fn probe_directions() -> [ProbeDirection; 6] {
    [
        ProbeDirection {
            direction: Vec3::NEG_Y,
            up: Vec3::NEG_Z,
            rotation_offset: Quat::from_axis_angle(Vec3::X, FRAC_PI_2),
        },
        ProbeDirection {
            direction: Vec3::NEG_X,
            up: Vec3::Y,
            rotation_offset: Quat::from_axis_angle(Vec3::NEG_Y, FRAC_PI_2),
        },
        ProbeDirection {
            direction: Vec3::NEG_Z,
            up: Vec3::Y,
            rotation_offset: Quat::IDENTITY,
        },
        ProbeDirection {
            direction: Vec3::X,
            up: Vec3::Y,
            rotation_offset: Quat::from_axis_angle(Vec3::Y, FRAC_PI_2),
        },
        ProbeDirection {
            direction: Vec3::Z,
            up: Vec3::Y,
            rotation_offset: Quat::from_axis_angle(Vec3::Y, PI),
        },
        ProbeDirection {
            direction: Vec3::Y,
            up: Vec3::Z,
            rotation_offset: Quat::from_axis_angle(Vec3::NEG_X, FRAC_PI_2),
        },
    ]
}

/// Casts a single probe. On an accepted hit the context switches to surface
/// snapping. `current` is the pose the object has right now.
pub fn snap_to_surface<R: SurfaceRaycast + ?Sized>(
    raycaster: &R,
    ignore: &[Entity],
    settings: &SnapSettings,
    context: &mut SnapContext,
    probe: &SurfaceProbe,
    current: SnapPose,
    target: SnapPose,
    break_distance: f32,
) -> Option<(SnapPose, SurfaceIndicator)> {
    let hit = raycaster.raycast(probe.ray, probe.max_distance, ignore)?;

    let snapped_rotation = look_rotation(hit.normal, probe.up_vector) * probe.rotation_offset;
    let position = if settings.pivot_snapping {
        hit.point
    } else {
        hit.point + current.rotation * probe.bounds_offset
    };

    if settings.local_only && position.distance(target.position) > break_distance {
        return None;
    }

    context.engage_surface();
    let rotation = if settings.rotation_snapping {
        snapped_rotation
    } else {
        target.rotation
    };
    let indicator = SurfaceIndicator {
        hit_point: hit.point,
        normal: hit.normal,
        position,
        rotation: snapped_rotation,
    };
    Some((SnapPose::new(position, rotation), indicator))
}

/// Keeps an existing surface snap until the free target drifts more than
/// `break_distance` from the snapped pose.
pub fn try_break_surface_snap(
    context: &mut SnapContext,
    current: SnapPose,
    target: SnapPose,
    break_distance: f32,
) -> SurfaceSnap {
    if !context.surface_snapping() {
        return SurfaceSnap::Miss;
    }
    if current.position.distance(target.position) > break_distance {
        context.release_surface();
        return SurfaceSnap::Released(target);
    }
    SurfaceSnap::Held
}

/// Manipulator drags probe along the pointer ray and land the bottom of the
/// unrotated bounds on whatever it hits.
pub fn manipulator_snap_to_surface<R: SurfaceRaycast + ?Sized>(
    raycaster: &R,
    ignore: &[Entity],
    settings: &SnapSettings,
    context: &mut SnapContext,
    pointer_ray: Ray3d,
    current: SnapPose,
    target: SnapPose,
    break_distance: f32,
    max_ray_length: f32,
) -> SurfaceSnap {
    let bounds = context.identity_bounds();
    let probe = SurfaceProbe {
        ray: pointer_ray,
        bounds_offset: project_onto(bounds.extents, Vec3::NEG_Y) - bounds.center,
        rotation_offset: Quat::from_axis_angle(Vec3::X, FRAC_PI_2),
        up_vector: context.start_rotation() * Vec3::NEG_Z,
        max_distance: max_ray_length,
    };

    if let Some((pose, indicator)) = snap_to_surface(
        raycaster,
        ignore,
        settings,
        context,
        &probe,
        current,
        target,
        break_distance,
    ) {
        return SurfaceSnap::Snapped(pose, indicator);
    }
    try_break_surface_snap(context, current, target, break_distance)
}

/// Direct grabs probe outward from every face of the held object's bounds,
/// so whichever face is nearest a surface lands flush against it.
pub fn direct_snap_to_surface<R: SurfaceRaycast + ?Sized>(
    raycaster: &R,
    ignore: &[Entity],
    settings: &SnapSettings,
    context: &mut SnapContext,
    current: SnapPose,
    target: SnapPose,
    break_distance: f32,
    search_scale: f32,
) -> SurfaceSnap {
    let bounds = context.identity_bounds();
    let origin = target.position + target.rotation * bounds.center;

    for face in probe_directions() {
        let Ok(direction) = Dir3::new(target.rotation * face.direction) else {
            continue;
        };
        let extent = bounds.extents.dot(face.direction).abs();
        let probe = SurfaceProbe {
            ray: Ray3d::new(origin, direction),
            bounds_offset: -bounds.center - face.direction * extent,
            rotation_offset: face.rotation_offset,
            up_vector: target.rotation * face.up,
            max_distance: extent * search_scale,
        };

        if let Some((pose, indicator)) = snap_to_surface(
            raycaster,
            ignore,
            settings,
            context,
            &probe,
            current,
            target,
            break_distance,
        ) {
            return SurfaceSnap::Snapped(pose, indicator);
        }
    }

    try_break_surface_snap(context, current, target, break_distance)
}
