use std::f32::consts::FRAC_PI_2;

use bevy::prelude::*;
use snap_geometry::{look_rotation, ray_plane_distance};

use crate::settings::SnapSettings;
use crate::state::{SnapContext, SnapPose};

/// Upright rotation that keeps the yaw of `rotation`.
pub fn ground_aligned_rotation(rotation: Quat) -> Quat {
    look_rotation(Vec3::Y, rotation * Vec3::NEG_Z) * Quat::from_axis_angle(Vec3::X, FRAC_PI_2)
}

/// Hysteresis ground lock. Engages once the vertical gap drops below `min`,
/// releases once it exceeds `max`, and keeps its previous mode in between.
/// Returns the snapped pose while engaged.
pub fn snap_to_ground(
    settings: &SnapSettings,
    ground_height: f32,
    context: &mut SnapContext,
    target: SnapPose,
    min: f32,
    max: f32,
) -> Option<SnapPose> {
    if !settings.ground_snapping {
        return None;
    }

    let bounds = if settings.rotation_snapping {
        context.identity_bounds()
    } else {
        context.rotated_bounds()
    };
    // Bottom of the bounds relative to the pivot
    let offset = bounds.center.y - bounds.extents.y;

    let gap = if settings.pivot_snapping {
        (target.position.y - ground_height).abs()
    } else {
        (target.position.y + offset - ground_height).abs()
    };

    if gap < min {
        context.engage_ground();
    }
    if gap > max {
        context.release_ground();
    }

    if !context.ground_snapping() {
        return None;
    }

    let mut position = target.position;
    position.y = if settings.pivot_snapping {
        ground_height
    } else {
        ground_height - offset
    };
    let rotation = if settings.rotation_snapping {
        ground_aligned_rotation(target.rotation)
    } else {
        target.rotation
    };
    Some(SnapPose::new(position, rotation))
}

/// Non-local manipulator ground lock: engages whenever the pointer ray
/// reaches the ground plane within `max_distance`, placing the pivot on the
/// hit point.
pub fn snap_to_ground_plane_ray(
    settings: &SnapSettings,
    ground_height: f32,
    context: &mut SnapContext,
    pointer_ray: Ray3d,
    target: SnapPose,
    max_distance: f32,
) -> Option<SnapPose> {
    let distance = ray_plane_distance(pointer_ray, Vec3::Y, ground_height)
        .filter(|d| *d <= max_distance);
    let Some(distance) = distance else {
        context.release_ground();
        return None;
    };

    context.engage_ground();
    let rotation = if settings.rotation_snapping {
        ground_aligned_rotation(target.rotation)
    } else {
        target.rotation
    };
    Some(SnapPose::new(pointer_ray.get_point(distance), rotation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SnapObject;
    use snap_geometry::Bounds;

    const MIN: f32 = 0.05;
    const MAX: f32 = 0.15;

    fn unit_context() -> SnapContext {
        let mut world = World::new();
        let e = world.spawn_empty().id();
        let obj = SnapObject::new(e, Transform::IDENTITY, Bounds::new(Vec3::ZERO, Vec3::splat(0.5)));
        SnapContext::new(&[obj], Vec3::ZERO, Quat::IDENTITY)
    }

    fn pivot_settings() -> SnapSettings {
        SnapSettings {
            pivot_snapping: true,
            ..default()
        }
    }

    fn at(y: f32) -> SnapPose {
        SnapPose::new(Vec3::new(0.3, y, -0.2), Quat::IDENTITY)
    }

    #[test]
    fn test_hysteresis_descending_then_rising() {
        let settings = pivot_settings();
        let mut ctx = unit_context();

        for y in [0.2, 0.1] {
            assert!(snap_to_ground(&settings, 0.0, &mut ctx, at(y), MIN, MAX).is_none());
            assert!(!ctx.ground_snapping());
        }

        let snapped = snap_to_ground(&settings, 0.0, &mut ctx, at(0.04), MIN, MAX).unwrap();
        assert!(ctx.ground_snapping());
        assert_eq!(snapped.position, Vec3::new(0.3, 0.0, -0.2));

        // Inside the band on the way back up: still locked
        let held = snap_to_ground(&settings, 0.0, &mut ctx, at(0.1), MIN, MAX).unwrap();
        assert_eq!(held.position.y, 0.0);
        assert!(ctx.ground_snapping());

        assert!(snap_to_ground(&settings, 0.0, &mut ctx, at(0.16), MIN, MAX).is_none());
        assert!(!ctx.ground_snapping());
    }

    #[test]
    fn test_bounds_mode_rests_bottom_on_ground() {
        let settings = SnapSettings::default();
        let mut ctx = unit_context();

        // Bottom of the unit cube sits 0.1 above ground: outside the engage band
        assert!(snap_to_ground(&settings, 0.0, &mut ctx, at(0.6), MIN, MAX).is_none());

        let snapped = snap_to_ground(&settings, 0.0, &mut ctx, at(0.52), MIN, MAX).unwrap();
        assert!((snapped.position.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_ground_height_offsets_result() {
        let settings = pivot_settings();
        let mut ctx = unit_context();
        let snapped = snap_to_ground(&settings, 2.0, &mut ctx, at(2.01), MIN, MAX).unwrap();
        assert_eq!(snapped.position.y, 2.0);
    }

    #[test]
    fn test_rotation_snapping_keeps_yaw() {
        let settings = SnapSettings {
            pivot_snapping: true,
            rotation_snapping: true,
            ..default()
        };
        let mut ctx = unit_context();
        let yaw = Quat::from_rotation_y(0.7);
        let tilted = yaw * Quat::from_rotation_x(0.3);
        let snapped = snap_to_ground(
            &settings,
            0.0,
            &mut ctx,
            SnapPose::new(Vec3::new(0.0, 0.01, 0.0), tilted),
            MIN,
            MAX,
        )
        .unwrap();

        assert!((snapped.rotation * Vec3::Y - Vec3::Y).length() < 1e-4);
        assert!(snapped.rotation.angle_between(yaw) < 1e-3);
    }

    #[test]
    fn test_disabled_ground_never_engages() {
        let settings = SnapSettings {
            ground_snapping: false,
            pivot_snapping: true,
            ..default()
        };
        let mut ctx = unit_context();
        assert!(snap_to_ground(&settings, 0.0, &mut ctx, at(0.0), MIN, MAX).is_none());
        assert!(!ctx.ground_snapping());
    }

    #[test]
    fn test_plane_ray_lock_and_release() {
        let settings = SnapSettings::default();
        let mut ctx = unit_context();
        let target = SnapPose::new(Vec3::new(0.0, 3.0, 0.0), Quat::IDENTITY);

        let down = Ray3d::new(Vec3::new(1.0, 2.0, 0.0), Dir3::NEG_Y);
        let pose = snap_to_ground_plane_ray(&settings, 0.0, &mut ctx, down, target, 25.0).unwrap();
        assert!((pose.position - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-5);
        assert!(ctx.ground_snapping());

        let far = Ray3d::new(Vec3::new(1.0, 30.0, 0.0), Dir3::NEG_Y);
        assert!(snap_to_ground_plane_ray(&settings, 0.0, &mut ctx, far, target, 25.0).is_none());
        assert!(!ctx.ground_snapping());
    }
}
