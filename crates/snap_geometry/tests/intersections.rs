use std::f32::consts::FRAC_PI_4;

use bevy::prelude::*;
use snap_geometry::{Bounds, look_rotation, ray_box_intersection, ray_plane_distance};

#[test]
fn hit_on_rotated_box_lies_inside_its_world_bounds() {
    let center = Vec3::new(2.0, 1.0, -3.0);
    let half = Vec3::new(1.0, 0.25, 0.5);
    let rotation = Quat::from_rotation_y(FRAC_PI_4);
    let world = Bounds::new(Vec3::ZERO, half).transformed(center, rotation, Vec3::ONE);

    let ray = Ray3d::new(center + Vec3::new(0.0, 5.0, 0.0), Dir3::NEG_Y);
    let (distance, normal) = ray_box_intersection(ray, center, half, rotation, 10.0).unwrap();
    let hit = ray.get_point(distance);

    assert!((distance - 4.75).abs() < 1e-4);
    assert!((normal - Vec3::Y).length() < 1e-4);
    let padded = Bounds::new(world.center, world.extents + Vec3::splat(1e-4));
    assert!(padded.contains_point(hit));
}

#[test]
fn look_rotation_faces_plane_normal() {
    let normal = Vec3::new(0.0, 1.0, 1.0).normalize();
    let rotation = look_rotation(normal, Vec3::Y);
    let forward = rotation * Vec3::Z;
    assert!((forward - normal).length() < 1e-4);

    // A ray cast back along the facing direction reaches the plane through the origin
    let ray = Ray3d::new(normal * 3.0, Dir3::new(-forward).unwrap());
    let distance = ray_plane_distance(ray, normal, 0.0).unwrap();
    assert!((distance - 3.0).abs() < 1e-4);
}

#[test]
fn bounds_from_points_encloses_every_corner() {
    let source = Bounds::new(Vec3::new(0.5, -1.0, 2.0), Vec3::new(1.0, 2.0, 3.0));
    let rebuilt = Bounds::from_points(source.corners()).unwrap();
    assert!((rebuilt.center - source.center).length() < 1e-5);
    assert!((rebuilt.extents - source.extents).length() < 1e-5);
    assert!(Bounds::from_points(std::iter::empty()).is_none());
}
