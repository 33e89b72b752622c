//! A cube carried along a scripted path by a fake hand. It settles on the
//! table and the floor as it passes over them.

use bevy::prelude::*;
use vr_snapping::{
    Bounds, SceneSurfaces, SnapFrame, SnapObject, SnapPose, SnapPresent, SnapPrepare, SnapSurface,
    Snapper, SnappingPlugin,
};

#[derive(Component)]
struct Hand;

#[derive(Component)]
struct Carried;

fn main() -> AppExit {
    App::new()
        .add_plugins(DefaultPlugins)
        .add_plugins(SnappingPlugin)
        .add_systems(Startup, setup)
        .add_systems(
            Update,
            (move_hand, carry_cube)
                .chain()
                .after(SnapPrepare)
                .before(SnapPresent),
        )
        .run()
}

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        Name::new("Camera"),
        Camera3d::default(),
        Transform::from_xyz(0.0, 2.5, 5.0).looking_at(Vec3::new(0.0, 0.5, 0.0), Vec3::Y),
    ));

    commands.spawn((
        Name::new("Light"),
        PointLight::default(),
        Transform::from_xyz(3.0, 5.0, 3.0),
    ));

    commands.spawn((
        Name::new("Floor"),
        SnapSurface::Plane,
        Mesh3d(meshes.add(Plane3d::default().mesh().size(10.0, 10.0))),
        MeshMaterial3d(materials.add(Color::srgb(0.3, 0.3, 0.3))),
        Transform::default(),
    ));

    let table_half = Vec3::new(0.6, 0.4, 0.6);
    commands.spawn((
        Name::new("Table"),
        SnapSurface::Box {
            half_extents: table_half,
        },
        Mesh3d(meshes.add(Cuboid::from_size(table_half * 2.0))),
        MeshMaterial3d(materials.add(Color::srgb(0.55, 0.4, 0.25))),
        Transform::from_xyz(1.0, 0.4, 0.0),
    ));

    commands.spawn((Name::new("Hand"), Hand, Transform::from_xyz(-2.0, 1.5, 0.0)));

    commands.spawn((
        Name::new("Cube"),
        Carried,
        Mesh3d(meshes.add(Cuboid::from_size(Vec3::splat(0.3)))),
        MeshMaterial3d(materials.add(Color::srgb(0.4, 0.6, 0.9))),
        Transform::from_xyz(-2.0, 1.5, 0.0),
    ));
}

/// Sweeps back and forth across the scene while bobbing down to the floor.
fn move_hand(time: Res<Time>, mut hands: Query<&mut Transform, With<Hand>>) {
    let t = time.elapsed_secs() * 0.5;
    for mut transform in &mut hands {
        transform.translation = Vec3::new(2.5 * t.sin(), 0.9 + 0.8 * (t * 1.7).cos(), 0.0);
        transform.rotation = Quat::from_rotation_y(t * 0.3);
    }
}

fn carry_cube(
    surfaces: Res<SceneSurfaces>,
    mut snapper: ResMut<Snapper>,
    hands: Query<(Entity, &Transform), (With<Hand>, Without<Carried>)>,
    mut cubes: Query<(Entity, &mut Transform), With<Carried>>,
) {
    let Ok((hand, hand_tf)) = hands.single() else {
        return;
    };
    let frame = SnapFrame::default();

    for (entity, mut transform) in &mut cubes {
        let object = SnapObject::new(
            entity,
            *transform,
            Bounds::new(Vec3::ZERO, Vec3::splat(0.15)),
        );
        let mut pose = SnapPose::from(*transform);
        let target = SnapPose::new(hand_tf.translation, hand_tf.rotation);

        if snapper.direct_snap(&*surfaces, hand, object, &mut pose, target, &frame) {
            debug!("Cube snapped at {}", pose.position);
        }
        transform.translation = pose.position;
        transform.rotation = pose.rotation;
    }
}
