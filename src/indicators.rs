use bevy::prelude::*;
use bevy_infinite_grid::{InfiniteGrid, InfiniteGridSettings};
use snap_geometry::look_rotation;

use crate::snapper::Snapper;
use crate::surface::SurfaceIndicator;

/// Seconds-inverse rate the ground plane fades at.
const GROUND_FADE_RATE: f32 = 4.0;
const GROUND_MAJOR_COLOR: Color = Color::srgb(0.35, 0.75, 1.0);
const GROUND_MINOR_COLOR: Color = Color::srgb(0.2, 0.45, 0.6);
const GROUND_FADEOUT_DISTANCE: f32 = 30.0;

const WIDGET_COLOR: Color = Color::srgb(0.35, 0.75, 1.0);

/// The grid shown while something is ground snapped.
#[derive(Component)]
pub struct SnapGroundPlane;

/// Linear tween toward a target value, advanced once per frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fade {
    pub value: f32,
    pub target: f32,
    /// Units per second.
    pub rate: f32,
}

impl Default for Fade {
    fn default() -> Self {
        Self {
            value: 0.0,
            target: 0.0,
            rate: GROUND_FADE_RATE,
        }
    }
}

impl Fade {
    pub fn set_target(&mut self, target: f32) {
        self.target = target.clamp(0.0, 1.0);
    }

    pub fn is_settled(&self) -> bool {
        self.value == self.target
    }

    /// Moves `value` toward `target`. Returns whether it changed.
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.is_settled() {
            return false;
        }
        let step = (self.rate * dt.max(0.0)).max(0.0);
        let remaining = self.target - self.value;
        self.value = if remaining.abs() <= step {
            self.target
        } else {
            self.value + step * remaining.signum()
        };
        true
    }
}

pub(crate) fn spawn_ground_plane(mut commands: Commands, snapper: Res<Snapper>) {
    commands.spawn((
        Name::new("Snap Ground Plane"),
        InfiniteGrid,
        SnapGroundPlane,
        InfiniteGridSettings {
            major_line_color: GROUND_MAJOR_COLOR.with_alpha(0.0),
            minor_line_color: GROUND_MINOR_COLOR.with_alpha(0.0),
            fadeout_distance: GROUND_FADEOUT_DISTANCE,
            ..default()
        },
        Transform::from_xyz(0.0, snapper.tuning().ground_height, 0.0),
        Visibility::Hidden,
    ));
}

/// Fades the ground plane in while any context is ground snapped.
pub(crate) fn sync_ground_plane(
    time: Res<Time>,
    snapper: Res<Snapper>,
    mut fade: Local<Fade>,
    mut planes: Query<
        (&mut InfiniteGridSettings, &mut Visibility, &mut Transform),
        With<SnapGroundPlane>,
    >,
) {
    let active = snapper.settings().enabled && snapper.states().any_ground_snapping();
    fade.set_target(if active { 1.0 } else { 0.0 });
    if !fade.tick(time.delta_secs()) && !snapper.is_changed() {
        return;
    }

    let alpha = fade.value;
    for (mut grid, mut visibility, mut transform) in &mut planes {
        grid.major_line_color = GROUND_MAJOR_COLOR.with_alpha(alpha);
        grid.minor_line_color = GROUND_MINOR_COLOR.with_alpha(alpha * 0.5);
        transform.translation.y = snapper.tuning().ground_height;
        *visibility = if alpha > 0.0 {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
    }
}

/// Where and how large to draw the surface widget.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WidgetPlacement {
    pub center: Vec3,
    /// Ring plane faces the surface normal (local +Z); local +Y follows the
    /// snapped rotation.
    pub rotation: Quat,
    pub size: f32,
}

/// Widget for `indicator`, sized by the camera distance to the snapped
/// position so it stays a constant size on screen.
pub fn widget_placement(
    indicator: &SurfaceIndicator,
    camera_position: Vec3,
    widget_scale: f32,
) -> Option<WidgetPlacement> {
    let normal = indicator.normal.try_normalize()?;
    let size = widget_scale * camera_position.distance(indicator.position);
    if !size.is_finite() || size <= 0.0 {
        return None;
    }
    // Lift off the surface to avoid z-fighting
    let center = indicator.hit_point + normal * size * 0.05;
    let rotation = look_rotation(normal, indicator.rotation * Vec3::Y);
    Some(WidgetPlacement {
        center,
        rotation,
        size,
    })
}

/// Ring, orientation tick and normal arrow at the last surface hit.
pub(crate) fn draw_surface_widget(
    snapper: Res<Snapper>,
    cameras: Query<&GlobalTransform, With<Camera3d>>,
    mut gizmos: Gizmos,
) {
    if !snapper.settings().show_widget {
        return;
    }
    let Some(indicator) = snapper.surface_indicator() else {
        return;
    };
    let Some(camera) = cameras.iter().next() else {
        return;
    };
    let Some(widget) =
        widget_placement(&indicator, camera.translation(), snapper.tuning().widget_scale)
    else {
        return;
    };

    let normal = widget.rotation * Vec3::Z;
    let up = widget.rotation * Vec3::Y;
    gizmos.circle(
        Isometry3d::new(widget.center, widget.rotation),
        widget.size,
        WIDGET_COLOR,
    );
    gizmos.line(
        widget.center + up * widget.size * 0.5,
        widget.center + up * widget.size,
        WIDGET_COLOR,
    );
    gizmos.arrow(
        widget.center,
        widget.center + normal * widget.size * 2.0,
        WIDGET_COLOR,
    );
}
