//! Ground and surface snapping for objects dragged by pointers in a 3D scene.
//!
//! Hosts call [`Snapper::manipulator_snap`] or [`Snapper::direct_snap`] once
//! per pointer per frame from a system ordered between [`SnapPrepare`] and
//! [`SnapPresent`], and [`Snapper::clear_snapping_state`] when a drag ends.

pub mod ground;
pub mod indicators;
pub mod miniworld;
pub mod raycast;
pub mod settings;
pub mod snapper;
pub mod spatial_index;
pub mod state;
pub mod surface;

use bevy::prelude::*;
use bevy_infinite_grid::InfiniteGridPlugin;

pub use indicators::{Fade, SnapGroundPlane, WidgetPlacement, widget_placement};
pub use miniworld::MiniWorldFrame;
pub use raycast::{SceneSurfaces, SnapSurface, SurfaceHit, SurfaceRaycast};
pub use settings::{SnapSettings, SnapSettingsError, SnapSettingsPath, SnapTuning};
pub use snap_geometry::Bounds;
pub use snapper::{SnapFrame, Snapper};
pub use spatial_index::SpatialHash;
pub use state::{SnapContext, SnapObject, SnapPose, SnapStateStore};
pub use surface::{SurfaceIndicator, SurfaceSnap};

/// Settings and scene surfaces are brought up to date.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapPrepare;

/// Indicators reflect the snapping state of this frame.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapPresent;

pub struct SnappingPlugin;

impl Plugin for SnappingPlugin {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<InfiniteGridPlugin>() {
            app.add_plugins(InfiniteGridPlugin);
        }

        app.init_resource::<SnapSettings>()
            .init_resource::<SnapTuning>()
            .init_resource::<SnapSettingsPath>()
            .init_resource::<Snapper>()
            .init_resource::<SceneSurfaces>()
            .configure_sets(Update, (SnapPrepare, SnapPresent).chain())
            .add_systems(
                Startup,
                (
                    settings::load_settings_on_startup,
                    indicators::spawn_ground_plane,
                )
                    .chain(),
            )
            .add_systems(
                Update,
                (
                    settings::sync_snap_settings,
                    settings::persist_settings,
                    raycast::track_snap_surfaces,
                )
                    .in_set(SnapPrepare),
            )
            .add_systems(
                Update,
                (
                    indicators::sync_ground_plane,
                    indicators::draw_surface_widget,
                )
                    .in_set(SnapPresent),
            );
    }
}
