use std::path::{Path, PathBuf};

use bevy::{prelude::*, tasks::IoTaskPool};
use serde::{Deserialize, Serialize};

use crate::snapper::Snapper;

// ---------------------------------------------------------------------------
// Snap settings
// ---------------------------------------------------------------------------

/// User-facing snapping toggles. Read by the solver every call.
#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapSettings {
    pub enabled: bool,
    pub ground_snapping: bool,
    pub surface_snapping: bool,
    /// Snap the pivot onto the target instead of the bounds edge.
    pub pivot_snapping: bool,
    pub rotation_snapping: bool,
    /// Reject snap candidates farther than the break distance from the target.
    pub local_only: bool,
    pub manipulator_snapping: bool,
    pub direct_snapping: bool,
    pub show_widget: bool,
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ground_snapping: true,
            surface_snapping: true,
            pivot_snapping: false,
            rotation_snapping: false,
            local_only: false,
            manipulator_snapping: true,
            direct_snapping: true,
            show_widget: true,
        }
    }
}

impl SnapSettings {
    /// Snapping is on and at least one mode can engage.
    pub fn active(&self) -> bool {
        self.enabled && (self.ground_snapping || self.surface_snapping)
    }

    /// Whether switching from `self` to `other` invalidates cached contexts.
    /// Pivot, rotation, local-only and source toggles are modifiers only.
    pub fn requires_reset(&self, other: &SnapSettings) -> bool {
        self.enabled != other.enabled
            || self.ground_snapping != other.ground_snapping
            || self.surface_snapping != other.surface_snapping
    }
}

// ---------------------------------------------------------------------------
// Tuning
// ---------------------------------------------------------------------------

/// Distances are in world units at viewer scale 1 and get multiplied by the
/// viewer scale (or camera distance for manipulator break distances).
#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapTuning {
    pub ground_ray_length: f32,
    pub surface_ray_length: f32,
    pub ground_height: f32,
    pub manipulator_ground_min: f32,
    pub manipulator_ground_max: f32,
    pub manipulator_surface_break: f32,
    pub direct_search_scale: f32,
    pub direct_surface_break: f32,
    pub direct_ground_min: f32,
    pub direct_ground_max: f32,
    pub widget_scale: f32,
}

impl Default for SnapTuning {
    fn default() -> Self {
        Self {
            ground_ray_length: 25.0,
            surface_ray_length: 100.0,
            ground_height: 0.0,
            manipulator_ground_min: 0.05,
            manipulator_ground_max: 0.15,
            manipulator_surface_break: 0.1,
            direct_search_scale: 1.1,
            direct_surface_break: 0.03,
            direct_ground_min: 0.03,
            direct_ground_max: 0.07,
            widget_scale: 0.03,
        }
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SnapSettingsError {
    #[error("settings file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Location of the persisted settings file. `None` disables persistence.
#[derive(Resource, Clone, Debug)]
pub struct SnapSettingsPath(pub Option<PathBuf>);

impl Default for SnapSettingsPath {
    fn default() -> Self {
        Self(Some(PathBuf::from("snapping.json")))
    }
}

pub fn load_snap_settings(path: &Path) -> Result<SnapSettings, SnapSettingsError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

pub fn save_snap_settings(path: &Path, settings: &SnapSettings) -> Result<(), SnapSettingsError> {
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, json)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

pub(crate) fn load_settings_on_startup(
    path: Res<SnapSettingsPath>,
    mut settings: ResMut<SnapSettings>,
) {
    let Some(path) = path.0.as_deref() else {
        return;
    };
    match load_snap_settings(path) {
        Ok(loaded) => {
            info!("Snap settings loaded from {}", path.display());
            *settings = loaded;
        }
        Err(SnapSettingsError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            info!("No snap settings at {}, using defaults", path.display());
        }
        Err(err) => warn!("Failed to load snap settings from {}: {err}", path.display()),
    }
}

pub(crate) fn persist_settings(path: Res<SnapSettingsPath>, settings: Res<SnapSettings>) {
    if !settings.is_changed() || settings.is_added() {
        return;
    }
    let Some(path) = path.0.clone() else {
        return;
    };
    let settings = settings.clone();

    IoTaskPool::get()
        .spawn(async move {
            match save_snap_settings(&path, &settings) {
                Ok(()) => info!("Snap settings saved to {}", path.display()),
                Err(err) => warn!("Failed to write snap settings: {err}"),
            }
        })
        .detach();
}

/// Push the settings resource into the solver; mode changes drop cached contexts.
pub(crate) fn sync_snap_settings(
    settings: Res<SnapSettings>,
    tuning: Res<SnapTuning>,
    mut snapper: ResMut<Snapper>,
) {
    if settings.is_changed() {
        snapper.apply_settings(settings.clone());
    }
    if tuning.is_changed() {
        snapper.set_tuning(tuning.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_requires_a_mode() {
        let mut s = SnapSettings::default();
        assert!(s.active());
        s.ground_snapping = false;
        s.surface_snapping = false;
        assert!(!s.active());
        s.surface_snapping = true;
        s.enabled = false;
        assert!(!s.active());
    }

    #[test]
    fn test_modifiers_do_not_require_reset() {
        let a = SnapSettings::default();
        let mut b = a.clone();
        b.pivot_snapping = true;
        b.rotation_snapping = true;
        b.local_only = true;
        b.direct_snapping = false;
        assert!(!a.requires_reset(&b));

        b.ground_snapping = false;
        assert!(a.requires_reset(&b));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let s: SnapSettings = serde_json::from_str(r#"{ "local_only": true }"#).unwrap();
        assert!(s.local_only);
        assert!(s.enabled);
        assert!(!s.pivot_snapping);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapping.json");
        let settings = SnapSettings {
            rotation_snapping: true,
            manipulator_snapping: false,
            ..default()
        };
        save_snap_settings(&path, &settings).unwrap();
        assert_eq!(load_snap_settings(&path).unwrap(), settings);
    }

    #[test]
    fn test_load_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapping.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(load_snap_settings(&path), Err(SnapSettingsError::Json(_))));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_snap_settings(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, SnapSettingsError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
    }
}
