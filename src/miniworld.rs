use bevy::prelude::*;
use snap_geometry::{Bounds, is_usable_scale};

/// A scaled-down view of the scene. `miniature` is the world transform of the
/// miniature root, `reference` the full-size region it shows.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MiniWorldFrame {
    pub reference: Transform,
    pub miniature: Transform,
    /// Bounds of the miniature volume in its own local space.
    pub local_bounds: Bounds,
}

impl MiniWorldFrame {
    pub fn new(reference: Transform, miniature: Transform, local_bounds: Bounds) -> Self {
        Self {
            reference,
            miniature,
            local_bounds,
        }
    }

    fn inverse_scale(&self) -> Option<Vec3> {
        let inverse = self.miniature.scale.recip();
        inverse.is_finite().then_some(inverse)
    }

    fn to_miniature_local(&self, point: Vec3, inverse_scale: Vec3) -> Vec3 {
        self.miniature.rotation.inverse() * (point - self.miniature.translation) * inverse_scale
    }

    /// Maps a pointer pose inside the miniature to the matching pose in the
    /// full-size scene. `None` when the miniature is scaled to a degenerate
    /// size.
    pub fn to_reference_pointer(&self, pointer: Transform) -> Option<Transform> {
        let inverse_scale = self.inverse_scale()?;
        let local = self.to_miniature_local(pointer.translation, inverse_scale);
        let result = Transform {
            translation: self.reference.transform_point(local),
            rotation: self.reference.rotation
                * self.miniature.rotation.inverse()
                * pointer.rotation,
            scale: inverse_scale * self.reference.scale,
        };
        let finite = result.translation.is_finite()
            && result.rotation.is_finite()
            && result.scale.is_finite();
        finite.then_some(result)
    }

    /// Whether a world point lies inside the miniature volume.
    pub fn contains(&self, point: Vec3) -> bool {
        self.inverse_scale().is_some_and(|inverse_scale| {
            self.local_bounds
                .contains_point(self.to_miniature_local(point, inverse_scale))
        })
    }

    /// Viewer scale to snap with for a pointer mapped through this frame.
    /// Shrinking the miniature grows every snap distance.
    pub fn viewer_scale(&self, viewer_scale: f32) -> Option<f32> {
        let inverse_scale = self.inverse_scale()?;
        let axis = self.reference.rotation * (inverse_scale * self.reference.scale);
        let scale = viewer_scale * axis.x.abs();
        is_usable_scale(scale).then_some(scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn tenth_scale_frame() -> MiniWorldFrame {
        MiniWorldFrame::new(
            Transform::from_xyz(100.0, 0.0, 0.0),
            Transform::from_xyz(0.0, 1.0, 0.0).with_scale(Vec3::splat(0.1)),
            Bounds::new(Vec3::ZERO, Vec3::splat(5.0)),
        )
    }

    #[test]
    fn test_pointer_maps_into_reference_space() {
        let frame = tenth_scale_frame();
        let pointer = Transform::from_xyz(0.2, 1.3, 0.0);
        let mapped = frame.to_reference_pointer(pointer).unwrap();
        assert!((mapped.translation - Vec3::new(102.0, 3.0, 0.0)).length() < 1e-4);
        assert!((mapped.scale - Vec3::splat(10.0)).length() < 1e-4);
    }

    #[test]
    fn test_rotated_miniature_unrotates_pointer() {
        let mut frame = tenth_scale_frame();
        frame.miniature.rotation = Quat::from_rotation_y(FRAC_PI_2);
        let pointer = Transform::from_xyz(0.0, 1.0, 0.0).with_rotation(Quat::from_rotation_y(FRAC_PI_2));
        let mapped = frame.to_reference_pointer(pointer).unwrap();
        assert!(mapped.rotation.angle_between(Quat::IDENTITY) < 1e-4);
        assert!((mapped.translation - Vec3::new(100.0, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_degenerate_miniature_scale_rejected() {
        let mut frame = tenth_scale_frame();
        frame.miniature.scale = Vec3::new(0.0, 1.0, 1.0);
        assert!(frame.to_reference_pointer(Transform::IDENTITY).is_none());
        assert!(!frame.contains(Vec3::ZERO));
        assert!(frame.viewer_scale(1.0).is_none());
    }

    #[test]
    fn test_contains_uses_local_bounds() {
        let frame = tenth_scale_frame();
        assert!(frame.contains(Vec3::new(0.4, 1.4, -0.4)));
        assert!(!frame.contains(Vec3::new(0.6, 1.0, 0.0)));
    }

    #[test]
    fn test_viewer_scale_grows_as_miniature_shrinks() {
        let frame = tenth_scale_frame();
        assert!((frame.viewer_scale(1.0).unwrap() - 10.0).abs() < 1e-4);
        assert!((frame.viewer_scale(0.5).unwrap() - 5.0).abs() < 1e-4);
    }
}
