use bevy::prelude::*;

pub const EPSILON: f32 = 1e-4;

/// Smallest scale factor snapping math will accept. Anything closer to zero
/// (or non-finite) produces NaNs once inverted.
pub const MIN_USABLE_SCALE: f32 = 1e-6;

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

/// Axis-aligned box stored as center + half extents.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Bounds {
    pub center: Vec3,
    pub extents: Vec3,
}

impl Bounds {
    pub fn new(center: Vec3, extents: Vec3) -> Self {
        Self {
            center,
            extents: extents.abs(),
        }
    }

    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        let lo = min.min(max);
        let hi = min.max(max);
        Self {
            center: (lo + hi) * 0.5,
            extents: (hi - lo) * 0.5,
        }
    }

    /// Smallest box containing every point. Returns None for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        Some(Self::from_min_max(min, max))
    }

    pub fn min(&self) -> Vec3 {
        self.center - self.extents
    }

    pub fn max(&self) -> Vec3 {
        self.center + self.extents
    }

    pub fn size(&self) -> Vec3 {
        self.extents * 2.0
    }

    pub fn is_finite(&self) -> bool {
        self.center.is_finite() && self.extents.is_finite()
    }

    pub fn encapsulate_point(&mut self, point: Vec3) {
        *self = Self::from_min_max(self.min().min(point), self.max().max(point));
    }

    pub fn encapsulate(&mut self, other: &Bounds) {
        *self = Self::from_min_max(self.min().min(other.min()), self.max().max(other.max()));
    }

    /// Touching boxes count as intersecting.
    pub fn intersects(&self, other: &Bounds) -> bool {
        let a_min = self.min();
        let a_max = self.max();
        let b_min = other.min();
        let b_max = other.max();
        a_min.x <= b_max.x
            && a_max.x >= b_min.x
            && a_min.y <= b_max.y
            && a_max.y >= b_min.y
            && a_min.z <= b_max.z
            && a_max.z >= b_min.z
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        let d = (point - self.center).abs();
        d.x <= self.extents.x && d.y <= self.extents.y && d.z <= self.extents.z
    }

    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            center: self.center + offset,
            extents: self.extents,
        }
    }

    /// World-space AABB of this (local-space) box under a TRS transform.
    pub fn transformed(&self, translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for corner in self.corners() {
            let p = translation + rotation * (scale * corner);
            min = min.min(p);
            max = max.max(p);
        }
        Self::from_min_max(min, max)
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let c = self.center;
        let e = self.extents;
        [
            c + Vec3::new(-e.x, -e.y, -e.z),
            c + Vec3::new(e.x, -e.y, -e.z),
            c + Vec3::new(-e.x, e.y, -e.z),
            c + Vec3::new(e.x, e.y, -e.z),
            c + Vec3::new(-e.x, -e.y, e.z),
            c + Vec3::new(e.x, -e.y, e.z),
            c + Vec3::new(-e.x, e.y, e.z),
            c + Vec3::new(e.x, e.y, e.z),
        ]
    }
}

// ---------------------------------------------------------------------------
// Vector / rotation helpers
// ---------------------------------------------------------------------------

/// Projection of `v` onto `normal`. Zero when `normal` is degenerate.
pub fn project_onto(v: Vec3, normal: Vec3) -> Vec3 {
    let sq = normal.length_squared();
    if sq < EPSILON * EPSILON {
        return Vec3::ZERO;
    }
    normal * (v.dot(normal) / sq)
}

/// Rotation that maps +Z onto `forward` and +Y as close as possible onto `up`.
pub fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    let Some(forward) = forward.try_normalize() else {
        return Quat::IDENTITY;
    };
    let Some(right) = up.cross(forward).try_normalize() else {
        // `up` parallel to `forward`, no roll reference available
        return Quat::from_rotation_arc(Vec3::Z, forward);
    };
    let up = forward.cross(right);
    Quat::from_mat3(&Mat3::from_cols(right, up, forward))
}

pub fn rotate_around(point: Vec3, pivot: Vec3, rotation: Quat) -> Vec3 {
    pivot + rotation * (point - pivot)
}

pub fn is_usable_scale(scale: f32) -> bool {
    scale.is_finite() && scale.abs() > MIN_USABLE_SCALE
}

pub fn is_usable_scale_vec(scale: Vec3) -> bool {
    is_usable_scale(scale.x) && is_usable_scale(scale.y) && is_usable_scale(scale.z)
}

// ---------------------------------------------------------------------------
// Ray intersection
// ---------------------------------------------------------------------------

/// Distance along `ray` to the plane `dot(normal, p) = height`.
/// Only hits strictly in front of the origin count.
pub fn ray_plane_distance(ray: Ray3d, normal: Vec3, height: f32) -> Option<f32> {
    let direction = *ray.direction;
    let denom = normal.dot(direction);
    if denom.abs() < EPSILON {
        return None;
    }
    let t = (height - normal.dot(ray.origin)) / denom;
    (t > 0.0 && t.is_finite()).then_some(t)
}

/// Slab test against an oriented box. Returns the entry distance and the
/// outward normal of the entered face. A ray starting inside the box misses.
pub fn ray_box_intersection(
    ray: Ray3d,
    center: Vec3,
    half_extents: Vec3,
    rotation: Quat,
    max_distance: f32,
) -> Option<(f32, Vec3)> {
    let inverse = rotation.inverse();
    let origin = inverse * (ray.origin - center);
    let direction = inverse * *ray.direction;

    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut enter_axis = 0;
    let mut enter_sign = 0.0;

    for axis in 0..3 {
        let o = origin[axis];
        let d = direction[axis];
        let h = half_extents[axis].abs();

        if d.abs() < EPSILON {
            if o < -h || o > h {
                return None;
            }
            continue;
        }

        let t_neg = (-h - o) / d;
        let t_pos = (h - o) / d;
        let (near, far, sign) = if t_neg < t_pos {
            (t_neg, t_pos, -1.0)
        } else {
            (t_pos, t_neg, 1.0)
        };

        if near > t_enter {
            t_enter = near;
            enter_axis = axis;
            enter_sign = sign;
        }
        t_exit = t_exit.min(far);
        if t_enter > t_exit {
            return None;
        }
    }

    if !t_enter.is_finite() || t_enter < 0.0 || t_enter > max_distance {
        return None;
    }

    let mut normal = Vec3::ZERO;
    normal[enter_axis] = enter_sign;
    Some((t_enter, rotation * normal))
}
