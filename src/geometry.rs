//! Geometry utilities for spline mesh placement.

use bevy::prelude::*;

use crate::rotation::RotationAxis;

/// Vertical axis of the spline's local space. Terrain is probed along `-UP`.
pub const UP: Vec3 = Vec3::Y;

/// A local coordinate frame defined by tangent, right, and up vectors.
///
/// Used to bend mesh vertices along a spline segment. The frame is
/// constructed from a tangent direction with automatic handling of
/// degenerate cases (e.g., when tangent is parallel to the preferred up).
#[derive(Debug, Clone, Copy)]
pub struct CoordinateFrame {
    /// The tangent (forward along spline) direction.
    pub tangent: Vec3,
    /// The right direction (perpendicular to tangent and up).
    pub right: Vec3,
    /// The corrected up direction (perpendicular to tangent and right).
    pub up: Vec3,
}

impl CoordinateFrame {
    /// Build a coordinate frame from a tangent direction using Y-up convention.
    pub fn from_tangent(tangent: Vec3) -> Self {
        Self::from_tangent_with_up(tangent, Vec3::Y)
    }

    /// Build a coordinate frame from a tangent and preferred up direction.
    ///
    /// The actual up vector may differ from `preferred_up` to maintain
    /// orthogonality with the tangent.
    pub fn from_tangent_with_up(tangent: Vec3, preferred_up: Vec3) -> Self {
        let tangent = tangent.normalize_or_zero();

        let right = tangent.cross(preferred_up).normalize_or_zero();
        let up = right.cross(tangent).normalize_or_zero();

        // Handle degenerate case: tangent parallel to preferred_up
        let (right, up) = if right.length_squared() < 0.001 {
            let right = tangent.cross(Vec3::X).normalize_or_zero();
            let up = right.cross(tangent).normalize_or_zero();
            (right, up)
        } else {
            (right, up)
        };

        Self { tangent, right, up }
    }

    /// Roll the frame around its tangent by `angle` radians.
    pub fn rolled(&self, angle: f32) -> Self {
        if angle == 0.0 || self.tangent == Vec3::ZERO {
            return *self;
        }
        let rotation = Quat::from_axis_angle(self.tangent, angle);
        Self {
            tangent: self.tangent,
            right: rotation * self.right,
            up: rotation * self.up,
        }
    }

    /// Transform a mesh-local direction where X is forward, Y is up and Z is right.
    pub fn transform_direction(&self, local: Vec3) -> Vec3 {
        self.tangent * local.x + self.up * local.y + self.right * local.z
    }

    /// Get the world offset for a local 2D point in the cross-section plane.
    ///
    /// `local_right` follows the frame's right axis, `local_up` its up axis.
    pub fn transform_profile_point(&self, local_right: f32, local_up: f32) -> Vec3 {
        self.right * local_right + self.up * local_up
    }
}

/// Unit direction of a segment rotated by `angle_degrees` around `axis`.
///
/// X yields `(0, -cos θ, sin θ)`, Y yields `(cos θ, 0, sin θ)` and
/// Z yields `(cos θ, sin θ, 0)`.
pub fn rotation_vector(axis: RotationAxis, angle_degrees: f32) -> Vec3 {
    let angle = angle_degrees.to_radians();
    let (sin, cos) = angle.sin_cos();
    match axis {
        RotationAxis::X => Vec3::new(0.0, -cos, sin),
        RotationAxis::Y => Vec3::new(cos, 0.0, sin),
        RotationAxis::Z => Vec3::new(cos, sin, 0.0),
    }
}

/// Clamp a tangent's magnitude to `[0, max_length]`.
pub fn clamp_tangent(tangent: Vec3, max_length: f32) -> Vec3 {
    tangent.clamp_length_max(max_length.max(0.0))
}

/// Point halfway between `a` and `b`.
pub fn midpoint(a: Vec3, b: Vec3) -> Vec3 {
    (a + b) * 0.5
}
