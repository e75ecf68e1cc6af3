use bevy::prelude::*;

use crate::geometry::rotation_vector;
use crate::rotation::{MeshRotation, RotationAxis, RotationMethod, RotationTable};

use super::SplineMeshValues;

/// Final geometry of a placed mesh instance.
#[derive(Debug, Clone, Copy, PartialEq, Default, Reflect)]
pub struct PlacedFrame {
    pub start: Vec3,
    pub start_tangent: Vec3,
    pub end: Vec3,
    pub end_tangent: Vec3,
    pub start_scale: Vec2,
    pub end_scale: Vec2,
    /// Roll around the segment at the start, in radians.
    pub start_roll: f32,
    /// Roll around the segment at the end, in radians.
    pub end_roll: f32,
}

impl PlacedFrame {
    fn from_values(values: &SplineMeshValues) -> Self {
        Self {
            start: values.start,
            start_tangent: values.start_tangent,
            end: values.end,
            end_tangent: values.end_tangent,
            start_scale: values.start_scale,
            end_scale: values.end_scale,
            start_roll: 0.0,
            end_roll: 0.0,
        }
    }
}

/// Apply `rotation` to a segment.
///
/// Rolling around X keeps the segment in place. Rotating around Y or Z swings
/// the end around the start while keeping the segment length, and both
/// tangents follow the new direction.
pub fn rotate_segment(values: &SplineMeshValues, rotation: MeshRotation) -> PlacedFrame {
    let mut frame = PlacedFrame::from_values(values);

    if rotation.axis == RotationAxis::X {
        let roll = rotation.angle.to_radians();
        frame.start_roll = roll;
        frame.end_roll = roll;
        return frame;
    }

    let end = values.start + values.chord_length() * rotation_vector(rotation.axis, rotation.angle);
    let dx = end.x - values.start.x;
    let tangent = match rotation.axis {
        RotationAxis::Y => Vec3::new(dx, 0.0, end.z),
        _ => Vec3::new(dx, end.y, 0.0),
    };

    frame.end = end;
    frame.start_tangent = tangent;
    frame.end_tangent = tangent;
    frame
}

/// Final frame for the segment at `index`.
///
/// Without a rotation method the segment keeps its start tangent at both ends.
pub fn place_segment(
    values: &SplineMeshValues,
    rotations: &RotationTable,
    index: usize,
) -> PlacedFrame {
    if rotations.method() == RotationMethod::None {
        let mut frame = PlacedFrame::from_values(values);
        frame.end_tangent = values.start_tangent;
        return frame;
    }

    rotate_segment(values, rotations.resolve(index))
}
