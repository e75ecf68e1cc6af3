//! Deformation of a source mesh along a placed segment.
//!
//! The source mesh's X axis is stretched along the segment's Hermite curve.
//! Y follows the curve's up direction and Z its right direction, each scaled
//! by the cross-section scale interpolated between both ends.

use bevy::{mesh::VertexAttributeValues, prelude::*};

use crate::geometry::CoordinateFrame;
use crate::spline::{hermite, hermite_derivative};

use super::{vertex_bounds, PlacedFrame};

/// Position and orientation on a placed segment at parameter `t` (0.0 to 1.0).
pub fn segment_frame(frame: &PlacedFrame, t: f32) -> (Vec3, CoordinateFrame) {
    let (start, start_tangent) = (frame.start, frame.start_tangent);
    let (end, end_tangent) = (frame.end, frame.end_tangent);
    let position = hermite(start, start_tangent, end, end_tangent, t);
    let mut direction = hermite_derivative(start, start_tangent, end, end_tangent, t);
    if direction.length_squared() < f32::EPSILON {
        direction = frame.end - frame.start;
    }

    let roll = frame.start_roll + (frame.end_roll - frame.start_roll) * t;
    (position, CoordinateFrame::from_tangent(direction).rolled(roll))
}

/// Deform `source` along `frame`.
///
/// Returns `None` if the mesh has no positions or no forward extent.
pub fn bend_mesh(source: &Mesh, frame: &PlacedFrame) -> Option<Mesh> {
    let (min, max) = vertex_bounds(source)?;
    let length = max.x - min.x;
    if length <= f32::EPSILON {
        return None;
    }

    let VertexAttributeValues::Float32x3(positions) =
        source.attribute(Mesh::ATTRIBUTE_POSITION)?
    else {
        return None;
    };
    let normals = match source.attribute(Mesh::ATTRIBUTE_NORMAL) {
        Some(VertexAttributeValues::Float32x3(normals)) if normals.len() == positions.len() => {
            Some(normals)
        }
        _ => None,
    };

    let mut bent_positions = Vec::with_capacity(positions.len());
    let mut bent_normals = Vec::with_capacity(normals.map_or(0, Vec::len));

    for (i, p) in positions.iter().enumerate() {
        let t = (p[0] - min.x) / length;
        let (origin, basis) = segment_frame(frame, t);
        let scale = frame.start_scale.lerp(frame.end_scale, t);

        let world = origin + basis.transform_profile_point(p[2] * scale.x, p[1] * scale.y);
        bent_positions.push(world.to_array());

        if let Some(normals) = normals {
            let normal = basis.transform_direction(Vec3::from_array(normals[i]));
            bent_normals.push(normal.normalize_or_zero().to_array());
        }
    }

    let mut mesh = source.clone();
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, bent_positions);
    if normals.is_some() {
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, bent_normals);
    }
    // Source tangents no longer match the bent surface
    mesh.remove_attribute(Mesh::ATTRIBUTE_TANGENT);

    Some(mesh)
}
