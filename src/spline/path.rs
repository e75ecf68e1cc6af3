//! The spline interface consumed by composition and ground adaptation.

use bevy::prelude::*;

use super::types::{point_tangent, SplinePoint, SplinePointType};
use super::Spline;

/// Tolerance under which two control point locations are the same point.
pub const POINT_TOLERANCE: f32 = 1.0e-4;

/// Check whether two locations describe the same control point.
pub fn points_coincide(a: Vec3, b: Vec3) -> bool {
    a.abs_diff_eq(b, POINT_TOLERANCE)
}

/// Arc-length parameterized spline with mutable control points.
///
/// All locations and tangents are in the spline's local space.
pub trait SplinePath {
    /// Number of control points.
    fn point_count(&self) -> usize;

    /// Total arc length.
    fn length(&self) -> f32;

    /// Location at `distance` along the curve.
    fn location_at_distance(&self, distance: f32) -> Vec3;

    /// Tangent at `distance` along the curve.
    fn tangent_at_distance(&self, distance: f32) -> Vec3;

    /// Location of the control point at `index`.
    fn location_at_point(&self, index: usize) -> Vec3;

    /// Tangent at the control point at `index`.
    fn tangent_at_point(&self, index: usize) -> Vec3;

    /// Insert a control point so it ends up at `index`.
    fn insert_point(&mut self, index: usize, location: Vec3, point_type: SplinePointType);

    /// Remove the control point at `index`. Returns `false` when out of range.
    fn remove_point(&mut self, index: usize) -> bool;

    /// Move the control point at `index`.
    fn set_point_location(&mut self, index: usize, location: Vec3);

    /// Change the type of the control point at `index`.
    fn set_point_type(&mut self, index: usize, point_type: SplinePointType);

    /// Input key of the curve position closest to `location`.
    fn find_nearest_input_key(&self, location: Vec3) -> f32;

    /// Index of a control point coinciding with `location`, if any.
    fn find_coincident_point(&self, location: Vec3) -> Option<usize> {
        (0..self.point_count()).find(|&i| points_coincide(self.location_at_point(i), location))
    }
}

impl SplinePath for Spline {
    fn point_count(&self) -> usize {
        Spline::point_count(self)
    }

    fn length(&self) -> f32 {
        self.arc_length_table().total_length()
    }

    fn location_at_distance(&self, distance: f32) -> Vec3 {
        let key = self.arc_length_table().length_to_key(distance);
        self.evaluate(key).unwrap_or_default()
    }

    fn tangent_at_distance(&self, distance: f32) -> Vec3 {
        let key = self.arc_length_table().length_to_key(distance);
        self.evaluate_tangent(key).unwrap_or_default()
    }

    fn location_at_point(&self, index: usize) -> Vec3 {
        self.points()
            .get(index)
            .map(|p| p.position)
            .unwrap_or_default()
    }

    fn tangent_at_point(&self, index: usize) -> Vec3 {
        point_tangent(self.points(), index)
    }

    fn insert_point(&mut self, index: usize, location: Vec3, point_type: SplinePointType) {
        let index = index.min(self.point_count());
        Spline::insert_point(
            self,
            index,
            SplinePoint {
                position: location,
                point_type,
            },
        );
    }

    fn remove_point(&mut self, index: usize) -> bool {
        Spline::remove_point(self, index).is_some()
    }

    fn set_point_location(&mut self, index: usize, location: Vec3) {
        if let Some(point) = self.points_mut().get_mut(index) {
            point.position = location;
        }
    }

    fn set_point_type(&mut self, index: usize, point_type: SplinePointType) {
        Spline::set_point_type(self, index, point_type);
    }

    fn find_nearest_input_key(&self, location: Vec3) -> f32 {
        self.nearest_input_key(location)
    }
}
