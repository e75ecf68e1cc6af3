use std::sync::OnceLock;

use bevy::prelude::*;

use super::arc_length::{ArcLengthTable, DEFAULT_SAMPLES_PER_SEGMENT};
use super::types::{
    evaluate_segment, evaluate_segment_tangent, segment_count, SplinePoint, SplinePointType,
};

/// Number of coarse samples per segment when searching for the nearest input key.
const NEAREST_KEY_SAMPLES: usize = 32;

/// Refinement iterations after the coarse nearest-key search.
const NEAREST_KEY_REFINEMENTS: usize = 20;

/// A 3D spline component whose curve passes through every control point.
///
/// Positions are in the entity's local space. The curve is parameterized by
/// an input key: the integer part selects the segment (control point index),
/// the fractional part is the position inside that segment.
///
/// The arc length table is built on the first distance query and dropped by
/// every control point edit.
#[derive(Component, Debug, Clone, Reflect, Default)]
#[reflect(Component)]
pub struct Spline {
    /// Control points defining the spline shape.
    points: Vec<SplinePoint>,
    #[reflect(ignore)]
    arc_length: OnceLock<ArcLengthTable>,
}

impl Spline {
    /// Create a new spline of curve points.
    pub fn new(positions: Vec<Vec3>) -> Self {
        Self::from_points(positions.into_iter().map(SplinePoint::curve).collect())
    }

    /// Create a spline from fully specified control points.
    pub fn from_points(points: Vec<SplinePoint>) -> Self {
        Self {
            points,
            arc_length: OnceLock::new(),
        }
    }

    /// Control points defining the spline shape.
    pub fn points(&self) -> &[SplinePoint] {
        &self.points
    }

    /// Mutable access to the control points.
    pub fn points_mut(&mut self) -> &mut Vec<SplinePoint> {
        self.arc_length.take();
        &mut self.points
    }

    /// Arc length table of the current control points.
    pub fn arc_length_table(&self) -> &ArcLengthTable {
        self.arc_length
            .get_or_init(|| ArcLengthTable::compute(self, DEFAULT_SAMPLES_PER_SEGMENT))
    }

    /// Create a straight two-point spline starting at `start`.
    pub fn straight(start: Vec3, direction: Vec3, length: f32) -> Self {
        let direction = direction.normalize_or(Vec3::X);
        Self::new(vec![start, start + direction * length])
    }

    /// Replace every control point with a straight two-point line.
    pub fn reset_straight(&mut self, start: Vec3, direction: Vec3, length: f32) {
        *self = Self::straight(start, direction, length);
    }

    /// Number of control points.
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Get the number of segments in this spline.
    pub fn segment_count(&self) -> usize {
        segment_count(self.points.len())
    }

    /// Control point positions in order.
    pub fn positions(&self) -> Vec<Vec3> {
        self.points.iter().map(|p| p.position).collect()
    }

    /// Split an input key into (segment, local t), clamped to the curve.
    fn split_key(&self, key: f32) -> Option<(usize, f32)> {
        let segments = self.segment_count();
        if segments == 0 {
            return None;
        }

        let key = key.clamp(0.0, segments as f32);
        let segment = (key.floor() as usize).min(segments - 1);
        Some((segment, key - segment as f32))
    }

    /// Evaluate the spline at an input key.
    pub fn evaluate(&self, key: f32) -> Option<Vec3> {
        if self.points.len() == 1 {
            return Some(self.points[0].position);
        }
        let (segment, t) = self.split_key(key)?;
        evaluate_segment(&self.points, segment, t)
    }

    /// Evaluate the tangent (derivative with respect to input key) at an input key.
    pub fn evaluate_tangent(&self, key: f32) -> Option<Vec3> {
        let (segment, t) = self.split_key(key)?;
        evaluate_segment_tangent(&self.points, segment, t)
    }

    /// Insert a control point at the given index.
    pub fn insert_point(&mut self, index: usize, point: SplinePoint) {
        if index <= self.points.len() {
            self.points_mut().insert(index, point);
        }
    }

    /// Remove the control point at the given index.
    pub fn remove_point(&mut self, index: usize) -> Option<SplinePoint> {
        if index < self.points.len() {
            Some(self.points_mut().remove(index))
        } else {
            None
        }
    }

    /// Change how the curve leaves the point at `index`.
    pub fn set_point_type(&mut self, index: usize, point_type: SplinePointType) {
        if let Some(point) = self.points_mut().get_mut(index) {
            point.point_type = point_type;
        }
    }

    /// Find the input key whose curve position is closest to `location`.
    pub fn nearest_input_key(&self, location: Vec3) -> f32 {
        let segments = self.segment_count();
        if segments == 0 {
            return 0.0;
        }

        let distance_at = |key: f32| {
            self.evaluate(key)
                .map(|p| p.distance_squared(location))
                .unwrap_or(f32::MAX)
        };

        // Coarse pass over the whole curve
        let steps = segments * NEAREST_KEY_SAMPLES;
        let step = 1.0 / NEAREST_KEY_SAMPLES as f32;
        let mut best_key = 0.0;
        let mut best_distance = f32::MAX;
        for i in 0..=steps {
            let key = i as f32 * step;
            let distance = distance_at(key);
            if distance < best_distance {
                best_distance = distance;
                best_key = key;
            }
        }

        // Ternary refinement around the best coarse sample
        let mut low = (best_key - step).max(0.0);
        let mut high = (best_key + step).min(segments as f32);
        for _ in 0..NEAREST_KEY_REFINEMENTS {
            let a = low + (high - low) / 3.0;
            let b = high - (high - low) / 3.0;
            if distance_at(a) < distance_at(b) {
                high = b;
            } else {
                low = a;
            }
        }

        let refined = (low + high) * 0.5;
        if distance_at(refined) < best_distance {
            refined
        } else {
            best_key
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> Spline {
        Spline::new(vec![
            Vec3::ZERO,
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(20.0, 0.0, 0.0),
        ])
    }

    #[test]
    fn test_evaluate_passes_through_points() {
        let spline = line();
        assert_eq!(spline.evaluate(0.0), Some(Vec3::ZERO));
        assert!((spline.evaluate(1.0).unwrap() - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-4);
        assert!((spline.evaluate(2.0).unwrap() - Vec3::new(20.0, 0.0, 0.0)).length() < 1e-4);
        // Out of range keys clamp to the ends
        assert!((spline.evaluate(5.0).unwrap() - Vec3::new(20.0, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_nearest_input_key() {
        let spline = line();
        let key = spline.nearest_input_key(Vec3::new(15.0, 3.0, 0.0));
        assert!((key - 1.5).abs() < 0.01, "key was {key}");
        assert!(spline.nearest_input_key(Vec3::new(-5.0, 0.0, 0.0)) < 0.01);
    }

    #[test]
    fn test_insert_and_remove() {
        let mut spline = line();
        spline.insert_point(1, SplinePoint::linear(Vec3::new(5.0, 1.0, 0.0)));
        assert_eq!(spline.point_count(), 4);
        assert_eq!(spline.points()[1].point_type, SplinePointType::Linear);

        // Out of range insertions are ignored
        spline.insert_point(10, SplinePoint::curve(Vec3::ONE));
        assert_eq!(spline.point_count(), 4);

        let removed = spline.remove_point(1).unwrap();
        assert_eq!(removed.position, Vec3::new(5.0, 1.0, 0.0));
        assert!(spline.remove_point(3).is_none());
    }

    #[test]
    fn test_straight_spline() {
        let spline = Spline::straight(Vec3::ONE, Vec3::X * 2.0, 150.0);
        assert_eq!(spline.positions(), vec![Vec3::ONE, Vec3::new(151.0, 1.0, 1.0)]);
    }

    #[test]
    fn test_arc_length_table_is_cached_until_edit() {
        let mut spline = line();
        assert!(std::ptr::eq(spline.arc_length_table(), spline.arc_length_table()));
        assert!((spline.arc_length_table().total_length() - 20.0).abs() < 0.01);

        spline.insert_point(3, SplinePoint::linear(Vec3::new(30.0, 0.0, 0.0)));
        assert!((spline.arc_length_table().total_length() - 30.0).abs() < 0.01);

        spline.points_mut()[3].position = Vec3::new(40.0, 0.0, 0.0);
        assert!((spline.arc_length_table().total_length() - 40.0).abs() < 0.01);

        spline.remove_point(3);
        assert!((spline.arc_length_table().total_length() - 20.0).abs() < 0.01);
    }
}
