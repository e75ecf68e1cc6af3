use bevy::prelude::*;

/// How the curve leaves a control point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
#[reflect(Default)]
pub enum SplinePointType {
    /// Straight line to the next control point.
    Linear,
    /// Cubic Hermite curve with automatic (Catmull-Rom) tangents.
    #[default]
    Curve,
}

/// A single control point of a [`Spline`](super::Spline).
#[derive(Debug, Clone, Copy, PartialEq, Default, Reflect)]
pub struct SplinePoint {
    /// Position in the spline's local space.
    pub position: Vec3,
    /// How the curve leaves this point.
    pub point_type: SplinePointType,
}

impl SplinePoint {
    /// Create a curve point at the given position.
    pub fn curve(position: Vec3) -> Self {
        Self {
            position,
            point_type: SplinePointType::Curve,
        }
    }

    /// Create a linear point at the given position.
    pub fn linear(position: Vec3) -> Self {
        Self {
            position,
            point_type: SplinePointType::Linear,
        }
    }
}

/// Number of segments for a spline with `point_count` control points.
pub fn segment_count(point_count: usize) -> usize {
    point_count.saturating_sub(1)
}

/// Tangent of the curve at control point `index`.
///
/// Linear points use the chord to the next point. Curve points use the
/// Catmull-Rom tangent, falling back to a one-sided difference at the ends.
pub fn point_tangent(points: &[SplinePoint], index: usize) -> Vec3 {
    let n = points.len();
    if n < 2 || index >= n {
        return Vec3::ZERO;
    }

    if points[index].point_type == SplinePointType::Linear && index + 1 < n {
        return points[index + 1].position - points[index].position;
    }

    if index == 0 {
        points[1].position - points[0].position
    } else if index == n - 1 {
        points[n - 1].position - points[n - 2].position
    } else {
        (points[index + 1].position - points[index - 1].position) * 0.5
    }
}

/// Evaluate the position on `segment` at local parameter `t` (0.0 to 1.0).
pub fn evaluate_segment(points: &[SplinePoint], segment: usize, t: f32) -> Option<Vec3> {
    if segment + 1 >= points.len() {
        return None;
    }

    let p0 = points[segment].position;
    let p1 = points[segment + 1].position;

    if points[segment].point_type == SplinePointType::Linear {
        return Some(p0.lerp(p1, t));
    }

    let m0 = point_tangent(points, segment);
    let m1 = point_tangent(points, segment + 1);
    Some(hermite(p0, m0, p1, m1, t))
}

/// Evaluate the derivative (with respect to input key) on `segment` at local parameter `t`.
pub fn evaluate_segment_tangent(points: &[SplinePoint], segment: usize, t: f32) -> Option<Vec3> {
    if segment + 1 >= points.len() {
        return None;
    }

    let p0 = points[segment].position;
    let p1 = points[segment + 1].position;

    if points[segment].point_type == SplinePointType::Linear {
        return Some(p1 - p0);
    }

    let m0 = point_tangent(points, segment);
    let m1 = point_tangent(points, segment + 1);
    Some(hermite_derivative(p0, m0, p1, m1, t))
}

/// Cubic Hermite interpolation between `p0` and `p1` with tangents `m0` and `m1`.
pub fn hermite(p0: Vec3, m0: Vec3, p1: Vec3, m1: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    let t3 = t2 * t;

    p0 * (2.0 * t3 - 3.0 * t2 + 1.0)
        + m0 * (t3 - 2.0 * t2 + t)
        + p1 * (-2.0 * t3 + 3.0 * t2)
        + m1 * (t3 - t2)
}

/// Derivative of [`hermite`] with respect to `t`.
pub fn hermite_derivative(p0: Vec3, m0: Vec3, p1: Vec3, m1: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;

    p0 * (6.0 * t2 - 6.0 * t)
        + m0 * (3.0 * t2 - 4.0 * t + 1.0)
        + p1 * (-6.0 * t2 + 6.0 * t)
        + m1 * (3.0 * t2 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hermite_endpoints() {
        let p0 = Vec3::ZERO;
        let p1 = Vec3::new(4.0, 2.0, 0.0);
        let m = Vec3::X * 3.0;

        assert!((hermite(p0, m, p1, m, 0.0) - p0).length() < 1e-5);
        assert!((hermite(p0, m, p1, m, 1.0) - p1).length() < 1e-5);
        assert!((hermite_derivative(p0, m, p1, m, 0.0) - m).length() < 1e-5);
        assert!((hermite_derivative(p0, m, p1, m, 1.0) - m).length() < 1e-5);
    }

    #[test]
    fn test_linear_segment_is_straight() {
        let points = [
            SplinePoint::linear(Vec3::ZERO),
            SplinePoint::curve(Vec3::new(10.0, 0.0, 0.0)),
            SplinePoint::curve(Vec3::new(10.0, 0.0, 10.0)),
        ];

        let mid = evaluate_segment(&points, 0, 0.5).unwrap();
        assert!((mid - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-5);
        assert_eq!(evaluate_segment_tangent(&points, 0, 0.3), Some(Vec3::X * 10.0));
        assert!(evaluate_segment(&points, 2, 0.0).is_none());
    }

    #[test]
    fn test_curve_tangent_interior_is_catmull_rom() {
        let points = [
            SplinePoint::curve(Vec3::ZERO),
            SplinePoint::curve(Vec3::new(1.0, 1.0, 0.0)),
            SplinePoint::curve(Vec3::new(2.0, 0.0, 0.0)),
        ];

        assert_eq!(point_tangent(&points, 1), Vec3::X);
        assert_eq!(point_tangent(&points, 0), Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(point_tangent(&points, 5), Vec3::ZERO);
    }
}
