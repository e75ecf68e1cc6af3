//! Arc length parameterization utilities for splines.
//!
//! Provides a lookup table to convert arc length to input key,
//! used to place segments at exact distances along the curve.

use super::Spline;

/// Default number of samples per segment for arc length calculations.
pub const DEFAULT_SAMPLES_PER_SEGMENT: usize = 32;

/// Arc length lookup table for length-to-key conversion.
///
/// The table is built by sampling every segment at regular key intervals and
/// accumulating the distance between samples.
#[derive(Debug, Clone)]
pub struct ArcLengthTable {
    /// (input key, cumulative_length) pairs, always starting with (0.0, 0.0).
    samples: Vec<(f32, f32)>,
}

impl ArcLengthTable {
    /// Compute an arc length table for a spline.
    ///
    /// # Arguments
    /// * `spline` - The spline to sample
    /// * `samples_per_segment` - Number of samples per segment (more = higher accuracy)
    pub fn compute(spline: &Spline, samples_per_segment: usize) -> Self {
        let samples_per_segment = samples_per_segment.max(1);
        let total = spline.segment_count() * samples_per_segment;
        let mut table = Vec::with_capacity(total + 1);
        let mut cumulative_length = 0.0;
        let mut prev_point = spline.evaluate(0.0).unwrap_or_default();

        table.push((0.0, 0.0));

        for i in 1..=total {
            let key = i as f32 / samples_per_segment as f32;
            let point = spline.evaluate(key).unwrap_or(prev_point);
            cumulative_length += (point - prev_point).length();
            table.push((key, cumulative_length));
            prev_point = point;
        }

        Self { samples: table }
    }

    /// Get the total arc length of the spline.
    pub fn total_length(&self) -> f32 {
        self.samples.last().map(|(_, l)| *l).unwrap_or(0.0)
    }

    /// Find the input key for a given arc length.
    pub fn length_to_key(&self, target_length: f32) -> f32 {
        if self.samples.len() < 2 {
            return 0.0;
        }

        let total_length = self.total_length();
        if total_length <= 0.0 {
            return 0.0;
        }

        // Clamp target length
        let target = target_length.clamp(0.0, total_length);

        // Binary search for the segment containing target_length
        let idx = self
            .samples
            .binary_search_by(|(_, l)| l.partial_cmp(&target).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or_else(|i| i.saturating_sub(1));

        if idx >= self.samples.len() - 1 {
            return self.samples[self.samples.len() - 1].0;
        }

        let (k0, l0) = self.samples[idx];
        let (k1, l1) = self.samples[idx + 1];

        if (l1 - l0).abs() < 1e-6 {
            return k0;
        }

        // Linear interpolation within segment
        let alpha = (target - l0) / (l1 - l0);
        k0 + alpha * (k1 - k0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::prelude::*;

    #[test]
    fn test_arc_length_endpoints() {
        let spline = Spline::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(3.0, 0.0, 0.0),
        ]);

        let table = ArcLengthTable::compute(&spline, 32);

        assert!((table.total_length() - 3.0).abs() < 0.01);
        assert!(table.length_to_key(0.0).abs() < 0.01);
        assert!((table.length_to_key(table.total_length()) - 3.0).abs() < 0.01);
        assert!((table.length_to_key(1.5) - 1.5).abs() < 0.01);
    }

    #[test]
    fn test_single_point_has_no_length() {
        let spline = Spline::new(vec![Vec3::ONE]);
        let table = ArcLengthTable::compute(&spline, 8);
        assert_eq!(table.total_length(), 0.0);
        assert_eq!(table.length_to_key(10.0), 0.0);
    }
}
