use bevy::prelude::*;

use crate::geometry::{midpoint, UP};
use crate::spline::{SplinePath, SplinePointType, POINT_TOLERANCE};
use crate::terrain::{TerrainProbe, TerrainSampler};

use super::{CheckGroundMethod, GroundState};

/// Configuration for bridge mode.
///
/// Bridge mode lifts the spline over every span where the ground leaves and
/// returns to a level, inserting one curved point above each span.
#[derive(Debug, Clone, Reflect)]
pub struct BridgeSettings {
    /// Whether bridge mode is enabled.
    pub enabled: bool,
    /// Push the bridge middle down instead of up.
    pub reverse_tension: bool,
    /// Height of the bridge middle above the span midpoint.
    pub tension: f32,
    /// Length of each downward probe.
    pub depth: f32,
    /// Number of intervals the spline is split into when sampling.
    pub sample_count: usize,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            reverse_tension: false,
            tension: 100.0,
            depth: 200.0,
            sample_count: 10,
        }
    }
}

impl BridgeSettings {
    /// Create enabled bridge mode with default parameters.
    pub fn new() -> Self {
        Self {
            enabled: true,
            ..default()
        }
    }

    /// Set the bridge tension, clamped to `0..=1000`.
    pub fn with_tension(mut self, tension: f32) -> Self {
        self.tension = tension.clamp(0.0, 1000.0);
        self
    }

    /// Set the probe depth, clamped to `0..=1000`.
    pub fn with_depth(mut self, depth: f32) -> Self {
        self.depth = depth.clamp(0.0, 1000.0);
        self
    }

    /// Set the number of sampling intervals, clamped to `0..=1000`.
    pub fn with_sample_count(mut self, count: usize) -> Self {
        self.sample_count = count.min(1000);
        self
    }

    /// Push the bridge middle below the span instead of above it.
    pub fn reversed(mut self, reverse: bool) -> Self {
        self.reverse_tension = reverse;
        self
    }

    /// Signed vertical offset of the bridge middle.
    pub fn signed_tension(&self) -> f32 {
        if self.reverse_tension {
            -self.tension
        } else {
            self.tension
        }
    }
}

/// A span between two ground hits to be bridged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bridge {
    pub start: Vec3,
    pub end: Vec3,
}

impl Bridge {
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end }
    }

    /// Point halfway between both ends.
    pub fn middle(&self) -> Vec3 {
        midpoint(self.start, self.end)
    }
}

/// Pair elevation changes in a sequence of ground hits into bridge spans.
///
/// The first change opens a span at the hit before it, the next change
/// closes it at the hit where it occurs. An unclosed span is dropped.
pub fn detect_bridges(hits: &[Vec3]) -> Vec<Bridge> {
    let mut bridges = Vec::new();
    let mut open: Option<Vec3> = None;

    for pair in hits.windows(2) {
        let (previous, current) = (pair[0], pair[1]);
        if (current.y - previous.y).abs() <= POINT_TOLERANCE {
            continue;
        }

        match open.take() {
            None => open = Some(previous),
            Some(start) => bridges.push(Bridge::new(start, current)),
        }
    }

    bridges
}

impl GroundState {
    /// Sample the ground and insert one curved point above every bridge span.
    ///
    /// Returns the number of inserted points.
    pub fn build_bridges<S, T>(
        &mut self,
        spline: &mut S,
        terrain: &T,
        origin_offset: f32,
        settings: &BridgeSettings,
    ) -> usize
    where
        S: SplinePath + ?Sized,
        T: TerrainProbe + ?Sized,
    {
        let sampler = TerrainSampler::new(terrain, origin_offset);
        let hits: Vec<Vec3> = CheckGroundMethod::points(settings.sample_count)
            .sample_distances(spline.length())
            .into_iter()
            .filter_map(|distance| sampler.probe_at_distance(spline, distance, settings.depth))
            .collect();

        let bridges = detect_bridges(&hits);
        let mut inserted = 0;

        for bridge in &bridges {
            let middle = bridge.middle() + UP * settings.signed_tension();
            let key = spline.find_nearest_input_key(middle);
            let index = (key.floor() as usize + 1).min(spline.point_count());
            if self.insert_tracked(spline, index, middle, SplinePointType::Curve) {
                inserted += 1;
            }
        }

        debug!(
            "Bridge pass found {} spans and inserted {} points",
            bridges.len(),
            inserted
        );
        inserted
    }
}
