//! Ground adaptation: reshaping a spline's control points to follow terrain.
//!
//! Every point inserted here is tracked in a [`GroundState`] so the next
//! recompute can remove it again before rebuilding from scratch.

mod bridge;
mod synthesizer;

pub use bridge::*;
pub use synthesizer::GroundReport;

use avian3d::prelude::*;
use bevy::prelude::*;

use crate::spline::SplinePointType;

/// How sample positions along the spline are chosen when looking for steps.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub enum CheckGroundMethod {
    /// Split the spline into `count` equal intervals (`count + 1` samples).
    Points {
        /// Number of intervals.
        count: usize,
    },
    /// Sample every `spacing` units of arc length.
    Spacing {
        /// Distance between samples.
        spacing: f32,
    },
}

impl Default for CheckGroundMethod {
    fn default() -> Self {
        Self::Points { count: 10 }
    }
}

impl CheckGroundMethod {
    /// Sample by point count, clamped to `0..=1000`.
    pub fn points(count: usize) -> Self {
        Self::Points {
            count: count.min(1000),
        }
    }

    /// Sample by spacing, clamped to `1..=10000`.
    pub fn spacing(spacing: f32) -> Self {
        Self::Spacing {
            spacing: spacing.clamp(1.0, 10_000.0),
        }
    }

    /// Arc-length distances to sample on a spline of `length`.
    pub fn sample_distances(&self, length: f32) -> Vec<f32> {
        if length < 0.0 {
            return Vec::new();
        }

        match *self {
            Self::Points { count: 0 } => Vec::new(),
            Self::Points { count } => {
                let step = length / count as f32;
                (0..=count).map(|i| i as f32 * step).collect()
            }
            Self::Spacing { spacing } if spacing <= 0.0 => Vec::new(),
            Self::Spacing { spacing } => {
                let steps = (length / spacing).floor() as usize;
                (0..=steps).map(|i| i as f32 * spacing).collect()
            }
        }
    }
}

/// Configuration for snapping a spline onto the ground.
#[derive(Debug, Clone, Reflect)]
pub struct GroundSnapSettings {
    /// Whether ground snapping is enabled.
    pub enabled: bool,
    /// Offset above each sampled location where the probe starts.
    pub origin_offset: f32,
    /// Length of each downward probe.
    pub depth: f32,
    /// How sample positions are chosen when looking for steps.
    pub method: CheckGroundMethod,
    /// Type given to the existing control points once snapped.
    /// Step points are always linear.
    pub point_type: Option<SplinePointType>,
    /// Optional collision layers to probe against.
    /// If None, all layers are queried.
    #[reflect(ignore)]
    pub layers: Option<LayerMask>,
}

impl Default for GroundSnapSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            origin_offset: 10.0,
            depth: 200.0,
            method: CheckGroundMethod::default(),
            point_type: None,
            layers: None,
        }
    }
}

impl GroundSnapSettings {
    /// Create enabled ground snapping with default parameters.
    pub fn new() -> Self {
        Self {
            enabled: true,
            ..default()
        }
    }

    /// Set the probe origin offset, clamped to `-1000..=1000`.
    pub fn with_origin_offset(mut self, offset: f32) -> Self {
        self.origin_offset = offset.clamp(-1000.0, 1000.0);
        self
    }

    /// Set the probe depth, clamped to `0..=1000`.
    pub fn with_depth(mut self, depth: f32) -> Self {
        self.depth = depth.clamp(0.0, 1000.0);
        self
    }

    /// Set the sampling method.
    pub fn with_method(mut self, method: CheckGroundMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_point_type(mut self, point_type: SplinePointType) -> Self {
        self.point_type = Some(point_type);
        self
    }

    /// Set collision layers to probe.
    pub fn with_layers(mut self, layers: LayerMask) -> Self {
        self.layers = Some(layers);
        self
    }
}

/// Control points synthesized by the last ground adaptation.
#[derive(Debug, Clone, Default)]
pub struct GroundState {
    /// Locations of every inserted control point, in insertion order.
    synthesized: Vec<Vec3>,
    /// Every ground hit found while looking for steps.
    raycast_hits: Vec<Vec3>,
}

impl GroundState {
    /// Locations of the control points inserted since the last flush.
    pub fn synthesized_points(&self) -> &[Vec3] {
        &self.synthesized
    }

    /// Ground hits recorded since the last flush.
    pub fn raycast_hits(&self) -> &[Vec3] {
        &self.raycast_hits
    }

    /// Whether any point is waiting to be flushed.
    pub fn is_empty(&self) -> bool {
        self.synthesized.is_empty()
    }
}
