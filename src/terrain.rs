//! Terrain probing for ground adaptation.
//!
//! The engine only needs point-to-point line probes. [`PhysicsTerrain`]
//! answers them with avian3d raycasts, [`NoTerrain`] never hits.

use avian3d::prelude::*;
use bevy::prelude::*;

use crate::geometry::UP;
use crate::spline::SplinePath;

/// Line intersection queries against the world.
///
/// Locations are in the spline's local space.
pub trait TerrainProbe {
    /// First impact point on the segment from `start` to `end`, if any.
    fn line_probe(&self, start: Vec3, end: Vec3) -> Option<Vec3>;
}

/// Terrain that never reports a hit.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTerrain;

impl TerrainProbe for NoTerrain {
    fn line_probe(&self, _start: Vec3, _end: Vec3) -> Option<Vec3> {
        None
    }
}

/// Create a spatial query filter from optional collision layers.
pub fn create_probe_filter(layers: Option<LayerMask>) -> SpatialQueryFilter {
    if let Some(layers) = layers {
        SpatialQueryFilter::default().with_mask(layers)
    } else {
        SpatialQueryFilter::default()
    }
}

/// Terrain probes answered by avian3d raycasts.
///
/// Probes are converted from the spline's local space to world space using
/// the spline entity's transform, and hits are converted back.
pub struct PhysicsTerrain<'a, 'w, 's> {
    spatial_query: &'a SpatialQuery<'w, 's>,
    filter: SpatialQueryFilter,
    transform: GlobalTransform,
}

impl<'a, 'w, 's> PhysicsTerrain<'a, 'w, 's> {
    /// Create a probe for a spline with the given world transform.
    pub fn new(
        spatial_query: &'a SpatialQuery<'w, 's>,
        layers: Option<LayerMask>,
        transform: GlobalTransform,
    ) -> Self {
        Self {
            spatial_query,
            filter: create_probe_filter(layers),
            transform,
        }
    }
}

impl TerrainProbe for PhysicsTerrain<'_, '_, '_> {
    fn line_probe(&self, start: Vec3, end: Vec3) -> Option<Vec3> {
        let world_start = self.transform.transform_point(start);
        let world_end = self.transform.transform_point(end);
        let (direction, distance) = Dir3::new_and_length(world_end - world_start).ok()?;

        let hit = self
            .spatial_query
            .cast_ray(world_start, direction, distance, true, &self.filter)?;

        let world_hit = world_start + *direction * hit.distance;
        Some(self.transform.affine().inverse().transform_point3(world_hit))
    }
}

/// Vertical ground probes at spline locations.
pub struct TerrainSampler<'a, T: TerrainProbe + ?Sized> {
    terrain: &'a T,
    /// Offset above the sampled location where the probe starts.
    origin_offset: f32,
}

impl<'a, T: TerrainProbe + ?Sized> TerrainSampler<'a, T> {
    /// Create a sampler starting probes `origin_offset` above the sampled locations.
    pub fn new(terrain: &'a T, origin_offset: f32) -> Self {
        Self {
            terrain,
            origin_offset,
        }
    }

    /// Probe downward from above `location` over `depth`.
    pub fn probe_below(&self, location: Vec3, depth: f32) -> Option<Vec3> {
        let start = location + UP * self.origin_offset;
        let end = start - UP * depth;
        let hit = self.terrain.line_probe(start, end);
        if hit.is_none() {
            trace!("Ground probe below {location} missed");
        }
        hit
    }

    /// Probe downward at `distance` along the spline.
    pub fn probe_at_distance<S: SplinePath + ?Sized>(
        &self,
        spline: &S,
        distance: f32,
        depth: f32,
    ) -> Option<Vec3> {
        self.probe_below(spline.location_at_distance(distance), depth)
    }
}
